//! Lifecycle orchestration
//!
//! `AdLifecycleController` is the application-facing surface: it names the
//! placement, runs the admission gates in order (blocklist -> entitlement
//! -> ads-enabled), and drives the ad unit through the state machine in
//! `state.rs`. A suppressed placement, a premium user or disabled ads all
//! settle `true` ("no ad, but not a failure") without ever touching the
//! network; everything that goes wrong after gating settles `false`.

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, warn};

use ag_core::caller::current_call_site;
use ag_core::{AdType, AdsConfig, Blocklist, PlacementRegistry, RemoteSettings};

use crate::provider::{AdEvent, AdProvider, AnalyticsSink, EntitlementProvider, NoopAnalytics};
use crate::state::{Lifecycle, Step};

/// Orchestrates ad requests against the identity/policy engine and the
/// external ad network.
pub struct AdLifecycleController<P, E> {
    registry: Arc<PlacementRegistry>,
    blocklist: Arc<Blocklist>,
    config: Arc<AdsConfig>,
    provider: P,
    entitlement: E,
    analytics: Arc<dyn AnalyticsSink>,
}

impl<P, E> AdLifecycleController<P, E>
where
    P: AdProvider,
    E: EntitlementProvider,
{
    pub fn new(
        registry: Arc<PlacementRegistry>,
        blocklist: Arc<Blocklist>,
        config: Arc<AdsConfig>,
        provider: P,
        entitlement: E,
    ) -> Self {
        Self {
            registry,
            blocklist,
            config,
            provider,
            entitlement,
            analytics: Arc::new(NoopAnalytics),
        }
    }

    /// Attach an analytics sink. Absence or sink failure never affects
    /// lifecycle outcomes.
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    // -------------------------------------------------------------------
    // Identity / policy surface
    // -------------------------------------------------------------------

    /// Report a navigation change from the host router.
    pub fn set_current_route(&self, pathname: &str) {
        self.registry.set_route(pathname);
    }

    /// Deterministic placement id for the calling site.
    #[track_caller]
    pub fn generate_placement_id(&self, ad_type: AdType, tag: Option<&str>) -> String {
        self.registry.generate_id(ad_type, tag)
    }

    /// Is this placement suppressed by the current blocklist?
    pub fn is_placement_blocked(&self, placement_id: &str) -> bool {
        self.blocklist.is_blocked(placement_id)
    }

    /// Replace the blocklist wholesale.
    pub fn set_blocklist(&self, patterns: Vec<String>) {
        self.blocklist.set_patterns(patterns);
    }

    /// Apply a fresh remote-settings delivery: swaps the held settings and
    /// replaces the blocklist with the delivered patterns.
    pub fn apply_remote_settings(&self, settings: RemoteSettings) {
        self.blocklist.set_patterns(settings.ad_blocklist.clone());
        self.config.apply(settings);
    }

    // -------------------------------------------------------------------
    // Show operations
    // -------------------------------------------------------------------

    /// Show an interstitial ad. Settles `true` when the ad completed or
    /// was legitimately skipped (blocked placement, premium user, ads
    /// disabled), `false` on any ad-network failure. Never errors.
    #[track_caller]
    pub fn show_interstitial(
        &self,
        unit_id: Option<String>,
        tag: Option<String>,
    ) -> impl Future<Output = bool> + '_ {
        // Capture the call site before the future is built; inside the
        // future the caller's frame is gone.
        let caller_key = match tag {
            Some(tag) => tag,
            None => current_call_site(),
        };
        self.run(AdType::Interstitial, unit_id, caller_key)
    }

    /// Show a rewarded ad. Settles `true` only when the reward was earned
    /// (or the request was legitimately skipped); a dismissal without the
    /// reward settles `false`. Never errors.
    #[track_caller]
    pub fn show_rewarded(
        &self,
        unit_id: Option<String>,
        tag: Option<String>,
    ) -> impl Future<Output = bool> + '_ {
        let caller_key = match tag {
            Some(tag) => tag,
            None => current_call_site(),
        };
        self.run(AdType::Rewarded, unit_id, caller_key)
    }

    async fn run(&self, ad_type: AdType, unit_id: Option<String>, caller_key: String) -> bool {
        let placement_id = self.registry.generate_id_for_caller(ad_type, &caller_key);

        // Gate 1: blocklist.
        if let Some(hit) = self.blocklist.matched(&placement_id) {
            debug!(
                "{placement_id}: suppressed by {} pattern '{}'",
                hit.tier.as_str(),
                hit.pattern
            );
            return true;
        }

        // Gate 2: premium users never see ads.
        match self.entitlement.is_premium().await {
            Ok(true) => {
                debug!("{placement_id}: skipped, user is premium");
                return true;
            }
            Ok(false) => {}
            Err(err) => {
                warn!("{placement_id}: {err}, assuming not premium");
            }
        }

        // Gate 3: global and remote ads switches.
        if !self.config.ads_enabled() {
            debug!("{placement_id}: skipped, ads disabled");
            return true;
        }

        // Explicit unit id beats the remotely configured default.
        let unit_id = match unit_id.or_else(|| self.config.default_unit(ad_type)) {
            Some(unit_id) => unit_id,
            None => {
                error!("{placement_id}: no {ad_type} unit id configured");
                return false;
            }
        };

        let mut unit = match self.provider.create(ad_type, &unit_id).await {
            Ok(unit) => unit,
            Err(err) => {
                warn!("{placement_id}: provider rejected request: {err}");
                self.analytics.log_event("AdERROR", &placement_id);
                return false;
            }
        };

        if let Err(err) = unit.load().await {
            warn!("{placement_id}: load failed: {err}");
            self.analytics.log_event("AdERROR", &placement_id);
            return false;
        }

        let mut lifecycle = Lifecycle::new(ad_type);
        while let Some(event) = unit.next_event().await {
            self.analytics.log_event(event.analytics_name(), &placement_id);

            match lifecycle.on_event(&event) {
                Step::Show => {
                    if let Err(err) = unit.show().await {
                        warn!("{placement_id}: show failed: {err}");
                        self.analytics.log_event("AdERROR", &placement_id);
                        // Route through the state machine so the settle
                        // point stays unique.
                        if let Step::Settle(outcome) =
                            lifecycle.on_event(&AdEvent::Error(err.to_string()))
                        {
                            return outcome;
                        }
                        return false;
                    }
                }
                Step::Note => {}
                Step::Settle(outcome) => {
                    debug!("{placement_id}: settled {outcome}");
                    return outcome;
                }
                Step::Ignore => {}
            }
        }

        // The provider dropped the event stream without a terminal event.
        // Settling false here keeps the caller from hanging forever on a
        // misbehaving provider; a stalled-but-open stream is left to the
        // provider's own timeout.
        warn!("{placement_id}: event stream ended before settlement");
        false
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use ag_core::AdUnitIds;

    use super::*;
    use crate::provider::{AdError, AdUnitHandle, EntitlementError};

    struct ScriptedUnit {
        events: VecDeque<AdEvent>,
        counters: Arc<Counters>,
        fail_load: bool,
        fail_show: bool,
    }

    #[async_trait]
    impl AdUnitHandle for ScriptedUnit {
        async fn load(&mut self) -> Result<(), AdError> {
            self.counters.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(AdError::Network("no fill".to_string()));
            }
            Ok(())
        }

        async fn show(&mut self) -> Result<(), AdError> {
            self.counters.shows.fetch_add(1, Ordering::SeqCst);
            if self.fail_show {
                return Err(AdError::Network("not ready".to_string()));
            }
            Ok(())
        }

        async fn next_event(&mut self) -> Option<AdEvent> {
            self.events.pop_front()
        }
    }

    #[derive(Default)]
    struct Counters {
        creates: AtomicUsize,
        loads: AtomicUsize,
        shows: AtomicUsize,
    }

    struct ScriptedProvider {
        events: Vec<AdEvent>,
        counters: Arc<Counters>,
        unit_ids: Arc<Mutex<Vec<String>>>,
        fail_load: bool,
        fail_show: bool,
    }

    impl ScriptedProvider {
        fn new(events: Vec<AdEvent>) -> Self {
            Self {
                events,
                counters: Arc::new(Counters::default()),
                unit_ids: Arc::new(Mutex::new(Vec::new())),
                fail_load: false,
                fail_show: false,
            }
        }
    }

    #[async_trait]
    impl AdProvider for ScriptedProvider {
        async fn create(
            &self,
            _ad_type: AdType,
            unit_id: &str,
        ) -> Result<Box<dyn AdUnitHandle>, AdError> {
            self.counters.creates.fetch_add(1, Ordering::SeqCst);
            self.unit_ids.lock().unwrap().push(unit_id.to_string());
            Ok(Box::new(ScriptedUnit {
                events: self.events.iter().cloned().collect(),
                counters: Arc::clone(&self.counters),
                fail_load: self.fail_load,
                fail_show: self.fail_show,
            }))
        }
    }

    struct StaticEntitlement(bool);

    #[async_trait]
    impl EntitlementProvider for StaticEntitlement {
        async fn is_premium(&self) -> Result<bool, EntitlementError> {
            Ok(self.0)
        }
    }

    struct FailingEntitlement;

    #[async_trait]
    impl EntitlementProvider for FailingEntitlement {
        async fn is_premium(&self) -> Result<bool, EntitlementError> {
            Err(EntitlementError("store unreachable".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingAnalytics {
        events: Mutex<Vec<(String, String)>>,
    }

    impl AnalyticsSink for RecordingAnalytics {
        fn log_event(&self, name: &str, placement_id: &str) {
            self.events
                .lock()
                .unwrap()
                .push((name.to_string(), placement_id.to_string()));
        }
    }

    fn controller<E: EntitlementProvider>(
        provider: ScriptedProvider,
        entitlement: E,
    ) -> AdLifecycleController<ScriptedProvider, E> {
        let config = Arc::new(AdsConfig::new());
        config.apply(RemoteSettings {
            ad_units: AdUnitIds {
                interstitial: Some("unit-int".to_string()),
                rewarded: Some("unit-rew".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        AdLifecycleController::new(
            Arc::new(PlacementRegistry::new()),
            Arc::new(Blocklist::new()),
            config,
            provider,
            entitlement,
        )
    }

    #[tokio::test]
    async fn test_end_to_end_interstitial() {
        let provider = ScriptedProvider::new(vec![
            AdEvent::Loaded,
            AdEvent::Opened,
            AdEvent::Closed,
        ]);
        let counters = Arc::clone(&provider.counters);
        let analytics = Arc::new(RecordingAnalytics::default());
        let ctl = controller(provider, StaticEntitlement(false))
            .with_analytics(Arc::clone(&analytics) as Arc<dyn AnalyticsSink>);
        ctl.set_current_route("/home");

        assert!(ctl.show_interstitial(None, None).await);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
        assert_eq!(counters.shows.load(Ordering::SeqCst), 1);

        let events = analytics.events.lock().unwrap();
        let expected_id = "home_interstitial_1";
        assert_eq!(
            *events,
            vec![
                ("AdLOADED".to_string(), expected_id.to_string()),
                ("OPENED".to_string(), expected_id.to_string()),
                ("AdCLOSED".to_string(), expected_id.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_blocked_placement_never_loads() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let counters = Arc::clone(&provider.counters);
        let ctl = controller(provider, StaticEntitlement(false));
        ctl.set_current_route("/home");
        ctl.set_blocklist(vec!["home".to_string()]);

        assert!(ctl.show_interstitial(None, Some("spot".to_string())).await);
        assert_eq!(counters.creates.load(Ordering::SeqCst), 0);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_premium_short_circuits() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let counters = Arc::clone(&provider.counters);
        let ctl = controller(provider, StaticEntitlement(true));

        assert!(ctl.show_interstitial(None, None).await);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ads_disabled_short_circuits() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let counters = Arc::clone(&provider.counters);
        let ctl = controller(provider, StaticEntitlement(false));
        ctl.apply_remote_settings(RemoteSettings {
            is_ads_enabled: false,
            ..Default::default()
        });

        assert!(ctl.show_rewarded(None, None).await);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rewarded_closed_without_reward() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let ctl = controller(provider, StaticEntitlement(false));
        ctl.set_current_route("/home");

        assert!(!ctl.show_rewarded(None, None).await);
    }

    #[tokio::test]
    async fn test_rewarded_earned_before_close_settles_true_once() {
        let provider = ScriptedProvider::new(vec![
            AdEvent::Loaded,
            AdEvent::EarnedReward,
            AdEvent::Closed,
        ]);
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(ctl.show_rewarded(None, None).await);
    }

    #[tokio::test]
    async fn test_rewarded_close_before_earned_settles_false() {
        // First-observed event wins, even when the reward callback trails.
        let provider = ScriptedProvider::new(vec![
            AdEvent::Loaded,
            AdEvent::Closed,
            AdEvent::EarnedReward,
        ]);
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(!ctl.show_rewarded(None, None).await);
    }

    #[tokio::test]
    async fn test_network_error_settles_false() {
        let provider = ScriptedProvider::new(vec![AdEvent::Error("no fill".to_string())]);
        let analytics = Arc::new(RecordingAnalytics::default());
        let ctl = controller(provider, StaticEntitlement(false))
            .with_analytics(Arc::clone(&analytics) as Arc<dyn AnalyticsSink>);
        ctl.set_current_route("/home");

        assert!(!ctl.show_interstitial(None, Some("spot".to_string())).await);
        let events = analytics.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![("AdERROR".to_string(), "home_interstitial_1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_load_failure_settles_false() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.fail_load = true;
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(!ctl.show_interstitial(None, None).await);
    }

    #[tokio::test]
    async fn test_show_failure_settles_false() {
        let mut provider = ScriptedProvider::new(vec![AdEvent::Loaded]);
        provider.fail_show = true;
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(!ctl.show_interstitial(None, None).await);
    }

    #[tokio::test]
    async fn test_stream_end_without_terminal_settles_false() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Opened]);
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(!ctl.show_interstitial(None, None).await);
    }

    #[tokio::test]
    async fn test_entitlement_failure_falls_open() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let counters = Arc::clone(&provider.counters);
        let ctl = controller(provider, FailingEntitlement);

        // Lookup failure means "not premium": the request proceeds.
        assert!(ctl.show_interstitial(None, None).await);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_unit_id_beats_remote_default() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let unit_ids = Arc::clone(&provider.unit_ids);
        let ctl = controller(provider, StaticEntitlement(false));

        assert!(
            ctl.show_interstitial(Some("override-unit".to_string()), None)
                .await
        );
        assert!(ctl.show_interstitial(None, None).await);
        assert_eq!(
            *unit_ids.lock().unwrap(),
            vec!["override-unit".to_string(), "unit-int".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_unit_id_settles_false() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let counters = Arc::clone(&provider.counters);
        let ctl = AdLifecycleController::new(
            Arc::new(PlacementRegistry::new()),
            Arc::new(Blocklist::new()),
            Arc::new(AdsConfig::new()),
            provider,
            StaticEntitlement(false),
        );

        assert!(!ctl.show_interstitial(None, None).await);
        assert_eq!(counters.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_placement_indices_distinguish_tags() {
        let provider = ScriptedProvider::new(vec![AdEvent::Loaded, AdEvent::Closed]);
        let ctl = controller(provider, StaticEntitlement(false));
        ctl.set_current_route("/home");

        assert_eq!(
            ctl.generate_placement_id(AdType::Interstitial, Some("top")),
            "home_interstitial_1"
        );
        assert_eq!(
            ctl.generate_placement_id(AdType::Interstitial, Some("bottom")),
            "home_interstitial_2"
        );
        assert_eq!(
            ctl.generate_placement_id(AdType::Interstitial, Some("top")),
            "home_interstitial_1"
        );
        assert!(!ctl.is_placement_blocked("home_interstitial_1"));
        ctl.set_blocklist(vec!["interstitial".to_string()]);
        assert!(ctl.is_placement_blocked("home_interstitial_1"));
    }
}
