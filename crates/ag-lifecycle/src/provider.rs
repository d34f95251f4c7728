//! External capability traits
//!
//! The controller treats the ad network, the entitlement check and the
//! analytics sink as opaque collaborators behind these traits. Hosts
//! implement them over whatever SDKs they ship; tests implement them with
//! scripted fakes.

use async_trait::async_trait;

use ag_core::AdType;

// =============================================================================
// Events
// =============================================================================

/// Abstract ad-network events, normalized from whatever callback style the
/// underlying SDK uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    /// The unit finished loading and can be shown.
    Loaded,
    /// The unit took over the screen. Side effects only; never settles.
    Opened,
    /// The unit was dismissed.
    Closed,
    /// The user watched far enough to earn the reward (rewarded only).
    EarnedReward,
    /// The network reported a failure, with its message.
    Error(String),
}

impl AdEvent {
    /// Analytics event name for this SDK event.
    pub fn analytics_name(&self) -> &'static str {
        match self {
            AdEvent::Loaded => "AdLOADED",
            AdEvent::Opened => "OPENED",
            AdEvent::Closed => "AdCLOSED",
            AdEvent::EarnedReward => "REWARDED",
            AdEvent::Error(_) => "AdERROR",
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failures originating in the ad network or its local bindings.
///
/// These never escape `show_*`: the controller maps every one of them to a
/// settled `false`.
#[derive(Debug, thiserror::Error)]
pub enum AdError {
    #[error("ad network error: {0}")]
    Network(String),
    #[error("no {0} unit available from provider")]
    Unavailable(AdType),
}

/// Failure while querying the user's premium status. The controller treats
/// this as "not premium" (fail-open) and logs it.
#[derive(Debug, thiserror::Error)]
#[error("entitlement lookup failed: {0}")]
pub struct EntitlementError(pub String);

// =============================================================================
// Capabilities
// =============================================================================

/// A single ad unit obtained from the provider for one show invocation.
///
/// Events must be delivered through `next_event` in the order the network
/// reports them; returning `None` means the stream ended and no further
/// event will arrive.
#[async_trait]
pub trait AdUnitHandle: Send {
    async fn load(&mut self) -> Result<(), AdError>;
    async fn show(&mut self) -> Result<(), AdError>;
    async fn next_event(&mut self) -> Option<AdEvent>;
}

/// Factory for ad units. One `create` per show invocation.
#[async_trait]
pub trait AdProvider: Send + Sync {
    async fn create(
        &self,
        ad_type: AdType,
        unit_id: &str,
    ) -> Result<Box<dyn AdUnitHandle>, AdError>;
}

/// External purchase-status check. Premium users never see ads.
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    async fn is_premium(&self) -> Result<bool, EntitlementError>;
}

/// Optional analytics sink. Implementations must swallow their own
/// failures; the lifecycle outcome never depends on analytics delivery.
pub trait AnalyticsSink: Send + Sync {
    fn log_event(&self, name: &str, placement_id: &str);
}

/// Default sink used when the host configures no analytics.
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn log_event(&self, _name: &str, _placement_id: &str) {}
}
