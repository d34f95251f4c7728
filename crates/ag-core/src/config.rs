//! Remote-settings model and ads-enabled switch
//!
//! The host application fetches a settings object from remote
//! configuration and hands the parsed result to [`AdsConfig::apply`].
//! Fetching itself is out of scope here; this module only models the
//! ads-relevant subset of the settings and combines the remote
//! `is_ads_enabled` flag with a process-wide kill switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::AdType;

// =============================================================================
// Remote settings
// =============================================================================

/// Per-type default ad-unit ids delivered by remote configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdUnitIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interstitial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewarded: Option<String>,
}

impl AdUnitIds {
    /// Default unit id for an ad type, if configured.
    pub fn unit_for(&self, ad_type: AdType) -> Option<&str> {
        match ad_type {
            AdType::AppOpen => self.app_open.as_deref(),
            AdType::Banner => self.banner.as_deref(),
            AdType::Interstitial => self.interstitial.as_deref(),
            AdType::Rewarded => self.rewarded.as_deref(),
        }
    }
}

/// Ads-relevant slice of the remotely configured settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Remote ads kill switch. Absent means enabled.
    #[serde(default = "default_true")]
    pub is_ads_enabled: bool,
    /// Placement block patterns, replaced wholesale on every delivery.
    #[serde(default)]
    pub ad_blocklist: Vec<String>,
    /// Default ad-unit ids per type.
    #[serde(default)]
    pub ad_units: AdUnitIds,
    /// Show an interstitial every Nth qualifying action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_ads_count: Option<u32>,
    /// Minimum app version gate (enforced elsewhere; carried for parity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            is_ads_enabled: true,
            ad_blocklist: Vec::new(),
            ad_units: AdUnitIds::default(),
            repeat_ads_count: None,
            min_version: None,
        }
    }
}

// =============================================================================
// Live config handle
// =============================================================================

/// Live ads configuration: the latest applied [`RemoteSettings`] plus a
/// process-wide kill switch. Ads are enabled only if *neither* is off.
pub struct AdsConfig {
    global_enabled: AtomicBool,
    settings: Mutex<RemoteSettings>,
}

impl AdsConfig {
    pub fn new() -> Self {
        Self {
            global_enabled: AtomicBool::new(true),
            settings: Mutex::new(RemoteSettings::default()),
        }
    }

    /// Flip the process-wide kill switch.
    pub fn set_ads_enabled(&self, enabled: bool) {
        self.global_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Replace the held settings with a fresh remote delivery.
    pub fn apply(&self, settings: RemoteSettings) {
        *self.lock() = settings;
    }

    /// Both the kill switch and the remote flag allow ads.
    pub fn ads_enabled(&self) -> bool {
        self.global_enabled.load(Ordering::Relaxed) && self.lock().is_ads_enabled
    }

    /// Remotely configured default unit id for an ad type.
    pub fn default_unit(&self, ad_type: AdType) -> Option<String> {
        self.lock().ad_units.unit_for(ad_type).map(str::to_string)
    }

    /// Copy of the currently held settings.
    pub fn snapshot(&self) -> RemoteSettings {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RemoteSettings> {
        match self.settings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self::new()
    }
}
