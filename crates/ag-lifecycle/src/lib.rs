//! AdGate Lifecycle Library
//!
//! Drives a single ad unit through its load -> show -> settle cycle on top
//! of the `ag-core` identity and policy engine. The ad network, the
//! entitlement check and the analytics sink are opaque capabilities
//! supplied by the host through the traits in [`provider`].
//!
//! The central contract: `show_interstitial` / `show_rewarded` always
//! settle to a `bool`, exactly once, regardless of the order in which the
//! ad network delivers its callbacks. They never return an error.
//!
//! # Modules
//!
//! - `provider`: external capability traits and the event/error vocabulary
//! - `state`: the per-invocation finite state machine
//! - `controller`: gating and orchestration

pub mod controller;
pub mod provider;
pub mod state;

// Re-export commonly used types
pub use controller::AdLifecycleController;
pub use provider::{
    AdError, AdEvent, AdProvider, AdUnitHandle, AnalyticsSink, EntitlementError,
    EntitlementProvider, NoopAnalytics,
};
pub use state::{Lifecycle, Phase, Step};
