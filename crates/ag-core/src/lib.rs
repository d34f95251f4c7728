//! AdGate Core Library
//!
//! This crate provides the placement identity and admission-control engine
//! for the AdGate ad-serving toolkit. It deterministically names every
//! ad-serving call site in a host application and decides, against a
//! remotely configured policy, whether that placement may fire.
//!
//! # Architecture
//!
//! Every ad request is attributed to a *caller key* (a stable token naming
//! the source call site), combined with the current navigation route and
//! the ad type into a placement id of the form `{route}_{adType}_{index}`.
//! The index is assigned once per `(caller, route, type)` triple and never
//! changes for the lifetime of the process, so the same call site always
//! produces the same id. Blocklist patterns and analytics key off that id.
//!
//! # Modules
//!
//! - `route`: navigation-path normalization
//! - `caller`: call-site identity (compiler-captured or trace-parsed)
//! - `registry`: deterministic placement-id assignment
//! - `matcher`: blocklist policy engine
//! - `config`: remote-settings model and ads-enabled switch
//! - `types`: shared type definitions

pub mod caller;
pub mod config;
pub mod matcher;
pub mod registry;
pub mod route;
pub mod types;

// Re-export commonly used types
pub use caller::{caller_key_from_frames, current_call_site, UNKNOWN_CALLER};
pub use config::{AdUnitIds, AdsConfig, RemoteSettings};
pub use matcher::Blocklist;
pub use registry::PlacementRegistry;
pub use route::normalize_route;
pub use types::{AdType, BlockMatch, BlockTier, Placement};
