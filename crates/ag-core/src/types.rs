//! Core type definitions for AdGate
//!
//! These types are shared between the placement registry, the blocklist
//! policy engine and the lifecycle controller.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Ad Types
// =============================================================================

/// The closed set of ad formats a placement can carry.
///
/// The lowercase names are load-bearing: they appear verbatim inside
/// placement ids and are matched as literals by the type-only blocklist
/// tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Interstitial,
    Rewarded,
    Banner,
    AppOpen,
}

impl AdType {
    /// All known ad types, in a stable order.
    pub const ALL: [AdType; 4] = [
        AdType::Interstitial,
        AdType::Rewarded,
        AdType::Banner,
        AdType::AppOpen,
    ];

    /// The literal used inside placement ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Interstitial => "interstitial",
            AdType::Rewarded => "rewarded",
            AdType::Banner => "banner",
            AdType::AppOpen => "appopen",
        }
    }

    /// Parse an ad-type literal. Unknown strings are not defaulted: a
    /// placement id must never be minted for a type we do not know.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "interstitial" => Some(Self::Interstitial),
            "rewarded" => Some(Self::Rewarded),
            "banner" => Some(Self::Banner),
            "appopen" => Some(Self::AppOpen),
            _ => None,
        }
    }

    /// Is `s` one of the four known ad-type literals?
    pub fn is_known_literal(s: &str) -> bool {
        Self::parse(s).is_some()
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Placement
// =============================================================================

/// The structured form of a placement id.
///
/// Serialized as `{route}_{adType}_{index}`, e.g. `home_interstitial_1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Normalized route the ad fires on
    pub route: String,
    /// Ad format
    pub ad_type: AdType,
    /// Per-route-per-type sequence number, assigned from 1 in
    /// first-seen caller order
    pub index: u32,
}

impl Placement {
    /// Render the canonical placement id.
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.route, self.ad_type.as_str(), self.index)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.route, self.ad_type.as_str(), self.index)
    }
}

// =============================================================================
// Block Match
// =============================================================================

/// Which tier of the blocklist hierarchy matched a placement id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTier {
    /// Pattern `*` blocks everything
    Wildcard,
    /// Pattern equals the full placement id
    Exact,
    /// Pattern is a `route_type` bucket prefix
    Prefix,
    /// Pattern is an ad-type literal, blocking that type on every route
    TypeOnly,
    /// Pattern is a bare route name, blocking every type on that route
    PageOnly,
}

impl BlockTier {
    /// Short label used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTier::Wildcard => "wildcard",
            BlockTier::Exact => "exact",
            BlockTier::Prefix => "prefix",
            BlockTier::TypeOnly => "type",
            BlockTier::PageOnly => "page",
        }
    }
}

/// Result of a blocklist hit: the tier that fired and the pattern that
/// produced it (for logging).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    pub tier: BlockTier,
    pub pattern: String,
}
