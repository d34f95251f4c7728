//! Blocklist policy engine
//!
//! Decides whether a placement id must be suppressed. Patterns come from
//! remote configuration and are replaced wholesale on every refresh; an
//! empty list blocks nothing. Patterns are evaluated in list order and the
//! first hit wins.
//!
//! Matching hierarchy, per pattern:
//!
//! 1. Wildcard: `*` blocks everything
//! 2. Exact: `index_interstitial_2`
//! 3. Prefix (route+type bucket): `index_interstitial` blocks
//!    `index_interstitial_1`, `_2`, ...
//! 4. Type only: `interstitial` blocks any id containing `_interstitial_`
//! 5. Page only: `index` blocks any id starting with `index_`

use std::sync::Mutex;

use log::info;

use crate::types::{AdType, BlockMatch, BlockTier};

/// Remotely configured list of block patterns.
///
/// Interior-mutable so the holder can be shared behind an `Arc` between
/// the config-refresh path and the request path.
pub struct Blocklist {
    patterns: Mutex<Vec<String>>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self {
            patterns: Mutex::new(Vec::new()),
        }
    }

    /// Replace the pattern list wholesale. Remote config deliveries never
    /// merge with the previous list.
    pub fn set_patterns(&self, patterns: Vec<String>) {
        info!("ad blocklist loaded: {patterns:?}");
        *self.lock() = patterns;
    }

    /// Current patterns, in evaluation order.
    pub fn patterns(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Does any pattern block this placement id?
    pub fn is_blocked(&self, placement_id: &str) -> bool {
        self.matched(placement_id).is_some()
    }

    /// First pattern blocking this placement id, with the tier that fired.
    pub fn matched(&self, placement_id: &str) -> Option<BlockMatch> {
        let patterns = self.lock();
        for pattern in patterns.iter() {
            if let Some(tier) = match_pattern(pattern, placement_id) {
                info!(
                    "ad blocked ({}): {placement_id} by {pattern}",
                    tier.as_str()
                );
                return Some(BlockMatch {
                    tier,
                    pattern: pattern.clone(),
                });
            }
        }
        None
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        match self.patterns.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a single pattern against a placement id.
pub fn match_pattern(pattern: &str, placement_id: &str) -> Option<BlockTier> {
    if pattern == "*" {
        return Some(BlockTier::Wildcard);
    }

    if pattern == placement_id {
        return Some(BlockTier::Exact);
    }

    // `index_interstitial` matches `index_interstitial_2` but must not
    // match `index_interstitial2_x`, hence the trailing separator.
    if starts_with_bucket(placement_id, pattern) {
        return Some(BlockTier::Prefix);
    }

    if AdType::is_known_literal(pattern) {
        let needle = format!("_{pattern}_");
        if placement_id.contains(&needle) {
            return Some(BlockTier::TypeOnly);
        }
        return None;
    }

    // Bare page name: no underscore, not an ad type.
    if !pattern.contains('_') && starts_with_bucket(placement_id, pattern) {
        return Some(BlockTier::PageOnly);
    }

    None
}

fn starts_with_bucket(placement_id: &str, pattern: &str) -> bool {
    placement_id
        .strip_prefix(pattern)
        .is_some_and(|rest| rest.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_blocks_nothing() {
        let blocklist = Blocklist::new();
        assert!(!blocklist.is_blocked("home_interstitial_1"));
    }

    #[test]
    fn test_wildcard_blocks_everything() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["*".to_string()]);
        let m = blocklist.matched("anything_banner_9").unwrap();
        assert_eq!(m.tier, BlockTier::Wildcard);
    }

    #[test]
    fn test_exact_match() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["index_interstitial_2".to_string()]);
        assert!(blocklist.is_blocked("index_interstitial_2"));
        assert!(!blocklist.is_blocked("index_interstitial_1"));
    }

    #[test]
    fn test_prefix_blocks_whole_bucket() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["index_interstitial".to_string()]);
        assert!(blocklist.is_blocked("index_interstitial_3"));
        assert!(!blocklist.is_blocked("index_banner_1"));
        let m = blocklist.matched("index_interstitial_3").unwrap();
        assert_eq!(m.tier, BlockTier::Prefix);
    }

    #[test]
    fn test_type_only_blocks_across_routes() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["rewarded".to_string()]);
        assert!(blocklist.is_blocked("home_rewarded_2"));
        assert!(blocklist.is_blocked("settings_rewarded_1"));
        assert!(!blocklist.is_blocked("home_banner_1"));
        let m = blocklist.matched("home_rewarded_2").unwrap();
        assert_eq!(m.tier, BlockTier::TypeOnly);
    }

    #[test]
    fn test_page_only_blocks_across_types() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["home".to_string()]);
        assert!(blocklist.is_blocked("home_banner_1"));
        assert!(blocklist.is_blocked("home_interstitial_4"));
        // No false prefix match on a longer route name.
        assert!(!blocklist.is_blocked("homepage_banner_1"));
        let m = blocklist.matched("home_banner_1").unwrap();
        assert_eq!(m.tier, BlockTier::PageOnly);
    }

    #[test]
    fn test_list_order_first_match_wins() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec![
            "index_interstitial".to_string(),
            "*".to_string(),
        ]);
        let m = blocklist.matched("index_interstitial_1").unwrap();
        assert_eq!(m.tier, BlockTier::Prefix);
        assert_eq!(m.pattern, "index_interstitial");

        // Reordered, the wildcard short-circuits first.
        blocklist.set_patterns(vec![
            "*".to_string(),
            "index_interstitial".to_string(),
        ]);
        let m = blocklist.matched("index_interstitial_1").unwrap();
        assert_eq!(m.tier, BlockTier::Wildcard);
    }

    #[test]
    fn test_replacement_is_wholesale() {
        let blocklist = Blocklist::new();
        blocklist.set_patterns(vec!["home".to_string()]);
        blocklist.set_patterns(vec!["settings".to_string()]);
        assert!(!blocklist.is_blocked("home_banner_1"));
        assert!(blocklist.is_blocked("settings_banner_1"));
    }

    #[test]
    fn test_type_literal_on_same_named_route() {
        // A route that happens to be named like an ad type still hits the
        // broader prefix tier; the type-only tier covers the other routes.
        assert_eq!(
            match_pattern("banner", "banner_interstitial_1"),
            Some(BlockTier::Prefix)
        );
        assert_eq!(
            match_pattern("banner", "home_banner_1"),
            Some(BlockTier::TypeOnly)
        );
        // But a type literal never page-matches: it only fires on the
        // `_type_` infix or a leading bucket prefix.
        assert_eq!(match_pattern("banner", "bannerette_rewarded_1"), None);
    }
}
