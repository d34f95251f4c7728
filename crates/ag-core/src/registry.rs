//! Deterministic placement-id assignment
//!
//! The registry combines the current route, the ad type and a caller key
//! into a placement id of the form `{route}_{adType}_{index}`. Indices are
//! handed out per `route_adType` bucket, starting at 1, in first-seen
//! caller order, and an assignment is permanent for the life of the
//! registry: the same `(caller, route, type)` triple always yields the
//! same id. The blocklist and analytics pipelines key off these ids, so
//! this determinism is the load-bearing property of the whole engine.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::caller::current_call_site;
use crate::route::{normalize_route, INITIAL_ROUTE};
use crate::types::AdType;

/// Placement-id registry. Construct one per process (or per test) and
/// share it by reference; all methods take `&self`.
pub struct PlacementRegistry {
    inner: Mutex<RegistryState>,
}

struct RegistryState {
    /// Current route as reported by the host router.
    route: String,
    /// caller key -> (route_adType -> assigned index)
    callers: HashMap<String, HashMap<String, u32>>,
    /// route_adType -> highest index handed out so far
    counters: HashMap<String, u32>,
}

impl PlacementRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                route: INITIAL_ROUTE.to_string(),
                callers: HashMap::new(),
                counters: HashMap::new(),
            }),
        }
    }

    /// Update the current route from a raw router pathname.
    pub fn set_route(&self, pathname: &str) {
        let route = normalize_route(pathname);
        debug!("route set: {route}");
        self.lock().route = route;
    }

    /// The current normalized route.
    pub fn route(&self) -> String {
        self.lock().route.clone()
    }

    /// Generate the placement id for the calling site.
    ///
    /// An explicit `tag` overrides call-site capture and is the portable
    /// path for callers that cannot rely on `#[track_caller]` propagation
    /// (closures, trait objects, FFI shims).
    #[track_caller]
    pub fn generate_id(&self, ad_type: AdType, tag: Option<&str>) -> String {
        let caller_key = match tag {
            Some(tag) => tag.to_string(),
            None => current_call_site(),
        };
        self.generate_id_for_caller(ad_type, &caller_key)
    }

    /// Generate the placement id for an already-resolved caller key.
    pub fn generate_id_for_caller(&self, ad_type: AdType, caller_key: &str) -> String {
        let mut state = self.lock();

        let bucket = format!("{}_{}", state.route, ad_type.as_str());
        let assigned = state
            .callers
            .get(caller_key)
            .and_then(|per_bucket| per_bucket.get(&bucket))
            .copied();

        let index = match assigned {
            Some(index) => index,
            None => {
                let counter = state.counters.entry(bucket.clone()).or_insert(0);
                *counter += 1;
                let index = *counter;
                state
                    .callers
                    .entry(caller_key.to_string())
                    .or_default()
                    .insert(bucket.clone(), index);
                index
            }
        };

        let placement_id = format!("{bucket}_{index}");
        debug!("placement assigned: {placement_id} (caller {caller_key})");
        placement_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // A poisoned registry would otherwise disable ads for the rest of
        // the session; the state is valid after any panic mid-insert.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for PlacementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
