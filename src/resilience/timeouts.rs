//! Timeout resolution for outbound calls.
//!
//! # Responsibilities
//! - Pick the deadline that bounds one outbound call
//! - Per-call override first, then the child service default, then 600ms
//!
//! # Design Decisions
//! - The resolved value is applied to the transport request itself
//! - Overrides are swapped whole on config reload

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::schema::RouteTimeout;

/// Used when neither the call nor the child service configures a timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(600);

/// Convert a config value in (fractional) seconds; non-positive means unset.
pub fn seconds(value: f64) -> Option<Duration> {
    if value > 0.0 {
        Duration::try_from_secs_f64(value).ok()
    } else {
        None
    }
}

/// Per-call timeout overrides.
#[derive(Debug, Default)]
pub struct TimeoutTable {
    overrides: ArcSwap<HashMap<String, Duration>>,
}

impl TimeoutTable {
    pub fn new(routes: &[RouteTimeout]) -> Self {
        Self {
            overrides: ArcSwap::from_pointee(Self::build(routes)),
        }
    }

    fn build(routes: &[RouteTimeout]) -> HashMap<String, Duration> {
        routes
            .iter()
            .filter_map(|r| seconds(r.timeout).map(|d| (r.name.clone(), d)))
            .collect()
    }

    /// Replace all overrides.
    pub fn reload(&self, routes: &[RouteTimeout]) {
        self.overrides.store(std::sync::Arc::new(Self::build(routes)));
    }

    /// Timeout for `call_name`, given the owning service's default.
    pub fn resolve(&self, call_name: &str, service_default: Option<Duration>) -> Duration {
        self.overrides
            .load()
            .get(call_name)
            .copied()
            .or(service_default)
            .unwrap_or(DEFAULT_CALL_TIMEOUT)
    }
}
