//! Breaker registry: call name → live circuit breaker.
//!
//! # Responsibilities
//! - Create breakers lazily on first use, at most one per call name
//! - Apply per-call settings, falling back to the process defaults
//! - Replace every breaker atomically when settings are reloaded
//!
//! # Design Decisions
//! - Read-mostly table behind a RwLock; creation re-checks under the write lock
//! - Reload builds a fresh table and swaps the pointer (ArcSwap), so callers
//!   holding an old breaker keep using it undisturbed until they finish
//! - Every table carries an epoch; state changes from breakers of a replaced
//!   table never reach the state gauge

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::BreakerSettings;
use crate::observability::metrics::CallMetrics;
use crate::resilience::circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, Policy, State, StateListener,
};

/// State gauge publisher shared by every breaker of every table.
///
/// Publishing happens under `live_epoch`, so a reload and its gauge reset
/// are ordered against every breaker notification.
struct StateGauge {
    metrics: Arc<dyn CallMetrics>,
    live_epoch: Mutex<u64>,
}

impl StateGauge {
    fn publish(&self, epoch: u64, name: &str, state: impl FnOnce() -> State) {
        let live = self.live_epoch.lock();
        if *live == epoch {
            self.metrics.breaker_state(name, state());
        }
    }
}

struct BreakerTable {
    epoch: u64,
    settings: HashMap<String, BreakerSettings>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    listener: StateListener,
}

impl BreakerTable {
    fn new(epoch: u64, settings: &[BreakerSettings], gauge: &Arc<StateGauge>) -> Self {
        let gauge = gauge.clone();
        let listener: StateListener = Arc::new(move |name: &str, _from: State, to: State| {
            gauge.publish(epoch, name, || to)
        });
        Self {
            epoch,
            settings: settings
                .iter()
                .map(|s| (s.name.clone(), s.clone()))
                .collect(),
            breakers: RwLock::new(HashMap::new()),
            listener,
        }
    }
}

/// Concurrency-safe registry of circuit breakers.
pub struct BreakerRegistry {
    table: ArcSwap<BreakerTable>,
    defaults: BreakerSettings,
    gauge: Arc<StateGauge>,
}

impl BreakerRegistry {
    /// Build a registry using `BreakerSettings::default()` for unlisted call names.
    pub fn new(settings: &[BreakerSettings], metrics: Arc<dyn CallMetrics>) -> Self {
        Self::with_defaults(settings, BreakerSettings::default(), metrics)
    }

    pub fn with_defaults(
        settings: &[BreakerSettings],
        defaults: BreakerSettings,
        metrics: Arc<dyn CallMetrics>,
    ) -> Self {
        let gauge = Arc::new(StateGauge {
            metrics,
            live_epoch: Mutex::new(0),
        });
        Self {
            table: ArcSwap::from_pointee(BreakerTable::new(0, settings, &gauge)),
            defaults,
            gauge,
        }
    }

    /// Return the breaker for `call_name`, creating it on first use.
    pub fn get_or_create(&self, call_name: &str) -> Arc<CircuitBreaker> {
        let table = self.table.load();

        if let Some(cb) = table.breakers.read().get(call_name) {
            return cb.clone();
        }

        let mut breakers = table.breakers.write();
        // Another caller may have created it between the read and write locks.
        if let Some(cb) = breakers.get(call_name) {
            return cb.clone();
        }

        let settings = table.settings.get(call_name).unwrap_or(&self.defaults);
        let cb = Arc::new(
            CircuitBreaker::new(call_name, Policy::from(settings))
                .with_listener(table.listener.clone()),
        );
        breakers.insert(call_name.to_string(), cb.clone());
        drop(breakers);

        tracing::debug!(name = %call_name, configured = table.settings.contains_key(call_name), "Circuit breaker created");
        // Read the state under the gauge lock: another caller may already have moved it.
        self.gauge.publish(table.epoch, call_name, || cb.stored_state());
        cb
    }

    /// Discard every breaker and start over with `settings`.
    pub fn reload(&self, settings: &[BreakerSettings]) {
        let mut live = self.gauge.live_epoch.lock();
        *live = live.wrapping_add(1);
        let previous = self
            .table
            .swap(Arc::new(BreakerTable::new(*live, settings, &self.gauge)));
        let names: Vec<String> = previous.breakers.read().keys().cloned().collect();
        for name in &names {
            self.gauge.metrics.breaker_state(name, State::Closed);
        }
        drop(live);

        tracing::info!(
            configured = settings.len(),
            discarded = names.len(),
            "Circuit breaker settings reloaded"
        );
    }

    /// Snapshot every live breaker, sorted by name.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let table = self.table.load();
        let breakers: Vec<Arc<CircuitBreaker>> = table.breakers.read().values().cloned().collect();
        let mut snapshots: Vec<BreakerSnapshot> = breakers.iter().map(|cb| cb.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Number of live breakers.
    pub fn len(&self) -> usize {
        self.table.load().breakers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
