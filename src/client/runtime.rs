//! Shared state behind every service client.
//!
//! # Responsibilities
//! - Own the service table, breaker registry, timeout table and metrics sink
//! - Hand out clients bound to one child service
//! - Apply hot-reloadable settings (breakers, timeouts, breaker kill switch)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::endpoint::ServiceRegistry;
use crate::client::error::CallError;
use crate::client::executor::Client;
use crate::config::AppConfig;
use crate::observability::CallMetrics;
use crate::resilience::{BreakerRegistry, TimeoutTable};

pub struct ClientRuntime {
    pub(crate) services: ServiceRegistry,
    pub(crate) breakers: BreakerRegistry,
    pub(crate) timeouts: TimeoutTable,
    pub(crate) self_service_name: String,
    pub(crate) pool_idle_timeout: Duration,
    pub(crate) metrics: Arc<dyn CallMetrics>,
    breaker_disabled: AtomicBool,
}

impl ClientRuntime {
    pub fn from_config(config: &AppConfig, metrics: Arc<dyn CallMetrics>) -> Arc<Self> {
        let http = &config.http_client;
        Arc::new(Self {
            services: ServiceRegistry::from_config(&config.child_server),
            breakers: BreakerRegistry::new(&config.http_breaker, metrics.clone()),
            timeouts: TimeoutTable::new(&http.route_timeouts),
            self_service_name: http.self_service_name.clone(),
            pool_idle_timeout: Duration::from_secs(http.pool_idle_timeout_secs),
            metrics,
            breaker_disabled: AtomicBool::new(http.close_breaker),
        })
    }

    /// A client bound to the child service `name`.
    ///
    /// Fails with [`CallError::UnknownService`] when `name` is not configured;
    /// callers treat that as a startup fault.
    pub fn client(self: &Arc<Self>, name: &str) -> Result<Client, CallError> {
        let endpoint = self.services.resolve(name)?;
        Ok(Client::new(endpoint, self.clone()))
    }

    /// Apply the hot-reloadable parts of `config`.
    pub fn apply_reload(&self, config: &AppConfig) {
        let http = &config.http_client;
        self.breaker_disabled.store(http.close_breaker, Ordering::Relaxed);
        self.timeouts.reload(&http.route_timeouts);
        self.breakers.reload(&config.http_breaker);
        tracing::info!(
            close_breaker = http.close_breaker,
            route_timeouts = http.route_timeouts.len(),
            "Client settings reloaded"
        );
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn self_service_name(&self) -> &str {
        &self.self_service_name
    }

    pub fn breaker_disabled(&self) -> bool {
        self.breaker_disabled.load(Ordering::Relaxed)
    }
}
