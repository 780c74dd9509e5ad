//! Child service endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::error::CallError;
use crate::config::ChildServiceConfig;
use crate::resilience::timeouts::seconds;

/// One configured child service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEndpoint {
    pub name: String,
    /// Base URL; relative call paths are appended verbatim.
    pub base_url: String,
    /// Non-empty when calls route through the service mesh sidecar.
    pub discovery_service_name: String,
    pub discovery_tag: String,
    /// Service-wide default timeout.
    pub timeout: Option<Duration>,
}

impl From<&ChildServiceConfig> for ServiceEndpoint {
    fn from(cfg: &ChildServiceConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            base_url: cfg.url.clone(),
            discovery_service_name: cfg.discovery_service_name.clone(),
            discovery_tag: cfg.discovery_tag.clone(),
            timeout: seconds(cfg.timeout),
        }
    }
}

/// Child services by name. Fixed for the life of the process.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceEndpoint>>,
}

impl ServiceRegistry {
    pub fn from_config(services: &[ChildServiceConfig]) -> Self {
        Self {
            services: services
                .iter()
                .map(|s| (s.name.clone(), Arc::new(ServiceEndpoint::from(s))))
                .collect(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<ServiceEndpoint>, CallError> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| CallError::UnknownService(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
