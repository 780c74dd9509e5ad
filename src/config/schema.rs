//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the admin
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admin service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (public and inner bind addresses).
    pub listener: ListenerConfig,

    /// Outbound HTTP client settings shared by every child service.
    pub http_client: HttpClientConfig,

    /// Circuit breaker tuning, keyed by call name.
    pub http_breaker: Vec<BreakerSettings>,

    /// Child service definitions.
    pub child_server: Vec<ChildServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Amap weather API settings.
    pub amap: AmapConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout for inbound requests in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Name this process announces to child services.
    pub self_service_name: String,

    /// Disable circuit breaking for every call (default: breaking enabled).
    pub close_breaker: bool,

    /// Per-call timeout overrides, keyed by call name.
    pub route_timeouts: Vec<RouteTimeout>,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            self_service_name: "redis-admin".to_string(),
            close_breaker: false,
            route_timeouts: Vec::new(),
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Timeout override for a single call name (service name + path).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteTimeout {
    /// Call name, e.g. "amap/v3/weather/weatherInfo".
    pub name: String,

    /// Timeout in seconds (fractions allowed).
    pub timeout: f64,
}

/// A child service reachable over HTTP.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ChildServiceConfig {
    /// Logical service name used by callers.
    pub name: String,

    /// Base URL, e.g. "https://restapi.amap.com".
    pub url: String,

    /// Service name announced to the sidecar (empty = no sidecar headers).
    #[serde(default)]
    pub discovery_service_name: String,

    /// Discovery tag.
    #[serde(default)]
    pub discovery_tag: String,

    /// Default timeout for calls to this service in seconds (0 = built-in default).
    #[serde(default)]
    pub timeout: f64,
}

/// Circuit breaker tuning for one call name.
///
/// Durations are whole seconds, matching the config file format.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerSettings {
    /// Call name this entry applies to.
    pub name: String,

    /// Trial requests allowed while half-open; also the success count that closes the circuit.
    #[serde(alias = "maxRequests")]
    pub max_requests: u32,

    /// Closed-state counting window in seconds (0 = never reset).
    pub interval: u64,

    /// Seconds the circuit stays open before probing.
    pub timeout: u64,

    /// Minimum failures/requests ratio needed to trip.
    #[serde(alias = "failureRatio")]
    pub failure_ratio: f64,

    /// Minimum consecutive failures needed to trip.
    #[serde(alias = "consecutiveFailures")]
    pub consecutive_failures: u32,
}

impl Default for BreakerSettings {
    // 100 consecutive failures within 10s trip the circuit; probing resumes after 1s.
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: 100,
            interval: 10,
            timeout: 1,
            failure_ratio: 1.0,
            consecutive_failures: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Amap weather API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AmapConfig {
    /// Child service name the weather client resolves.
    pub service: String,

    /// API key.
    pub key: String,

    /// Adcode used when the caller does not pass a city.
    pub default_city: String,
}

impl Default for AmapConfig {
    fn default() -> Self {
        Self {
            service: "amap".to_string(),
            key: String::new(),
            default_city: "310106".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_breaker_settings() {
        let s = BreakerSettings::default();
        assert_eq!(s.max_requests, 100);
        assert_eq!(s.interval, 10);
        assert_eq!(s.timeout, 1);
        assert_eq!(s.failure_ratio, 1.0);
        assert_eq!(s.consecutive_failures, 100);
    }

    #[test]
    fn test_breaker_settings_accept_camel_case() {
        let s: BreakerSettings = toml::from_str(
            r#"
            name = "amap/info"
            maxRequests = 2
            interval = 5
            timeout = 3
            failureRatio = 0.5
            consecutiveFailures = 4
            "#,
        )
        .unwrap();
        assert_eq!(s.name, "amap/info");
        assert_eq!(s.max_requests, 2);
        assert_eq!(s.failure_ratio, 0.5);
        assert_eq!(s.consecutive_failures, 4);
    }

    #[test]
    fn test_minimal_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [[child_server]]
            name = "amap"
            url = "https://restapi.amap.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.child_server.len(), 1);
        assert_eq!(config.child_server[0].timeout, 0.0);
        assert!(config.child_server[0].discovery_service_name.is_empty());
        assert!(!config.http_client.close_breaker);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }
}
