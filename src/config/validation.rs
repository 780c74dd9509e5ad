//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check child service names are unique and URLs usable
//! - Validate value ranges (timeouts within [0, one day], ratios within (0, 1])
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// Largest accepted timeout or window, in seconds.
pub const MAX_DURATION_SECS: u64 = 86_400;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("child service at index {0} has an empty name")]
    EmptyServiceName(usize),

    #[error("child service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("child service '{name}' has invalid url '{url}'")]
    InvalidServiceUrl { name: String, url: String },

    #[error("timeout for '{0}' must not be negative")]
    NegativeTimeout(String),

    #[error("{field} for '{name}' exceeds one day")]
    DurationTooLong { name: String, field: &'static str },

    #[error("breaker settings at index {0} have an empty name")]
    EmptyBreakerName(usize),

    #[error("breaker settings for '{0}' are defined more than once")]
    DuplicateBreaker(String),

    #[error("breaker '{name}' failure ratio {ratio} is outside (0, 1]")]
    InvalidFailureRatio { name: String, ratio: f64 },

    #[error("breaker '{0}' needs a consecutive failure threshold above zero")]
    ZeroConsecutiveFailures(String),

    #[error("route timeout at index {0} has an empty name")]
    EmptyRouteName(usize),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut services = HashSet::new();
    for (i, service) in config.child_server.iter().enumerate() {
        if service.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName(i));
        } else if !services.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        let scheme_ok = url::Url::parse(&service.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !scheme_ok {
            errors.push(ValidationError::InvalidServiceUrl {
                name: service.name.clone(),
                url: service.url.clone(),
            });
        }

        check_timeout(&mut errors, &service.name, service.timeout);
    }

    let mut breakers = HashSet::new();
    for (i, settings) in config.http_breaker.iter().enumerate() {
        if settings.name.is_empty() {
            errors.push(ValidationError::EmptyBreakerName(i));
        } else if !breakers.insert(settings.name.as_str()) {
            errors.push(ValidationError::DuplicateBreaker(settings.name.clone()));
        }

        if !(settings.failure_ratio > 0.0 && settings.failure_ratio <= 1.0) {
            errors.push(ValidationError::InvalidFailureRatio {
                name: settings.name.clone(),
                ratio: settings.failure_ratio,
            });
        }

        if settings.consecutive_failures == 0 {
            errors.push(ValidationError::ZeroConsecutiveFailures(settings.name.clone()));
        }

        for (field, secs) in [("interval", settings.interval), ("timeout", settings.timeout)] {
            if secs > MAX_DURATION_SECS {
                errors.push(ValidationError::DurationTooLong {
                    name: settings.name.clone(),
                    field,
                });
            }
        }
    }

    for (i, route) in config.http_client.route_timeouts.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName(i));
        }
        check_timeout(&mut errors, &route.name, route.timeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_timeout(errors: &mut Vec<ValidationError>, name: &str, timeout: f64) {
    if timeout < 0.0 {
        errors.push(ValidationError::NegativeTimeout(name.to_string()));
    } else if timeout.is_nan() || timeout > MAX_DURATION_SECS as f64 {
        errors.push(ValidationError::DurationTooLong {
            name: name.to_string(),
            field: "timeout",
        });
    }
}
