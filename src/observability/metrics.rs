//! Metrics collection and exposition.
//!
//! # Metrics
//! - `app_remote_call_request_totals` (counter): outbound calls that got a response, by service and call name
//! - `app_remote_call_duration_seconds` (histogram): outbound call latency
//! - `remote_call_error_count` (counter): failed outbound calls, by call name and classified status
//! - `circuit_breaker_count` (counter): calls rejected by an open or saturated breaker
//! - `app_remote_call_api_code_err` (counter): non-zero application codes inside successful replies
//! - `circuit_breaker_details` (gauge): breaker state, 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Recording goes through the global `metrics` recorder (Prometheus exporter in production)
//! - The call executor only sees the `CallMetrics` trait so tests can observe what was recorded

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::State;

pub const REQUEST_TOTAL: &str = "app_remote_call_request_totals";
pub const REQUEST_DURATION: &str = "app_remote_call_duration_seconds";
pub const ERROR_COUNT: &str = "remote_call_error_count";
pub const BREAKER_REJECTED: &str = "circuit_breaker_count";
pub const CODE_ERROR_COUNT: &str = "app_remote_call_api_code_err";
pub const BREAKER_STATE: &str = "circuit_breaker_details";

/// Install the Prometheus exporter and describe every metric.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
            return;
        }
    }

    metrics::describe_counter!(REQUEST_TOTAL, "http remote call request count");
    metrics::describe_histogram!(REQUEST_DURATION, "http remote call latency in seconds");
    metrics::describe_counter!(ERROR_COUNT, "remote call error count");
    metrics::describe_counter!(BREAKER_REJECTED, "circuit breaker count");
    metrics::describe_counter!(CODE_ERROR_COUNT, "http remote call api code request err count");
    metrics::describe_gauge!(BREAKER_STATE, "http circuit breaker details");
}

/// Record an outbound call that received an HTTP response.
pub fn record_request(service: &str, call_name: &str, elapsed: Duration) {
    metrics::counter!(REQUEST_TOTAL, "name" => service.to_owned(), "url" => call_name.to_owned())
        .increment(1);
    metrics::histogram!(REQUEST_DURATION, "name" => service.to_owned(), "url" => call_name.to_owned())
        .record(elapsed.as_secs_f64());
}

/// Record a failed outbound call.
pub fn record_error(call_name: &str, status: u16) {
    metrics::counter!(ERROR_COUNT, "url" => call_name.to_owned(), "status" => status.to_string())
        .increment(1);
}

/// Record a call the breaker refused to send.
pub fn record_breaker_rejected(call_name: &str) {
    metrics::counter!(BREAKER_REJECTED, "url" => call_name.to_owned()).increment(1);
}

/// Record an application-level error code found in a decoded reply.
pub fn record_code_error(service: &str, path: &str, code: i64, message: &str) {
    metrics::counter!(
        CODE_ERROR_COUNT,
        "service" => service.to_owned(),
        "url" => path.to_owned(),
        "code" => code.to_string(),
        "msg" => message.to_owned()
    )
    .increment(1);
}

/// Publish the current state of a breaker.
pub fn record_breaker_state(call_name: &str, state: State) {
    metrics::gauge!(BREAKER_STATE, "url" => call_name.to_owned()).set(state.gauge_value());
}

/// Sink for the outbound call layer's metrics.
pub trait CallMetrics: Send + Sync {
    fn request(&self, service: &str, call_name: &str, elapsed: Duration);
    fn error(&self, call_name: &str, status: u16);
    fn breaker_rejected(&self, call_name: &str);
    fn code_error(&self, service: &str, path: &str, code: i64, message: &str);
    fn breaker_state(&self, call_name: &str, state: State);
}

/// `CallMetrics` backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl CallMetrics for PrometheusMetrics {
    fn request(&self, service: &str, call_name: &str, elapsed: Duration) {
        record_request(service, call_name, elapsed);
    }

    fn error(&self, call_name: &str, status: u16) {
        record_error(call_name, status);
    }

    fn breaker_rejected(&self, call_name: &str) {
        record_breaker_rejected(call_name);
    }

    fn code_error(&self, service: &str, path: &str, code: i64, message: &str) {
        record_code_error(service, path, code, message);
    }

    fn breaker_state(&self, call_name: &str, state: State) {
        record_breaker_state(call_name, state);
    }
}
