//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call layer produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (trace context propagated to child services)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape on the inner address)
//!     → Child services continuing the trace
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::metrics::{CallMetrics, PrometheusMetrics};
pub use self::tracing::TraceContext;
