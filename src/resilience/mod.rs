//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → timeouts.rs (resolve the deadline for this call name)
//!     → registry.rs (breaker for this call name, created on first use)
//!     → circuit_breaker.rs (admit, then settle with the outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - Circuit breaker prevents cascading failures
//! - Breaker rejections never reach the network and never count as failures

pub mod circuit_breaker;
pub mod registry;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, CircuitBreaker, Counts, Policy, State};
pub use registry::BreakerRegistry;
pub use timeouts::TimeoutTable;
