//! Inbound HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace and timeout layers)
//!     → request.rs (trace context and request id for outbound calls)
//!     → handlers → client layer → child services
//!     → response.rs ({code, message, data} envelope)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{call_context_from_headers, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
