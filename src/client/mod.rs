//! Outbound HTTP client layer for child services.
//!
//! # Data Flow
//! ```text
//! Caller (handler, service wrapper)
//!     → runtime.rs (client for a configured child service)
//!     → executor.rs (one call: encode, inject, breaker, transport, decode)
//!     → reply.rs (decode target and fallback fields)
//! ```
//!
//! # Design Decisions
//! - One shared transport (transport.rs) for every service
//! - Errors are classified once (error.rs) and drive breaker accounting, metrics and reply fallbacks
//! - Caller cancellation and deadlines never count against a breaker

pub mod codec;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod injectors;
pub mod reply;
pub mod runtime;
pub mod transport;

pub use codec::Body;
pub use context::CallContext;
pub use endpoint::{ServiceEndpoint, ServiceRegistry};
pub use error::{CallError, SERVICE_BUSY_CODE, SERVICE_BUSY_MESSAGE};
pub use executor::Client;
pub use injectors::{InjectRequest, RequestIdInjector, StaticHeader};
pub use reply::{Classifiable, Envelope, Json, Reply};
pub use runtime::ClientRuntime;
