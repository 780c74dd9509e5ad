//! redis-admin service library: resilient outbound HTTP calls to child services.

// Core subsystems
pub mod client;
pub mod config;
pub mod http;
pub mod services;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use client::{CallContext, CallError, Client, ClientRuntime};
pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
