//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the client runtime from validated configuration
//! - Construct typed child-service clients
//! - Bind the listener last, once everything else is ready
//!
//! # Design Decisions
//! - Fail fast: a client for an unconfigured child service is a startup error

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::client::{CallError, ClientRuntime};
use crate::config::AppConfig;
use crate::http::{AppState, HttpServer};
use crate::observability::CallMetrics;
use crate::services::AmapClient;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("client setup failed: {0}")]
    Client(#[from] CallError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the process serves with.
pub struct App {
    pub runtime: Arc<ClientRuntime>,
    pub server: HttpServer,
}

/// Build the runtime, typed clients and HTTP server from `config`.
pub fn bootstrap(config: &AppConfig, metrics: Arc<dyn CallMetrics>) -> Result<App, StartupError> {
    let runtime = ClientRuntime::from_config(config, metrics);
    let amap = AmapClient::new(&runtime, &config.amap)?;

    tracing::info!(
        service = %runtime.self_service_name(),
        child_services = config.child_server.len(),
        breakers = config.http_breaker.len(),
        close_breaker = runtime.breaker_disabled(),
        "Client runtime initialized"
    );

    let state = AppState {
        runtime: runtime.clone(),
        amap,
    };
    Ok(App {
        runtime,
        server: HttpServer::new(state, &config.listener),
    })
}

/// Bind the inbound listener.
pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
