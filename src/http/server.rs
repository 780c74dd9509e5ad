//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with health, weather and admin handlers
//! - Wire up middleware (request id, tracing, request timeout)
//! - Serve until the shutdown future resolves

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::admin_routes;
use crate::client::ClientRuntime;
use crate::config::schema::ListenerConfig;
use crate::http::request::call_context_from_headers;
use crate::http::response::ApiResponse;
use crate::services::{AmapClient, WeatherInfo};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ClientRuntime>,
    pub amap: AmapClient,
}

/// Inbound HTTP server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, listener: &ListenerConfig) -> Self {
        Self {
            router: Self::build_router(state, Duration::from_secs(listener.request_timeout_secs)),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/ping", get(ping))
            .route("/hc", get(ping))
            .route("/index", get(index))
            .route("/amap/weather", get(weather))
            .merge(admin_routes())
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn ping() -> &'static str {
    "OK"
}

async fn index(State(state): State<AppState>) -> String {
    format!("Hello {}", state.runtime.self_service_name())
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    location_ip: Option<String>,
    city: Option<String>,
}

async fn weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WeatherQuery>,
) -> impl IntoResponse {
    let ctx = call_context_from_headers(&headers);
    tracing::debug!(
        location_ip = query.location_ip.as_deref().unwrap_or_default(),
        city = query.city.as_deref().unwrap_or_default(),
        "Weather lookup"
    );

    match state.amap.weather_info(&ctx, query.city.as_deref()).await {
        Ok(info) => ApiResponse::ok(info),
        Err(e) => ApiResponse::<WeatherInfo>::from_error(&e),
    }
}
