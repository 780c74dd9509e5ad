use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::circuit_breaker::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub service: String,
    pub breaker_disabled: bool,
    pub child_services: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let runtime = &state.runtime;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        service: runtime.self_service_name().to_string(),
        breaker_disabled: runtime.breaker_disabled(),
        child_services: runtime
            .services()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Every live breaker with its state and current-generation counts.
pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.runtime.breakers().snapshot())
}
