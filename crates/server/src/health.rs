use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use atende_core::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<SessionStore>,
    providers: Vec<&'static str>,
    providers_ready: bool,
}

impl HealthState {
    pub fn new(
        store: Arc<SessionStore>,
        providers: Vec<&'static str>,
        providers_ready: bool,
    ) -> Self {
        Self { store, providers, providers_ready }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub providers: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let providers = if state.providers_ready {
        HealthCheck {
            status: "ready",
            detail: format!("configured providers: {}", state.providers.join(", ")),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "no provider has an api key configured".to_string(),
        }
    };
    let ready = providers.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "atende-server runtime initialized".to_string(),
        },
        providers,
        active_sessions: state.store.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
