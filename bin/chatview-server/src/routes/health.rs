//! Health / heartbeat endpoint.
//!
//! Reports whether the settings store answers and whether a send is in
//! flight.  A store failure turns the response into a 503 so a supervisor
//! can restart the process.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chatview_core::SettingsStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    pub version: String,
    /// The settings store answered a read.
    pub settings_store: bool,
    /// A request to the AI provider is in flight.
    pub sending: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse),
        (status = 503, description = "Settings store unavailable", body = HealthResponse),
    )
)]
pub async fn get_health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let settings_store = match state.store.api_key().await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "health check: settings store unavailable");
            false
        }
    };
    let sending = state.chat.with_view(|v| v.is_thinking()).await;

    let (code, status) = if settings_store {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            settings_store,
            sending,
        }),
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
