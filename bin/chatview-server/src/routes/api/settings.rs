//! API key settings.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chatview_core::{ApiKey, SettingsStore};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{OpenApi, ToSchema};

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_settings, put_settings, delete_settings),
    components(schemas(SettingsResponse, UpdateSettingsRequest))
)]
pub struct SettingsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/settings",
        get(get_settings).put(put_settings).delete(delete_settings),
    )
}

/// Never includes the key itself.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub has_api_key: bool,
    /// e.g. `sk-…abcd`.
    pub masked_key: Option<String>,
    /// `"stored"` or `"environment"`.
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub api_key: String,
    /// Check the key against the provider before saving it.
    #[serde(default)]
    pub verify: bool,
}

async fn current(state: &AppState) -> Result<SettingsResponse, ServerError> {
    let resolved = state.api_key().await?;
    Ok(SettingsResponse {
        has_api_key: resolved.is_some(),
        masked_key: resolved.as_ref().map(|(k, _)| k.masked()),
        source: resolved.map(|(_, s)| s.as_str().to_owned()),
    })
}

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    responses((status = 200, description = "Key status", body = SettingsResponse))
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ServerError> {
    Ok(Json(current(&state).await?))
}

/// Save the API key and close the settings modal.
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Key saved", body = SettingsResponse),
        (status = 400, description = "Malformed key"),
        (status = 401, description = "Provider rejected the key"),
    )
)]
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ServerError> {
    let key = ApiKey::parse(&req.api_key)?;
    if req.verify {
        state.chat.provider().verify_key(&key).await?;
    }
    state.store.set_api_key(&key).await?;
    state.chat.with_view(|v| v.close_settings()).await;
    info!(key = %key, verified = req.verify, "API key saved");
    Ok(Json(current(&state).await?))
}

/// Remove the saved key.  An `OPENAI_API_KEY` fallback still applies.
#[utoipa::path(
    delete,
    path = "/api/settings",
    tag = "settings",
    responses((status = 200, description = "Key removed", body = SettingsResponse))
)]
pub async fn delete_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ServerError> {
    state.store.clear_api_key().await?;
    info!("API key removed");
    Ok(Json(current(&state).await?))
}
