//! JSON chat routes.
//!
//! These drive the same [`ChatSession`](chatview_core::ChatSession) the HTML
//! page renders, so a message sent here shows up in the browser and vice
//! versa.  Unlike the form route, `POST /api/messages` waits for the provider
//! and returns the outcome.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use chatview_core::{AiModel, Message, SendOutcome, ViewSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{OpenApi, ToSchema};

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_state, list_models, list_messages, send_message, clear_messages, select_model),
    components(schemas(SendRequest, SelectModelRequest, ClearResponse, SendOutcome, ViewSnapshot, Message, AiModel))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/state", get(get_state))
        .route("/models", get(list_models))
        .route(
            "/messages",
            get(list_messages).post(send_message).delete(clear_messages),
        )
        .route("/model", put(select_model))
}

/// Request body for `POST /api/messages`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendRequest {
    pub prompt: String,
    /// Defaults to the model currently selected in the view.
    #[serde(default)]
    pub model: Option<AiModel>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectModelRequest {
    pub model: AiModel,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Full view state (`GET /api/state`).
#[utoipa::path(
    get,
    path = "/api/state",
    tag = "chat",
    responses((status = 200, description = "Current view state", body = ViewSnapshot))
)]
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    Json(state.chat.snapshot().await)
}

/// Model options (`GET /api/models`).
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "chat",
    responses((status = 200, description = "Selectable models", body = [AiModel]))
)]
pub async fn list_models() -> Json<Vec<AiModel>> {
    Json(AiModel::ALL.to_vec())
}

/// Conversation thread (`GET /api/messages`).
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "chat",
    responses((status = 200, description = "Messages, oldest first", body = [Message]))
)]
pub async fn list_messages(State(state): State<Arc<AppState>>) -> Json<Vec<Message>> {
    let messages = state.chat.with_view(|v| v.messages().to_vec()).await;
    Json(messages)
}

/// Send a prompt and wait for the reply (`POST /api/messages`).
///
/// A provider failure is not an HTTP error: the outcome carries the alert
/// text in `error`, exactly as the page shows it.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "chat",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Send finished", body = SendOutcome),
        (status = 400, description = "Empty or oversized prompt"),
        (status = 401, description = "No API key configured"),
        (status = 409, description = "A request is already in progress"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendOutcome>, ServerError> {
    let model = match req.model {
        Some(m) => m,
        None => state.chat.with_view(|v| v.selected()).await,
    };
    let api_key = state.api_key().await?.map(|(key, _)| key);
    debug!(%model, prompt_len = req.prompt.len(), has_key = api_key.is_some(), "api send");

    let pending = state.chat.submit(req.prompt, model, api_key).await?;
    // A dropped connection cancels this handler, not the send.
    let outcome = state
        .chat
        .spawn_dispatch(pending)
        .await
        .map_err(|e| ServerError::Internal(format!("send task failed: {e}")))?;
    Ok(Json(outcome))
}

/// Start a new chat (`DELETE /api/messages`).
#[utoipa::path(
    delete,
    path = "/api/messages",
    tag = "chat",
    responses(
        (status = 200, description = "Thread cleared", body = ClearResponse),
        (status = 409, description = "A request is already in progress"),
    )
)]
pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearResponse>, ServerError> {
    state.chat.with_view(|v| v.clear_thread()).await?;
    Ok(Json(ClearResponse { cleared: true }))
}

/// Change the selected model (`PUT /api/model`).
#[utoipa::path(
    put,
    path = "/api/model",
    tag = "chat",
    request_body = SelectModelRequest,
    responses((status = 200, description = "Model selected", body = ViewSnapshot))
)]
pub async fn select_model(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectModelRequest>,
) -> Json<ViewSnapshot> {
    let snapshot = state
        .chat
        .with_view(|v| {
            v.select_model(req.model);
            v.snapshot()
        })
        .await;
    Json(snapshot)
}
