//! The browser page and its form actions.
//!
//! Every action is a plain `<form method="post">` that redirects back to `/`
//! (post/redirect/get), so the page works without client-side state.
//! Sending spawns the provider call and redirects immediately; while it runs
//! the page shows the thinking indicator and refreshes itself.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Form, Router};
use chatview_core::{AiModel, ApiKey, SendError, SettingsStore};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/send", post(send))
        .route("/clear", post(clear))
        .route("/alert/dismiss", post(dismiss_alert))
        .route("/settings", post(save_settings))
        .route("/settings/open", post(open_settings))
        .route("/settings/close", post(close_settings))
        .route("/settings/clear", post(clear_settings))
}

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub prompt: String,
    pub model: AiModel,
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub api_key: String,
}

fn back_to_thread() -> Redirect {
    Redirect::to("/#end")
}

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    let masked = state.api_key().await?.map(|(k, _)| k.masked());
    let snapshot = state.chat.snapshot().await;
    let html = state.templates.index(&snapshot, masked.as_deref())?;
    Ok(Html(html))
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SendForm>,
) -> Result<Redirect, ServerError> {
    let api_key = state.api_key().await?.map(|(key, _)| key);

    match state.chat.submit(form.prompt, form.model, api_key).await {
        Ok(pending) => {
            state.chat.spawn_dispatch(pending);
        }
        // The settings modal is now open; the prompt stays in the form.
        Err(SendError::MissingApiKey) => info!("send without API key; opening settings"),
        // Mirrors the disabled send button: nothing to do.
        Err(SendError::EmptyPrompt) => {}
        Err(e) => {
            warn!(error = %e, "send refused");
            state.chat.with_view(|v| v.raise_alert(e.to_string())).await;
        }
    }
    Ok(back_to_thread())
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Redirect {
    state
        .chat
        .with_view(|v| {
            if let Err(e) = v.clear_thread() {
                v.raise_alert(e.to_string());
            }
        })
        .await;
    Redirect::to("/")
}

pub async fn dismiss_alert(State(state): State<Arc<AppState>>) -> Redirect {
    state.chat.with_view(|v| v.dismiss_alert()).await;
    back_to_thread()
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, ServerError> {
    match ApiKey::parse(&form.api_key) {
        Ok(key) => {
            state.store.set_api_key(&key).await?;
            info!(key = %key, "API key saved");
            state.chat.with_view(|v| v.close_settings()).await;
        }
        Err(e) => {
            state.chat.with_view(|v| v.raise_alert(e.to_string())).await;
        }
    }
    Ok(back_to_thread())
}

pub async fn open_settings(State(state): State<Arc<AppState>>) -> Redirect {
    state.chat.with_view(|v| v.open_settings()).await;
    Redirect::to("/")
}

pub async fn close_settings(State(state): State<Arc<AppState>>) -> Redirect {
    state.chat.with_view(|v| v.close_settings()).await;
    back_to_thread()
}

pub async fn clear_settings(State(state): State<Arc<AppState>>) -> Result<Redirect, ServerError> {
    state.store.clear_api_key().await?;
    info!("API key removed");
    Ok(Redirect::to("/"))
}
