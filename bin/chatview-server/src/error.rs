//! Unified server error type.
//!
//! Every JSON handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! Database and template failures are logged with full detail but only a
//! generic message is returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatview_core::{ProviderError, SendError, SettingsError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the SQLite settings store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The chat view refused the submission.
    #[error(transparent)]
    Send(#[from] SendError),

    /// The upstream AI API failed outside the send flow (key verification).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::Send(e) => {
                let status = match e {
                    SendError::Busy => StatusCode::CONFLICT,
                    SendError::EmptyPrompt | SendError::PromptTooLarge { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    SendError::MissingApiKey => StatusCode::UNAUTHORIZED,
                };
                (status, e.to_string())
            }

            ServerError::Settings(SettingsError::InvalidKey(m)) => {
                (StatusCode::BAD_REQUEST, format!("invalid API key: {m}"))
            }
            ServerError::Settings(SettingsError::Backend(m)) => {
                error!(error = %m, "settings backend error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }

            ServerError::Provider(ProviderError::Api { status, message })
                if *status == 401 || *status == 403 =>
            {
                (StatusCode::UNAUTHORIZED, format!("API key rejected: {message}"))
            }
            ServerError::Provider(e) => (StatusCode::BAD_GATEWAY, e.to_string()),

            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<minijinja::Error> for ServerError {
    fn from(e: minijinja::Error) -> Self {
        error!(error = ?e, "template rendering failed");
        ServerError::Internal(e.to_string())
    }
}
