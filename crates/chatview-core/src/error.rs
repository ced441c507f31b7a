//! Error types shared across chatview-core.

use thiserror::Error;

/// Failures talking to the upstream AI API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, timeout, malformed body).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the payload held nothing usable.
    #[error("empty response: {0}")]
    EmptyResponse(&'static str),
}

/// Reasons a submission is refused before anything is sent upstream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("a request is already in progress")]
    Busy,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("prompt too large ({size} bytes); maximum is {max} bytes")]
    PromptTooLarge { size: usize, max: usize },

    /// No API key is configured; the settings modal has been opened.
    #[error("no API key configured")]
    MissingApiKey,
}

/// Failures reading or writing persisted settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid API key: {0}")]
    InvalidKey(String),

    #[error("settings backend error: {0}")]
    Backend(String),
}
