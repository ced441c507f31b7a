//! The upstream AI API seam.
//!
//! [`AiProvider`] is object-safe so the session can hold an
//! `Arc<dyn AiProvider>`; the server wires in [`openai::OpenAiClient`] and tests
//! wire in scripted fakes.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::settings::ApiKey;

/// A prior exchange sent along with a completion as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub ai: bool,
    pub text: String,
}

/// Input for a text completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Oldest first.
    pub history: Vec<Turn>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Text completion for `request.prompt`.
    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: &ApiKey,
    ) -> Result<String, ProviderError>;

    /// Generate one image and return its URL.
    async fn generate_image(&self, prompt: &str, api_key: &ApiKey) -> Result<String, ProviderError>;

    /// Cheap authenticated call used to check a key before saving it.
    async fn verify_key(&self, api_key: &ApiKey) -> Result<(), ProviderError>;
}
