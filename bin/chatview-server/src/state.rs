//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use chatview_core::{
    AiProvider, ApiKey, ChatSession, ChatView, ProfanityFilter, SettingsError, SettingsStore,
};

use crate::config::Config;
use crate::db::sqlite::SqliteStore;
use crate::templates::Templates;

/// Where the effective API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Saved through the settings modal.
    Stored,
    /// `OPENAI_API_KEY` environment variable.
    Environment,
}

impl KeySource {
    pub fn as_str(self) -> &'static str {
        match self {
            KeySource::Stored => "stored",
            KeySource::Environment => "environment",
        }
    }
}

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persisted settings.
    pub store: Arc<SqliteStore>,
    /// The single chat view this server renders.
    pub chat: Arc<ChatSession>,
    pub templates: Arc<Templates>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: SqliteStore,
        provider: Arc<dyn AiProvider>,
    ) -> Result<Self, minijinja::Error> {
        let filter = ProfanityFilter::new(&config.blocked_words);
        let view = ChatView::new(filter, config.history_limit);
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            chat: Arc::new(ChatSession::new(view, provider)),
            templates: Arc::new(Templates::new()?),
        })
    }

    /// The key to send upstream: the saved one, else the env fallback.
    pub async fn api_key(&self) -> Result<Option<(ApiKey, KeySource)>, SettingsError> {
        if let Some(key) = self.store.api_key().await? {
            return Ok(Some((key, KeySource::Stored)));
        }
        Ok(self
            .config
            .fallback_api_key
            .clone()
            .map(|key| (key, KeySource::Environment)))
    }
}
