//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use chatview_core::{ApiKey, OpenAiConfig};

/// Runtime configuration for chatview-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"127.0.0.1:3000"`).
    pub bind_address: String,

    /// SQLite URL for persisted settings (default: `"sqlite://chatview.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,

    /// Model id used for text completions.
    pub chat_model: String,

    /// Optional system prompt prepended to every completion.
    pub system_prompt: Option<String>,

    /// Size requested from the image endpoint, e.g. `"512x512"`.
    pub image_size: String,

    /// Upstream request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Earlier messages sent as context with each completion.
    pub history_limit: usize,

    /// Extra words masked by the prompt filter.
    pub blocked_words: Vec<String>,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve `/api-docs/openapi.json`.
    pub enable_api_docs: bool,

    /// Used when no key has been saved through the settings modal.
    pub fallback_api_key: Option<ApiKey>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CHATVIEW_BIND", "127.0.0.1:3000"),
            database_url: env_or("CHATVIEW_DATABASE_URL", "sqlite://chatview.db"),
            log_level: env_or("CHATVIEW_LOG", "info"),
            log_json: parse_bool("CHATVIEW_LOG_JSON", false),
            openai_base_url: env_or("CHATVIEW_OPENAI_BASE_URL", chatview_core::provider::openai::DEFAULT_BASE_URL),
            chat_model: env_or("CHATVIEW_CHAT_MODEL", "gpt-3.5-turbo"),
            system_prompt: env_opt("CHATVIEW_SYSTEM_PROMPT"),
            image_size: env_or("CHATVIEW_IMAGE_SIZE", "512x512"),
            request_timeout_secs: parse_env("CHATVIEW_REQUEST_TIMEOUT_SECS", 60),
            history_limit: parse_env("CHATVIEW_HISTORY_LIMIT", chatview_core::view::DEFAULT_HISTORY_LIMIT),
            blocked_words: env_opt("CHATVIEW_BLOCKED_WORDS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            cors_allowed_origins: env_opt("CHATVIEW_CORS_ORIGINS"),
            enable_api_docs: parse_bool("CHATVIEW_ENABLE_API_DOCS", true),
            fallback_api_key: env_opt("OPENAI_API_KEY").and_then(|k| ApiKey::parse(&k).ok()),
        }
    }

    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.openai_base_url.clone(),
            chat_model: self.chat_model.clone(),
            system_prompt: self.system_prompt.clone(),
            image_size: self.image_size.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..OpenAiConfig::default()
        }
    }
}

impl Default for Config {
    /// Defaults without consulting the environment; used by tests.
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".into(),
            database_url: "sqlite::memory:".into(),
            log_level: "info".into(),
            log_json: false,
            openai_base_url: chatview_core::provider::openai::DEFAULT_BASE_URL.into(),
            chat_model: "gpt-3.5-turbo".into(),
            system_prompt: None,
            image_size: "512x512".into(),
            request_timeout_secs: 60,
            history_limit: chatview_core::view::DEFAULT_HISTORY_LIMIT,
            blocked_words: Vec::new(),
            cors_allowed_origins: None,
            enable_api_docs: true,
            fallback_api_key: None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}
