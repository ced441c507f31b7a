//! The user's API key and where it is kept.
//!
//! [`SettingsStore`] is the persistence seam; the server backs it with SQLite
//! and tests use [`MemorySettingsStore`].  All trait methods use `impl Future`
//! in their signatures so no extra `async-trait` crate is required.

use std::fmt;
use std::future::Future;

use tokio::sync::RwLock;

use crate::error::SettingsError;

/// An upstream API key.
///
/// `Debug` and `Display` print a masked form so the key can sit inside
/// structured log fields without leaking.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trim and validate a user-supplied key.
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("key is empty".into()));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(SettingsError::InvalidKey("key contains whitespace".into()));
        }
        Ok(Self(key.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `sk-…abcd`: the first three and last four characters.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "…".to_owned();
        }
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Persistence for the API key.
pub trait SettingsStore: Send + Sync + 'static {
    fn api_key(&self) -> impl Future<Output = Result<Option<ApiKey>, SettingsError>> + Send;

    fn set_api_key(&self, key: &ApiKey) -> impl Future<Output = Result<(), SettingsError>> + Send;

    fn clear_api_key(&self) -> impl Future<Output = Result<(), SettingsError>> + Send;
}

/// Process-local settings; lost on restart.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    key: RwLock<Option<ApiKey>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn api_key(&self) -> Result<Option<ApiKey>, SettingsError> {
        Ok(self.key.read().await.clone())
    }

    async fn set_api_key(&self, key: &ApiKey) -> Result<(), SettingsError> {
        *self.key.write().await = Some(key.clone());
        Ok(())
    }

    async fn clear_api_key(&self) -> Result<(), SettingsError> {
        *self.key.write().await = None;
        Ok(())
    }
}
