//! Database abstraction layer.
//!
//! [`ConfigStore`] is a plain key/value interface over the `config_store`
//! table.  The default implementation is [`sqlite::SqliteStore`], which also
//! implements [`chatview_core::SettingsStore`] on top of it so the chat view's
//! API key survives restarts.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

/// Config-store key holding the upstream API key.
pub const API_KEY_CONFIG_KEY: &str = "openai.api_key";

pub trait ConfigStore: Send + Sync + 'static {
    fn get_config_value(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;

    fn set_config_value(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Returns `true` if a row was removed.
    fn delete_config_value(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}
