//! SQLite implementation of [`ConfigStore`] and [`SettingsStore`].
//!
//! Migrations are embedded at compile time via `sqlx::migrate!("./migrations")`
//! (resolved relative to `CARGO_MANIFEST_DIR`) and run on [`SqliteStore::connect`].
//!
//! The `sqlx::query` (runtime-verified) form is used so that no `DATABASE_URL`
//! environment variable is needed at compile time.

use std::str::FromStr;

use chatview_core::{ApiKey, SettingsError, SettingsStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{ConfigStore, API_KEY_CONFIG_KEY};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://chatview.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is a separate database, so keep
        // exactly one connection alive for the life of the pool.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Close the pool; later queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ConfigStore for SqliteStore {
    async fn get_config_value(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM config_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn set_config_value(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO config_store (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        )
        .bind(key)
        .bind(value)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_config_value(&self, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM config_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn backend(e: sqlx::Error) -> SettingsError {
    SettingsError::Backend(e.to_string())
}

impl SettingsStore for SqliteStore {
    async fn api_key(&self) -> Result<Option<ApiKey>, SettingsError> {
        match self.get_config_value(API_KEY_CONFIG_KEY).await.map_err(backend)? {
            Some(raw) => ApiKey::parse(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set_api_key(&self, key: &ApiKey) -> Result<(), SettingsError> {
        self.set_config_value(API_KEY_CONFIG_KEY, key.expose())
            .await
            .map_err(backend)
    }

    async fn clear_api_key(&self) -> Result<(), SettingsError> {
        self.delete_config_value(API_KEY_CONFIG_KEY)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
