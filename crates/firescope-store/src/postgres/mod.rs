//! PostgreSQL storage adapter implementation
//!
//! One `PostgresStore` serves both ports. Feature sets are plain tables with
//! JSONB shapes, so curve geometries are stored without loss. Building
//! extracts are PostGIS tables filled from a source relation, typically a
//! foreign table over the remote files.

pub mod config;
pub mod engine;
pub mod features;

pub use config::{ConfigError, PoolConfig, PostgresConfig};

use firescope_core::error::{FirescopeError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// SQLSTATE for `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL storage adapter
///
/// The store owns the connection pool. Call [`PostgresStore::close`] once the
/// work is done.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresStore {
    /// Connect, test the connection and create the configured extensions
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| FirescopeError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| FirescopeError::Database(format!("Failed to connect to database: {}", e)))?;

        let store = Self { pool, config };
        store.health_check().await?;
        store.ensure_extensions().await?;

        tracing::debug!(extensions = ?store.config.extensions, "Connected to PostgreSQL");
        Ok(store)
    }

    /// Create every configured extension that is missing
    pub async fn ensure_extensions(&self) -> Result<()> {
        for extension in &self.config.extensions {
            sqlx::query(&format!("CREATE EXTENSION IF NOT EXISTS \"{}\"", extension))
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    FirescopeError::Database(format!(
                        "Failed to create extension {}: {}",
                        extension, e
                    ))
                })?;
        }
        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL connection closed");
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FirescopeError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// True when the error reports a missing relation
pub(crate) fn is_undefined_table(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE))
}

/// Wrap a sqlx error with what was being done
pub(crate) fn db_error(context: &str, error: sqlx::Error) -> FirescopeError {
    FirescopeError::Database(format!("{}: {}", context, error))
}
