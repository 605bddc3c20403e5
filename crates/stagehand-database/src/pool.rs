//! Connection pool.

use crate::migration::{schema, MigrationError, MigrationRunner};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use stagehand_common_config::DatabaseConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

const MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to create connection pool: {0}")]
    Creation(#[from] sqlx::Error),

    #[error("Pool health check failed: {0}")]
    HealthCheck(String),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] MigrationError),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// File path, or `:memory:`.
    pub database_path: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub wal_mode: bool,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    pub create_if_missing: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_settings(&DatabaseConfig::default())
    }
}

impl PoolConfig {
    pub fn from_settings(settings: &DatabaseConfig) -> Self {
        Self {
            database_path: settings.path.clone(),
            max_connections: settings.max_connections,
            acquire_timeout: Duration::from_secs(30),
            wal_mode: settings.wal_mode,
            busy_timeout: Duration::from_millis(settings.busy_timeout_ms),
            create_if_missing: true,
        }
    }

    /// A private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` opens a fresh database, so the
    /// pool is pinned to one connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            database_path: MEMORY.to_string(),
            max_connections: 1,
            wal_mode: false,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == MEMORY
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.is_in_memory() && self.max_connections != 1 {
            return Err(PoolError::InvalidConfig(
                "an in-memory database needs exactly one connection".to_string(),
            ));
        }
        Ok(())
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, PoolError> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| PoolError::InvalidConfig(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(self.create_if_missing)
        };

        let options = options.busy_timeout(self.busy_timeout);
        Ok(if self.wal_mode {
            options.journal_mode(SqliteJournalMode::Wal)
        } else {
            options
        })
    }
}

/// An open, migrated database.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Open the database and apply any pending schema migrations.
    #[instrument(skip(config), fields(path = %config.database_path))]
    pub async fn connect(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect_with(config.connect_options()?).await?;
        let db = Self { pool };
        db.health_check().await?;

        let applied = MigrationRunner::new(db.pool.clone(), schema()).run().await?;
        info!(
            max_connections = config.max_connections,
            migrations_applied = applied,
            "Database ready"
        );

        Ok(db)
    }

    pub async fn in_memory() -> Result<Self, PoolError> {
        Self::connect(PoolConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PoolError::HealthCheck(e.to_string()))?;
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
