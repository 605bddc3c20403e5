//! Embedded schema migrations.
//!
//! Each migration is a list of statements applied in one transaction and
//! recorded in `_stagehand_migrations` with a SHA-256 checksum. Editing an
//! applied migration is detected on the next start.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} ({name}) failed: {message}")]
    ExecutionFailed {
        version: i64,
        name: String,
        message: String,
    },

    #[error("Migration checksum mismatch for version {0}")]
    ChecksumMismatch(i64),

    #[error("Database has migration {0} which this build does not know")]
    Unknown(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: Vec<&'static str>,
    /// SHA-256 of the statements, hex encoded.
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: &'static str, statements: Vec<&'static str>) -> Self {
        let checksum = Self::compute_checksum(&statements);
        Self {
            version,
            name,
            statements,
            checksum,
        }
    }

    pub fn compute_checksum(statements: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for statement in statements {
            hasher.update(statement.trim().as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// The Stagehand schema, oldest first.
pub fn schema() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_records",
            vec![
                r#"
                CREATE TABLE IF NOT EXISTS records (
                    id TEXT PRIMARY KEY,
                    organization_id TEXT NOT NULL,
                    resource_type TEXT NOT NULL,
                    project_id TEXT,
                    created_by TEXT,
                    fields TEXT NOT NULL DEFAULT '{}',
                    last_modified_at INTEGER NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_records_tenant ON records (organization_id, resource_type)",
            ],
        ),
        Migration::new(
            2,
            "create_audit_entries",
            vec![
                r#"
                CREATE TABLE IF NOT EXISTS audit_entries (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    organization_id TEXT NOT NULL,
                    actor_user_id TEXT NOT NULL,
                    action TEXT NOT NULL,
                    resource_type TEXT NOT NULL,
                    resource_id TEXT,
                    details TEXT,
                    timestamp TEXT NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_entries (organization_id, resource_type, resource_id)",
                r#"
                CREATE TRIGGER IF NOT EXISTS audit_entries_no_update
                BEFORE UPDATE ON audit_entries
                BEGIN
                    SELECT RAISE(ABORT, 'audit entries are append-only');
                END
                "#,
                r#"
                CREATE TRIGGER IF NOT EXISTS audit_entries_no_delete
                BEFORE DELETE ON audit_entries
                BEGIN
                    SELECT RAISE(ABORT, 'audit entries are append-only');
                END
                "#,
            ],
        ),
    ]
}

pub struct MigrationRunner {
    pool: SqlitePool,
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool, mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { pool, migrations }
    }

    async fn init(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _stagehand_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Checksums of applied migrations, by version.
    pub async fn applied(&self) -> Result<HashMap<i64, String>, MigrationError> {
        self.init().await?;
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT version, checksum FROM _stagehand_migrations")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Verify applied migrations and apply pending ones.
    ///
    /// Returns how many were applied.
    pub async fn run(&self) -> Result<usize, MigrationError> {
        let applied = self.applied().await?;

        for version in applied.keys() {
            if !self.migrations.iter().any(|m| m.version == *version) {
                return Err(MigrationError::Unknown(*version));
            }
        }

        let mut count = 0;
        for migration in &self.migrations {
            match applied.get(&migration.version) {
                Some(checksum) if *checksum == migration.checksum => {
                    debug!(version = migration.version, "Migration already applied");
                }
                Some(_) => return Err(MigrationError::ChecksumMismatch(migration.version)),
                None => {
                    self.apply(migration).await?;
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        info!(version = migration.version, name = migration.name, "Applying migration");

        let failed = |e: sqlx::Error| MigrationError::ExecutionFailed {
            version: migration.version,
            name: migration.name.to_string(),
            message: e.to_string(),
        };

        let mut tx = self.pool.begin().await?;
        for statement in &migration.statements {
            sqlx::query(*statement).execute(&mut *tx).await.map_err(failed)?;
        }
        sqlx::query(
            "INSERT INTO _stagehand_migrations (version, name, checksum, applied_at) VALUES (?, ?, ?, ?)",
        )
        .bind(migration.version)
        .bind(migration.name)
        .bind(&migration.checksum)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_checksum_is_stable_and_content_sensitive() {
        let a = Migration::new(1, "a", vec!["CREATE TABLE t (x INTEGER)"]);
        let b = Migration::new(1, "a", vec!["  CREATE TABLE t (x INTEGER)\n"]);
        let c = Migration::new(1, "a", vec!["CREATE TABLE t (y INTEGER)"]);

        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 64);
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let pool = bare_pool().await;

        assert_eq!(MigrationRunner::new(pool.clone(), schema()).run().await.unwrap(), 2);
        assert_eq!(MigrationRunner::new(pool.clone(), schema()).run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edited_migration_is_detected() {
        let pool = bare_pool().await;
        MigrationRunner::new(pool.clone(), vec![Migration::new(1, "t", vec!["CREATE TABLE t (x INTEGER)"])])
            .run()
            .await
            .unwrap();

        let edited = vec![Migration::new(1, "t", vec!["CREATE TABLE t (x TEXT)"])];
        let err = MigrationRunner::new(pool, edited).run().await.unwrap_err();
        assert!(matches!(err, MigrationError::ChecksumMismatch(1)));
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() {
        let pool = bare_pool().await;
        let broken = vec![Migration::new(
            1,
            "broken",
            vec!["CREATE TABLE ok_table (x INTEGER)", "CREATE TABLE (nonsense"],
        )];

        let err = MigrationRunner::new(pool.clone(), broken).run().await.unwrap_err();
        assert!(matches!(err, MigrationError::ExecutionFailed { version: 1, .. }));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE name = 'ok_table'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_audit_table_rejects_update_and_delete() {
        let pool = bare_pool().await;
        MigrationRunner::new(pool.clone(), schema()).run().await.unwrap();

        sqlx::query(
            "INSERT INTO audit_entries (id, organization_id, actor_user_id, action, resource_type, timestamp)
             VALUES ('a', 'o', 'u', 'update', 'task', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let update = sqlx::query("UPDATE audit_entries SET action = 'delete'").execute(&pool).await;
        let delete = sqlx::query("DELETE FROM audit_entries").execute(&pool).await;

        assert!(update.unwrap_err().to_string().contains("append-only"));
        assert!(delete.unwrap_err().to_string().contains("append-only"));
    }
}
