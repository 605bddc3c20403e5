//! SQLite audit store.
//!
//! The table rejects UPDATE and DELETE at the trigger level; this type only
//! ever inserts and reads.

use crate::pool::DatabasePool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use stagehand_audit::{AuditStore, AuditStoreError};
use stagehand_audit_types::{AuditAction, AuditEntry, AuditEntryId, ResourceType};
use stagehand_common_core::{OrganizationId, UserId};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    db: DatabasePool,
}

impl SqliteAuditStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

fn backend(e: impl std::fmt::Display) -> AuditStoreError {
    AuditStoreError::Backend(e.to_string())
}

fn decode(row: &SqliteRow) -> Result<AuditEntry, AuditStoreError> {
    let text = |column: &str| row.try_get::<String, _>(column).map_err(backend);

    let details = match row.try_get::<Option<String>, _>("details").map_err(backend)? {
        Some(raw) => serde_json::from_str(&raw).map_err(backend)?,
        None => serde_json::Value::Null,
    };
    let timestamp: DateTime<Utc> = row.try_get("timestamp").map_err(backend)?;

    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(Uuid::parse_str(&text("id")?).map_err(backend)?),
        organization_id: OrganizationId::parse(&text("organization_id")?).map_err(backend)?,
        actor_user_id: UserId::parse(&text("actor_user_id")?).map_err(backend)?,
        action: AuditAction::from_str(&text("action")?).map_err(backend)?,
        resource_type: ResourceType::from_str(&text("resource_type")?).map_err(backend)?,
        resource_id: row.try_get("resource_id").map_err(backend)?,
        details,
        timestamp,
    })
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditStoreError> {
        let details = if entry.details.is_null() {
            None
        } else {
            Some(serde_json::to_string(&entry.details).map_err(backend)?)
        };

        let result = sqlx::query(
            "INSERT INTO audit_entries (id, organization_id, actor_user_id, action, resource_type, resource_id, details, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.as_uuid().to_string())
        .bind(entry.organization_id.to_string())
        .bind(entry.actor_user_id.to_string())
        .bind(entry.action.to_string())
        .bind(entry.resource_type.as_str())
        .bind(entry.resource_id.as_deref())
        .bind(details)
        .bind(entry.timestamp)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(entry),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuditStoreError::Duplicate(entry.id))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn list_for_resource(
        &self,
        organization_id: OrganizationId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, actor_user_id, action, resource_type, resource_id, details, timestamp
             FROM audit_entries
             WHERE organization_id = ? AND resource_type = ? AND resource_id = ?
             ORDER BY seq",
        )
        .bind(organization_id.to_string())
        .bind(resource_type.as_str())
        .bind(resource_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(backend)?;

        rows.iter().map(decode).collect()
    }
}
