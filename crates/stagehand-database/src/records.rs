//! SQLite record store.
//!
//! Every operation is a single statement whose WHERE clause carries the whole
//! [`RecordFilter`], so a conditional update or delete either matches and
//! writes or changes nothing. Versions are stored as epoch milliseconds.

use crate::pool::DatabasePool;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteRow, Sqlite};
use sqlx::{QueryBuilder, Row};
use stagehand_audit_types::ResourceType;
use stagehand_common_core::{OrganizationId, ProjectId, RecordId, UserId, Version};
use stagehand_concurrency::{NewRecord, Patch, Record, RecordFilter, RecordStore, StoreError};
use std::str::FromStr;

const COLUMNS: &str =
    "id, organization_id, resource_type, project_id, created_by, fields, last_modified_at";

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db: DatabasePool,
}

impl SqliteRecordStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    /// Store a record exactly as given, version included.
    pub async fn put(&self, record: &Record) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO records (id, organization_id, resource_type, project_id, created_by, fields, last_modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.organization_id.to_string())
        .bind(record.resource_type.as_str())
        .bind(record.project_id.map(|p| p.to_string()))
        .bind(record.created_by.map(|u| u.to_string()))
        .bind(encode_fields(&record.fields)?)
        .bind(record.last_modified_at.as_millis())
        .execute(self.db.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn corrupt(column: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{column}: {e}"))
}

fn encode_fields(fields: &Map<String, Value>) -> Result<String, StoreError> {
    serde_json::to_string(fields).map_err(|e| corrupt("fields", e))
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter) {
    query
        .push(" WHERE id = ")
        .push_bind(filter.id.to_string())
        .push(" AND organization_id = ")
        .push_bind(filter.organization_id.to_string())
        .push(" AND resource_type = ")
        .push_bind(filter.resource_type.as_str());

    if let Some(project_id) = filter.project_id {
        query.push(" AND project_id = ").push_bind(project_id.to_string());
    }
    if let Some(created_by) = filter.created_by {
        query.push(" AND created_by = ").push_bind(created_by.to_string());
    }
    if let Some(predicate) = filter.version {
        query
            .push(" AND ABS(last_modified_at - ")
            .push_bind(predicate.claimed.as_millis())
            .push(") <= ")
            .push_bind(i64::try_from(predicate.tolerance.as_millis()).unwrap_or(i64::MAX));
    }
}

fn decode(row: &SqliteRow) -> Result<Record, StoreError> {
    let text = |column: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(column).map_err(|e| corrupt(column, e))
    };
    let optional = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get::<Option<String>, _>(column).map_err(|e| corrupt(column, e))
    };

    let fields: Map<String, Value> =
        serde_json::from_str(&text("fields")?).map_err(|e| corrupt("fields", e))?;
    let millis: i64 = row
        .try_get("last_modified_at")
        .map_err(|e| corrupt("last_modified_at", e))?;

    Ok(Record {
        id: RecordId::parse(&text("id")?).map_err(|e| corrupt("id", e))?,
        organization_id: OrganizationId::parse(&text("organization_id")?)
            .map_err(|e| corrupt("organization_id", e))?,
        resource_type: ResourceType::from_str(&text("resource_type")?)
            .map_err(|e| corrupt("resource_type", e))?,
        project_id: optional("project_id")?
            .map(|s| ProjectId::parse(&s))
            .transpose()
            .map_err(|e| corrupt("project_id", e))?,
        created_by: optional("created_by")?
            .map(|s| UserId::parse(&s))
            .transpose()
            .map_err(|e| corrupt("created_by", e))?,
        fields,
        last_modified_at: Version::from_millis(millis)
            .ok_or_else(|| corrupt("last_modified_at", millis))?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError> {
        let id = record.id;
        let stored = record.into_record(Version::now());

        let result = sqlx::query(
            "INSERT INTO records (id, organization_id, resource_type, project_id, created_by, fields, last_modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.organization_id.to_string())
        .bind(stored.resource_type.as_str())
        .bind(stored.project_id.map(|p| p.to_string()))
        .bind(stored.created_by.map(|u| u.to_string()))
        .bind(encode_fields(&stored.fields)?)
        .bind(stored.last_modified_at.as_millis())
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(stored),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate(id)),
            Err(e) => Err(backend(e)),
        }
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM records"));
        push_filter(&mut query, filter);

        let row = query
            .build()
            .fetch_optional(self.db.pool())
            .await
            .map_err(backend)?;
        row.as_ref().map(decode).transpose()
    }

    async fn update_where(
        &self,
        filter: &RecordFilter,
        patch: &Patch,
    ) -> Result<Option<Record>, StoreError> {
        let patch_json = serde_json::to_string(patch.as_map()).map_err(|e| corrupt("patch", e))?;

        let mut query = QueryBuilder::new("UPDATE records SET fields = json_patch(fields, ");
        query
            .push_bind(patch_json)
            .push("), last_modified_at = MAX(")
            .push_bind(Version::now().as_millis())
            .push(", last_modified_at + 1)");
        push_filter(&mut query, filter);
        query.push(format!(" RETURNING {COLUMNS}"));

        let row = query
            .build()
            .fetch_optional(self.db.pool())
            .await
            .map_err(backend)?;
        row.as_ref().map(decode).transpose()
    }

    async fn delete_where(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        let mut query = QueryBuilder::new("DELETE FROM records");
        push_filter(&mut query, filter);
        query.push(format!(" RETURNING {COLUMNS}"));

        let row = query
            .build()
            .fetch_optional(self.db.pool())
            .await
            .map_err(backend)?;
        row.as_ref().map(decode).transpose()
    }
}
