//! Versioned records and the mutations applied to them.

use crate::filter::RecordFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stagehand_audit_types::ResourceType;
use stagehand_common_core::{OrganizationId, ProjectId, RecordId, UserId, Version};
use thiserror::Error;

/// Field names a patch may not touch; they are owned by the store.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "organization_id",
    "last_modified_at",
    "project_id",
    "created_by",
];

/// A persisted entity participating in concurrency control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub resource_type: ResourceType,
    pub project_id: Option<ProjectId>,
    pub created_by: Option<UserId>,
    pub fields: Map<String, Value>,
    /// Set by the store on every accepted write; never by callers.
    pub last_modified_at: Version,
}

impl Record {
    /// Whether `filter` selects this record.
    pub fn matches(&self, filter: &RecordFilter) -> bool {
        self.id == filter.id
            && self.organization_id == filter.organization_id
            && self.resource_type == filter.resource_type
            && filter.project_id.map_or(true, |p| self.project_id == Some(p))
            && filter.created_by.map_or(true, |u| self.created_by == Some(u))
            && filter
                .version
                .map_or(true, |v| v.holds_for(&self.last_modified_at))
    }

    /// A filter selecting exactly this record.
    pub fn filter(&self) -> RecordFilter {
        RecordFilter::new(self.resource_type, self.id, self.organization_id)
    }
}

/// A record to be inserted; the store assigns its version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub resource_type: ResourceType,
    pub project_id: Option<ProjectId>,
    pub created_by: Option<UserId>,
    pub fields: Map<String, Value>,
}

impl NewRecord {
    pub fn new(resource_type: ResourceType, organization_id: OrganizationId) -> Self {
        Self {
            id: RecordId::new(),
            organization_id,
            resource_type,
            project_id: None,
            created_by: None,
            fields: Map::new(),
        }
    }

    pub fn in_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Stamp the draft as a stored record.
    pub fn into_record(self, version: Version) -> Record {
        Record {
            id: self.id,
            organization_id: self.organization_id,
            resource_type: self.resource_type,
            project_id: self.project_id,
            created_by: self.created_by,
            fields: self.fields,
            last_modified_at: version,
        }
    }
}

/// A patch was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch is empty")]
    Empty,

    #[error("patch may not set reserved field '{0}'")]
    ReservedField(String),

    #[error("patch must be a JSON object")]
    NotAnObject,
}

/// New field values for an update, applied as a JSON merge patch (RFC 7396).
///
/// Objects merge recursively and a `null` value removes the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, PatchError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(PatchError::NotAnObject),
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Check the patch can be applied.
    pub fn validate(&self) -> Result<(), PatchError> {
        if self.0.is_empty() {
            return Err(PatchError::Empty);
        }
        if let Some(key) = self.0.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
            return Err(PatchError::ReservedField(key.clone()));
        }
        Ok(())
    }

    /// Merge into `fields`.
    pub fn apply_to(&self, fields: &mut Map<String, Value>) {
        merge_object(fields, &self.0);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn merge_object(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(nested) => {
                let slot = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(inner) = slot {
                    merge_object(inner, nested);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

/// The write a guarded mutation performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "patch", rename_all = "snake_case")]
pub enum MutationSpec {
    Update(Patch),
    Delete,
}

impl MutationSpec {
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }
}
