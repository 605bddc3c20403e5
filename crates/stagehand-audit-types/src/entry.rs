//! Audit entries.

use crate::{AuditAction, AuditEntryId, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagehand_common_core::{OrganizationId, UserId};
use tracing::warn;

/// An audit entry that has not been persisted yet.
///
/// Drafts carry everything except identity and time, which are assigned
/// when the entry is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntryDraft {
    pub organization_id: OrganizationId,
    pub actor_user_id: UserId,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    /// Opaque structured payload.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl AuditEntryDraft {
    /// Create a draft without a resource id or details.
    pub fn new(
        organization_id: OrganizationId,
        actor_user_id: UserId,
        action: AuditAction,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            organization_id,
            actor_user_id,
            action,
            resource_type,
            resource_id: None,
            details: serde_json::Value::Null,
        }
    }

    /// Set the resource id.
    pub fn resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    /// Replace the details payload.
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Add one key to the details payload, turning it into an object if needed.
    ///
    /// A value that cannot be serialized is left out and logged.
    pub fn detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(err) => {
                warn!(
                    detail = %key,
                    action = %self.action,
                    resource_type = %self.resource_type,
                    error = %err,
                    "Dropping unserializable audit detail"
                );
                return self;
            }
        };
        if !self.details.is_object() {
            self.details = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.details.as_object_mut() {
            map.insert(key, json);
        }
        self
    }

    /// Seal the draft into an entry recorded at `timestamp`.
    pub fn seal(self, timestamp: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::new(),
            organization_id: self.organization_id,
            actor_user_id: self.actor_user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            timestamp,
        }
    }
}

/// An immutable, persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub organization_id: OrganizationId,
    pub actor_user_id: UserId,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Whether the entry refers to the given resource.
    pub fn is_for(&self, resource_type: ResourceType, resource_id: &str) -> bool {
        self.resource_type == resource_type && self.resource_id.as_deref() == Some(resource_id)
    }
}
