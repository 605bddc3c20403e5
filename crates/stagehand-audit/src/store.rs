//! The append-only audit log collaborator.

use async_trait::async_trait;
use stagehand_audit_types::{AuditEntry, AuditEntryId, ResourceType};
use stagehand_common_core::OrganizationId;
use thiserror::Error;

/// Errors raised by an audit store.
#[derive(Debug, Error)]
pub enum AuditStoreError {
    #[error("audit entry {0} already exists")]
    Duplicate(AuditEntryId),

    #[error("audit backend error: {0}")]
    Backend(String),
}

/// Append-only storage for audit entries.
///
/// Implementations must never update or delete an entry once appended.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry and return it as stored.
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditStoreError>;

    /// Entries about one resource within an organization, oldest first.
    async fn list_for_resource(
        &self,
        organization_id: OrganizationId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError>;
}
