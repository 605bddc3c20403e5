//! In-memory audit store.

use crate::store::{AuditStore, AuditStoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use stagehand_audit_types::{AuditEntry, ResourceType};
use stagehand_common_core::OrganizationId;

/// Audit store backed by a vector, for tests and single-process tools.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry, in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditStoreError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(AuditStoreError::Duplicate(entry.id));
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn list_for_resource(
        &self,
        organization_id: OrganizationId,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.organization_id == organization_id && e.is_for(resource_type, resource_id))
            .cloned()
            .collect())
    }
}
