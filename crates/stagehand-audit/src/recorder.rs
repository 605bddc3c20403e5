//! The audit recorder.

use crate::store::{AuditStore, AuditStoreError};
use chrono::Utc;
use stagehand_audit_types::{AuditEntry, AuditEntryDraft};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// An audit entry could not be persisted.
#[derive(Debug, Error)]
#[error("failed to append audit entry {}: {source}", .entry.id)]
pub struct AuditError {
    /// The entry that was lost.
    pub entry: Box<AuditEntry>,
    #[source]
    pub source: AuditStoreError,
}

/// Records privileged actions into an append-only store.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Seal `draft` with the current time and append it.
    ///
    /// Called after the action it describes has completed, so the entry's
    /// timestamp is never earlier than the action. There is no retry.
    pub async fn record(&self, draft: AuditEntryDraft) -> Result<AuditEntry, AuditError> {
        let entry = draft.seal(Utc::now());

        match self.store.append(entry.clone()).await {
            Ok(stored) => {
                debug!(
                    audit_id = %stored.id,
                    action = %stored.action,
                    resource_type = %stored.resource_type,
                    resource_id = ?stored.resource_id,
                    "Audit entry recorded"
                );
                Ok(stored)
            }
            Err(source) => {
                error!(
                    alert = true,
                    audit_id = %entry.id,
                    organization_id = %entry.organization_id,
                    actor_user_id = %entry.actor_user_id,
                    action = %entry.action,
                    resource_type = %entry.resource_type,
                    resource_id = ?entry.resource_id,
                    error = %source,
                    "Audit append failed"
                );
                Err(AuditError {
                    entry: Box::new(entry),
                    source,
                })
            }
        }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }
}
