//! Audit recording for Stagehand.
//!
//! The [`AuditRecorder`] seals drafts into immutable [`AuditEntry`] values
//! and appends them to an [`AuditStore`]. Appends are never retried and
//! never dropped: a failed append is returned to the caller and logged at
//! error level with `alert = true`.

mod memory;
mod recorder;
mod store;

pub use memory::MemoryAuditStore;
pub use recorder::{AuditError, AuditRecorder};
pub use store::{AuditStore, AuditStoreError};

// Re-export types for convenience
pub use stagehand_audit_types::{
    AuditAction, AuditEntry, AuditEntryDraft, AuditEntryId, ResourceType,
};
