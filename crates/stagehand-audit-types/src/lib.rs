//! Audit entry types for Stagehand.

mod action;
mod entry;
mod id;
mod resource;

pub use action::AuditAction;
pub use entry::{AuditEntry, AuditEntryDraft};
pub use id::AuditEntryId;
pub use resource::ResourceType;
