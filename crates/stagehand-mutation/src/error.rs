//! Infrastructure failures.

use http::StatusCode;
use stagehand_audit::AuditError;
use stagehand_audit_types::AuditEntry;
use stagehand_common_core::Version;
use thiserror::Error;

/// A failure the caller cannot branch on as a business outcome.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The record store failed; its message is preserved.
    #[error("store failure: {message}")]
    StoreFailure { message: String },

    /// The mutation was applied but its audit entry could not be written.
    ///
    /// The mutation is not rolled back. This is a compliance gap and has
    /// already been logged at error level with `alert = true`.
    #[error("audit failure after mutation applied at {applied_version}: {message}")]
    AuditFailure {
        applied_version: Version,
        /// The entry that was not persisted.
        entry: Box<AuditEntry>,
        message: String,
    },
}

impl MutationError {
    pub(crate) fn audit(applied_version: Version, err: AuditError) -> Self {
        Self::AuditFailure {
            applied_version,
            message: err.source.to_string(),
            entry: err.entry,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StoreFailure { .. } => "store_failure",
            Self::AuditFailure { .. } => "audit_failure",
        }
    }

    /// Whether the underlying write took effect despite the error.
    pub fn mutation_applied(&self) -> bool {
        matches!(self, Self::AuditFailure { .. })
    }
}
