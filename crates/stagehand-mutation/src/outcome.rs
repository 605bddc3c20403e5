//! Business outcomes of orchestrated operations.

use http::StatusCode;
use serde::Serialize;
use stagehand_audit_types::AuditEntry;
use stagehand_authz::Permission;
use stagehand_common_core::Version;
use stagehand_concurrency::Record;

/// Result of [`Orchestrator::perform`](crate::Orchestrator::perform) and
/// [`Orchestrator::create`](crate::Orchestrator::create).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The write happened and was audited.
    Success {
        version: Version,
        audit_entry: AuditEntry,
    },
    /// The principal lacks the permission. Nothing was read or written.
    Forbidden { permission: Permission },
    /// No record matched under the caller's tenant and scope.
    NotFound,
    /// Someone else changed the record since the caller's base version.
    Conflict { current_version: Version },
    /// The mutation payload was malformed.
    ValidationRejected { reason: String },
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success { .. } => StatusCode::OK,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::Forbidden { .. } => Some("forbidden"),
            Self::NotFound => Some("not_found"),
            Self::Conflict { .. } => Some("conflict"),
            Self::ValidationRejected { .. } => Some("validation_rejected"),
        }
    }
}

/// Result of [`Orchestrator::access`](crate::Orchestrator::access).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReadOutcome {
    /// The record, and the `access` entry when access auditing is on.
    Found {
        record: Record,
        audit_entry: Option<AuditEntry>,
    },
    Forbidden { permission: Permission },
    NotFound,
}

impl ReadOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Found { .. } => StatusCode::OK,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let conflict = MutationOutcome::Conflict {
            current_version: Version::now(),
        };
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(conflict.error_code(), Some("conflict"));

        let forbidden = MutationOutcome::Forbidden {
            permission: Permission::ProjectsWrite,
        };
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(MutationOutcome::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            MutationOutcome::ValidationRejected { reason: "x".into() }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ReadOutcome::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_serializes_current_version() {
        let version = Version::from_millis(1_700_000_000_000).unwrap();
        let json = serde_json::to_value(MutationOutcome::Conflict {
            current_version: version,
        })
        .unwrap();

        assert_eq!(json["result"], "conflict");
        assert_eq!(json["current_version"], serde_json::to_value(version).unwrap());
    }

    #[test]
    fn test_forbidden_serializes_permission_string() {
        let json = serde_json::to_value(MutationOutcome::Forbidden {
            permission: Permission::BudgetWrite,
        })
        .unwrap();
        assert_eq!(json["permission"], "projects:budget:write");
    }
}
