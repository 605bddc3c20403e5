//! Record filters.

use serde::{Deserialize, Serialize};
use stagehand_audit_types::ResourceType;
use stagehand_common_core::{OrganizationId, ProjectId, RecordId, UserId, Version};
use std::time::Duration;

/// "The stored version must match this claim."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPredicate {
    pub claimed: Version,
    pub tolerance: Duration,
}

impl VersionPredicate {
    pub fn new(claimed: Version, tolerance: Duration) -> Self {
        Self { claimed, tolerance }
    }

    pub fn holds_for(&self, current: &Version) -> bool {
        self.claimed.matches(current, self.tolerance)
    }
}

/// Identifies exactly one record within one organization.
///
/// Identity and tenant are mandatory, so a filter can never match across
/// organizations. The optional fields narrow further and are all equality
/// checks applied in the same statement as the read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub resource_type: ResourceType,
    pub id: RecordId,
    pub organization_id: OrganizationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionPredicate>,
}

impl RecordFilter {
    pub fn new(resource_type: ResourceType, id: RecordId, organization_id: OrganizationId) -> Self {
        Self {
            resource_type,
            id,
            organization_id,
            project_id: None,
            created_by: None,
            version: None,
        }
    }

    /// Only match records belonging to `project_id`.
    pub fn in_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Only match records created by `user_id`.
    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Only match records whose version satisfies `predicate`.
    pub fn with_version(mut self, predicate: VersionPredicate) -> Self {
        self.version = Some(predicate);
        self
    }

    /// The same filter without a version predicate.
    pub fn without_version(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }
}
