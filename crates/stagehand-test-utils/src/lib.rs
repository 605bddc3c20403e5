//! Test utilities for Stagehand crates.

use async_trait::async_trait;
use serde_json::json;
use stagehand_audit::{AuditStore, AuditStoreError};
use stagehand_audit_types::{AuditEntry, ResourceType};
use stagehand_authz::{PrincipalContext, Role};
use stagehand_common_core::{OrganizationId, ProjectId, UserId, Version};
use stagehand_concurrency::{NewRecord, Patch, Record, RecordFilter, RecordStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A version `age` in the past, far enough to fall outside any tolerance
/// the tests use.
pub fn aged_version(age: Duration) -> Version {
    Version::from_millis(Version::now().as_millis() - age.as_millis() as i64)
        .expect("version in range")
}

/// A user in one organization holding a single organization-wide role.
pub fn org_member(organization_id: OrganizationId, role: Role) -> PrincipalContext {
    PrincipalContext::builder(UserId::new(), organization_id)
        .global_role(role)
        .build()
}

/// A user whose only role is `role` on `project_id`.
pub fn project_member(
    organization_id: OrganizationId,
    project_id: ProjectId,
    role: Role,
) -> PrincipalContext {
    PrincipalContext::builder(UserId::new(), organization_id)
        .project_role(project_id, role)
        .build()
}

/// A project schedule record last modified `age` ago.
pub fn schedule_record(organization_id: OrganizationId, project_id: ProjectId, age: Duration) -> Record {
    NewRecord::new(ResourceType::Schedule, organization_id)
        .in_project(project_id)
        .field("start", json!("2026-03-02"))
        .field("crew", json!("framing"))
        .into_record(aged_version(age))
}

/// Record store whose every call fails with a backend error.
#[derive(Debug)]
pub struct FailingRecordStore {
    message: String,
    calls: AtomicUsize,
}

impl FailingRecordStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend(self.message.clone()))
    }
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn insert(&self, _record: NewRecord) -> Result<Record, StoreError> {
        self.fail()
    }

    async fn find_one(&self, _filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        self.fail()
    }

    async fn update_where(
        &self,
        _filter: &RecordFilter,
        _patch: &Patch,
    ) -> Result<Option<Record>, StoreError> {
        self.fail()
    }

    async fn delete_where(&self, _filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        self.fail()
    }
}

/// Audit store that refuses every append and counts attempts.
#[derive(Debug)]
pub struct FailingAuditStore {
    message: String,
    attempts: AtomicUsize,
}

impl FailingAuditStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _entry: AuditEntry) -> Result<AuditEntry, AuditStoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditStoreError::Backend(self.message.clone()))
    }

    async fn list_for_resource(
        &self,
        _organization_id: OrganizationId,
        _resource_type: ResourceType,
        _resource_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        Ok(Vec::new())
    }
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
