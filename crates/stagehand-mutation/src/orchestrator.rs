//! Authorize, guard, write, audit.

use crate::decision::log_decision;
use crate::error::MutationError;
use crate::outcome::{MutationOutcome, ReadOutcome};
use serde_json::json;
use stagehand_audit::{AuditRecorder, AuditStore};
use stagehand_audit_types::{AuditAction, AuditEntryDraft};
use stagehand_authz::{Authorizer, Permission, PrincipalContext};
use stagehand_common_config::{ConcurrencyMode, StagehandConfig};
use stagehand_common_core::{ProjectId, Version};
use stagehand_common_log::spans;
use stagehand_concurrency::{
    ConflictOutcome, GuardMode, MutationSpec, NewRecord, RecordFilter, RecordStore, Rejection,
    VersionGuard, RESERVED_FIELDS,
};
use stagehand_database::{
    DatabasePool, PoolConfig, PoolError, SqliteAuditStore, SqliteRecordStore,
};
use std::sync::Arc;
use tracing::{debug, error, Instrument};

/// Composes the authorization engine, version guard and audit recorder.
///
/// Holds no mutable state of its own; it can be shared across requests.
pub struct Orchestrator {
    authorizer: Authorizer,
    guard: VersionGuard,
    recorder: AuditRecorder,
    record_access: bool,
}

impl Orchestrator {
    pub fn new(authorizer: Authorizer, guard: VersionGuard, recorder: AuditRecorder) -> Self {
        Self {
            authorizer,
            guard,
            recorder,
            record_access: true,
        }
    }

    /// Build from configuration over the given stores.
    pub fn from_config(
        config: &StagehandConfig,
        records: Arc<dyn RecordStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let authorizer = if config.authz.decision_cache {
            Authorizer::new().with_cache(config.authz.decision_cache_capacity)
        } else {
            Authorizer::new()
        };

        let mode = match config.concurrency.mode {
            ConcurrencyMode::ConditionalWrite => GuardMode::ConditionalWrite,
            ConcurrencyMode::ReadThenWrite => GuardMode::ReadThenWrite,
        };
        let guard = VersionGuard::new(records)
            .with_tolerance(config.concurrency.tolerance())
            .with_mode(mode);

        Self::new(authorizer, guard, AuditRecorder::new(audit))
            .with_record_access(config.audit.record_access)
    }

    /// Open the configured SQLite database and build over it.
    pub async fn connect_sqlite(config: &StagehandConfig) -> Result<Self, PoolError> {
        let db = DatabasePool::connect(PoolConfig::from_settings(&config.database)).await?;
        Ok(Self::from_config(
            config,
            Arc::new(SqliteRecordStore::new(db.clone())),
            Arc::new(SqliteAuditStore::new(db)),
        ))
    }

    /// Whether privileged reads produce `access` audit entries.
    pub fn with_record_access(mut self, enabled: bool) -> Self {
        self.record_access = enabled;
        self
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    pub fn guard(&self) -> &VersionGuard {
        &self.guard
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    fn authorize(
        &self,
        context: &PrincipalContext,
        permission: Permission,
        project: Option<&ProjectId>,
    ) -> bool {
        let span = spans::authorize_span(&context.user_id().to_string(), permission.as_str());
        let _entered = span.enter();

        let decision = self.authorizer.authorize(context, permission, project);
        span.record("decision", if decision.is_allowed() { "allow" } else { "deny" });
        log_decision(context, permission, project, decision);
        decision.is_allowed()
    }

    /// Apply `mutation` to the record selected by `target`, on behalf of
    /// `context`, if `permission` is granted (scoped to `project` when given)
    /// and `claimed_base_version` is still current.
    ///
    /// The target is always narrowed to the caller's organization, and to
    /// `project` when one is given, so roles granted on one project cannot
    /// reach records of another.
    pub async fn perform(
        &self,
        context: &PrincipalContext,
        permission: Permission,
        project: Option<&ProjectId>,
        target: &RecordFilter,
        claimed_base_version: Option<Version>,
        mutation: &MutationSpec,
    ) -> Result<MutationOutcome, MutationError> {
        let op = if mutation.is_delete() { "delete" } else { "update" };
        let span = spans::mutation_span(target.resource_type.as_str(), &target.id.to_string(), op);

        async move {
            if !self.authorize(context, permission, project) {
                spans::record_outcome("forbidden");
                return Ok(MutationOutcome::Forbidden { permission });
            }

            let filter = scope(context, project, target);
            let outcome = self
                .guard
                .guarded_mutate(&filter, claimed_base_version, mutation)
                .await;

            let version = match outcome {
                ConflictOutcome::Applied(version) => version,
                ConflictOutcome::Conflict(current_version) => {
                    spans::record_outcome("conflict");
                    return Ok(MutationOutcome::Conflict { current_version });
                }
                ConflictOutcome::NotFound => {
                    spans::record_outcome("not_found");
                    return Ok(MutationOutcome::NotFound);
                }
                ConflictOutcome::Rejected(Rejection::InvalidPatch(reason)) => {
                    spans::record_outcome("validation_rejected");
                    return Ok(MutationOutcome::ValidationRejected { reason });
                }
                ConflictOutcome::Rejected(Rejection::Store(message)) => {
                    spans::record_outcome("store_failure");
                    return Err(MutationError::StoreFailure { message });
                }
            };

            let (action, details) = match mutation {
                MutationSpec::Update(patch) => (
                    AuditAction::Update,
                    json!({
                        "fields": patch.keys().collect::<Vec<_>>(),
                        "base_version": claimed_base_version,
                        "version": version,
                    }),
                ),
                MutationSpec::Delete => (
                    AuditAction::Delete,
                    json!({
                        "base_version": claimed_base_version,
                        "deleted_at": version,
                    }),
                ),
            };

            let draft = AuditEntryDraft::new(
                context.organization_id(),
                context.user_id(),
                action,
                filter.resource_type,
            )
            .resource_id(filter.id)
            .details(details);

            self.audit(version, draft).await
        }
        .instrument(span)
        .await
    }

    /// Insert `record` on behalf of `context` if `permission` is granted.
    ///
    /// The record is placed in the caller's organization, and in `project`
    /// when one is given. The caller is always recorded as its creator.
    pub async fn create(
        &self,
        context: &PrincipalContext,
        permission: Permission,
        project: Option<&ProjectId>,
        mut record: NewRecord,
    ) -> Result<MutationOutcome, MutationError> {
        let span =
            spans::mutation_span(record.resource_type.as_str(), &record.id.to_string(), "create");

        async move {
            if !self.authorize(context, permission, project) {
                spans::record_outcome("forbidden");
                return Ok(MutationOutcome::Forbidden { permission });
            }

            if let Some(field) = record.fields.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
                spans::record_outcome("validation_rejected");
                return Ok(MutationOutcome::ValidationRejected {
                    reason: format!("record may not set reserved field '{field}'"),
                });
            }

            record.organization_id = context.organization_id();
            if let Some(project_id) = project {
                record.project_id = Some(*project_id);
            }
            record.created_by = Some(context.user_id());

            let stored = match self.guard.store().insert(record).await {
                Ok(stored) => stored,
                Err(err) => {
                    error!(error = %err, "Record insert failed");
                    spans::record_outcome("store_failure");
                    return Err(MutationError::StoreFailure {
                        message: err.to_string(),
                    });
                }
            };

            let draft = AuditEntryDraft::new(
                stored.organization_id,
                context.user_id(),
                AuditAction::Create,
                stored.resource_type,
            )
            .resource_id(stored.id)
            .detail("fields", stored.fields.keys().collect::<Vec<_>>())
            .detail("version", stored.last_modified_at);

            self.audit(stored.last_modified_at, draft).await
        }
        .instrument(span)
        .await
    }

    /// Read the record selected by `target` on behalf of `context` if
    /// `permission` is granted, recording an `access` audit entry when
    /// access auditing is on.
    pub async fn access(
        &self,
        context: &PrincipalContext,
        permission: Permission,
        project: Option<&ProjectId>,
        target: &RecordFilter,
    ) -> Result<ReadOutcome, MutationError> {
        let span = spans::mutation_span(target.resource_type.as_str(), &target.id.to_string(), "access");

        async move {
            if !self.authorize(context, permission, project) {
                spans::record_outcome("forbidden");
                return Ok(ReadOutcome::Forbidden { permission });
            }

            let filter = scope(context, project, target).without_version();
            let record = match self.guard.store().find_one(&filter).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    spans::record_outcome("not_found");
                    return Ok(ReadOutcome::NotFound);
                }
                Err(err) => {
                    error!(error = %err, "Record read failed");
                    spans::record_outcome("store_failure");
                    return Err(MutationError::StoreFailure {
                        message: err.to_string(),
                    });
                }
            };

            if !self.record_access {
                spans::record_outcome("found");
                return Ok(ReadOutcome::Found {
                    record,
                    audit_entry: None,
                });
            }

            let draft = AuditEntryDraft::new(
                context.organization_id(),
                context.user_id(),
                AuditAction::Access,
                record.resource_type,
            )
            .resource_id(record.id)
            .detail("permission", permission.as_str())
            .detail("version", record.last_modified_at);

            let version = record.last_modified_at;
            let span = spans::audit_span("access", record.resource_type.as_str());
            match self.recorder.record(draft).instrument(span).await {
                Ok(entry) => {
                    spans::record_outcome("found");
                    Ok(ReadOutcome::Found {
                        record,
                        audit_entry: Some(entry),
                    })
                }
                Err(err) => {
                    let err = MutationError::audit(version, err);
                    spans::record_error(&err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn audit(
        &self,
        version: Version,
        draft: AuditEntryDraft,
    ) -> Result<MutationOutcome, MutationError> {
        let span = spans::audit_span(&draft.action.to_string(), draft.resource_type.as_str());
        match self.recorder.record(draft).instrument(span).await {
            Ok(audit_entry) => {
                spans::record_outcome("success");
                Ok(MutationOutcome::Success {
                    version,
                    audit_entry,
                })
            }
            Err(err) => {
                let err = MutationError::audit(version, err);
                spans::record_error(&err);
                Err(err)
            }
        }
    }
}

/// `target` confined to the caller's organization and requested project.
fn scope(
    context: &PrincipalContext,
    project: Option<&ProjectId>,
    target: &RecordFilter,
) -> RecordFilter {
    let mut filter = target.clone();
    if filter.organization_id != context.organization_id() {
        debug!(
            requested = %filter.organization_id,
            caller = %context.organization_id(),
            "Narrowing cross-organization target to caller's organization"
        );
        filter.organization_id = context.organization_id();
    }
    if let Some(project_id) = project {
        filter.project_id = Some(*project_id);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_audit::MemoryAuditStore;
    use stagehand_authz::Role;
    use stagehand_common_core::OrganizationId;
    use stagehand_concurrency::MemoryRecordStore;
    use stagehand_test_utils::org_member;

    #[test]
    fn test_scope_overrides_foreign_org_and_pins_project() {
        let org = OrganizationId::new();
        let project = ProjectId::new();
        let context = org_member(org, Role::Manager);
        let other = ProjectId::new();
        let target = RecordFilter::new(
            stagehand_audit_types::ResourceType::Task,
            stagehand_common_core::RecordId::new(),
            OrganizationId::new(),
        )
        .in_project(other);

        let scoped = scope(&context, Some(&project), &target);
        assert_eq!(scoped.organization_id, org);
        assert_eq!(scoped.project_id, Some(project));

        let unscoped = scope(&context, None, &target);
        assert_eq!(unscoped.project_id, Some(other));
    }

    #[test]
    fn test_from_config_maps_settings() {
        let mut config = StagehandConfig::default();
        config.concurrency.mode = ConcurrencyMode::ReadThenWrite;
        config.concurrency.tolerance_ms = 250;
        config.authz.decision_cache = false;
        config.audit.record_access = false;

        let orchestrator = Orchestrator::from_config(
            &config,
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryAuditStore::new()),
        );

        assert_eq!(orchestrator.guard().mode(), GuardMode::ReadThenWrite);
        assert_eq!(orchestrator.guard().tolerance().as_millis(), 250);
        assert!(orchestrator.authorizer().cache_stats().is_none());
        assert!(!orchestrator.record_access);
    }
}
