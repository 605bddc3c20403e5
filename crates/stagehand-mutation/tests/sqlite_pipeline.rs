//! The pipeline over SQLite, configured the way a deployment would be.

use serde_json::json;
use stagehand_audit::{AuditAction, AuditStore, ResourceType};
use stagehand_authz::{Permission, Role};
use stagehand_common_config::{ConcurrencyMode, ConfigLoader, StagehandConfig};
use stagehand_common_core::{OrganizationId, ProjectId};
use stagehand_concurrency::{MutationSpec, NewRecord, Patch};
use stagehand_mutation::{MutationOutcome, Orchestrator, ReadOutcome};
use stagehand_test_utils::{assert_ok, org_member, temp_dir};

fn file_config(dir: &std::path::Path, mode: ConcurrencyMode) -> StagehandConfig {
    let mut config = StagehandConfig::default();
    config.concurrency.mode = mode;
    config.database.path = dir.join("stagehand.db").to_string_lossy().into_owned();
    config
}

#[tokio::test]
async fn create_update_conflict_and_audit_trail() {
    for mode in [ConcurrencyMode::ConditionalWrite, ConcurrencyMode::ReadThenWrite] {
        let dir = temp_dir();
        let orchestrator = assert_ok!(Orchestrator::connect_sqlite(&file_config(dir.path(), mode)).await);

        let org = OrganizationId::new();
        let project = ProjectId::new();
        let manager = org_member(org, Role::Manager);

        let created = assert_ok!(
            orchestrator
                .create(
                    &manager,
                    Permission::BudgetWrite,
                    Some(&project),
                    NewRecord::new(ResourceType::Budget, org).field("amount", json!(40_000)),
                )
                .await
        );
        let MutationOutcome::Success { audit_entry: created_entry, .. } = created else {
            panic!("create should succeed, got {created:?}");
        };
        let record_id = created_entry.resource_id.clone().unwrap();

        let ReadOutcome::Found { record, .. } = assert_ok!(
            orchestrator
                .access(&manager, Permission::BudgetRead, Some(&project), &stagehand_concurrency::RecordFilter::new(
                    ResourceType::Budget,
                    record_id.parse().unwrap(),
                    org,
                ))
                .await
        ) else {
            panic!("record should be readable");
        };

        // Wait out the tolerance window so a stale claim is detectable.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let t0 = record.last_modified_at;

        let first = assert_ok!(
            orchestrator
                .perform(&manager, Permission::BudgetWrite, Some(&project), &record.filter(), Some(t0),
                    &MutationSpec::Update(Patch::new().set("amount", json!(42_500))))
                .await
        );
        let MutationOutcome::Success { version: t1, .. } = first else {
            panic!("first update should succeed, got {first:?}");
        };

        let second = assert_ok!(
            orchestrator
                .perform(&manager, Permission::BudgetWrite, Some(&project), &record.filter(), Some(t0),
                    &MutationSpec::Update(Patch::new().set("amount", json!(1))))
                .await
        );
        assert_eq!(second, MutationOutcome::Conflict { current_version: t1 }, "mode {mode:?}");

        let trail = assert_ok!(
            orchestrator
                .recorder()
                .store()
                .list_for_resource(org, ResourceType::Budget, &record_id)
                .await
        );
        let actions: Vec<_> = trail.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Create, AuditAction::Access, AuditAction::Update],
            "mode {mode:?}"
        );
    }
}

#[tokio::test]
async fn loads_database_settings_from_config_file() {
    let dir = temp_dir();
    let loader = ConfigLoader::new(dir.path());
    let config = file_config(dir.path(), ConcurrencyMode::ConditionalWrite);
    assert_ok!(loader.save(&config));

    let loaded = assert_ok!(loader.load());
    let orchestrator = assert_ok!(Orchestrator::connect_sqlite(&loaded).await);

    assert!(orchestrator.authorizer().cache_stats().is_some());
    assert!(dir.path().join("stagehand.db").exists());
}
