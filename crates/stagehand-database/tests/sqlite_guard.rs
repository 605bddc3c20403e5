//! Version guard behaviour on top of SQLite.

use serde_json::json;
use stagehand_audit_types::ResourceType;
use stagehand_common_core::{OrganizationId, ProjectId, Version};
use stagehand_concurrency::{
    ConflictOutcome, GuardMode, MutationSpec, NewRecord, Patch, Record, RecordStore, VersionGuard,
};
use stagehand_database::{DatabasePool, SqliteRecordStore};
use std::sync::Arc;
use std::time::Duration;

async fn seeded(age: Duration) -> (Arc<SqliteRecordStore>, Record) {
    let store = Arc::new(SqliteRecordStore::new(DatabasePool::in_memory().await.unwrap()));
    let t0 = Version::from_millis(Version::now().as_millis() - age.as_millis() as i64).unwrap();
    let record = NewRecord::new(ResourceType::Budget, OrganizationId::new())
        .in_project(ProjectId::new())
        .field("amount", json!(12_000))
        .into_record(t0);
    store.put(&record).await.unwrap();
    (store, record)
}

fn set_amount(amount: i64) -> MutationSpec {
    MutationSpec::Update(Patch::new().set("amount", json!(amount)))
}

#[tokio::test]
async fn stale_writer_conflicts_in_both_modes() {
    for mode in [GuardMode::ConditionalWrite, GuardMode::ReadThenWrite] {
        let (store, record) = seeded(Duration::from_secs(120)).await;
        let t0 = record.last_modified_at;
        let guard = VersionGuard::new(store.clone()).with_mode(mode);

        let ConflictOutcome::Applied(t1) = guard
            .guarded_mutate(&record.filter(), Some(t0), &set_amount(15_000))
            .await
        else {
            panic!("first writer should apply");
        };

        let second = guard
            .guarded_mutate(&record.filter(), Some(t0), &set_amount(9_000))
            .await;
        assert_eq!(second, ConflictOutcome::Conflict(t1), "mode {mode:?}");

        let stored = store.find_one(&record.filter()).await.unwrap().unwrap();
        assert_eq!(stored.fields["amount"], json!(15_000));
    }
}

#[tokio::test]
async fn claim_within_tolerance_applies() {
    let (store, record) = seeded(Duration::from_secs(120)).await;
    let guard = VersionGuard::new(store);
    let claimed = Version::from_millis(record.last_modified_at.as_millis() - 900).unwrap();

    let outcome = guard
        .guarded_mutate(&record.filter(), Some(claimed), &set_amount(1))
        .await;
    assert!(outcome.is_applied());
}

#[tokio::test]
async fn wrong_scope_is_not_found_not_conflict() {
    let (store, record) = seeded(Duration::from_secs(120)).await;
    let guard = VersionGuard::new(store);
    let stale = Version::from_millis(record.last_modified_at.as_millis() - 50_000).unwrap();

    let foreign = record.filter().in_project(ProjectId::new());
    let outcome = guard.guarded_mutate(&foreign, Some(stale), &MutationSpec::Delete).await;
    assert_eq!(outcome, ConflictOutcome::NotFound);
}

#[tokio::test]
async fn guarded_delete_removes_row() {
    let (store, record) = seeded(Duration::from_secs(120)).await;
    let guard = VersionGuard::new(store.clone());

    let outcome = guard
        .guarded_mutate(&record.filter(), Some(record.last_modified_at), &MutationSpec::Delete)
        .await;

    assert!(outcome.is_applied());
    assert_eq!(store.find_one(&record.filter()).await.unwrap(), None);
}
