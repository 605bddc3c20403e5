//! Lost-update scenarios against the in-memory store.

use serde_json::json;
use stagehand_audit_types::ResourceType;
use stagehand_common_core::{OrganizationId, Version};
use stagehand_concurrency::{
    ConflictOutcome, GuardMode, MemoryRecordStore, MutationSpec, NewRecord, Patch, Record,
    VersionGuard,
};
use std::sync::Arc;
use std::time::Duration;

fn seed(store: &MemoryRecordStore, age: Duration) -> Record {
    let t0 = Version::from_millis(Version::now().as_millis() - age.as_millis() as i64).unwrap();
    let record = NewRecord::new(ResourceType::Schedule, OrganizationId::new())
        .field("start", json!("2026-01-05"))
        .into_record(t0);
    store.put(record.clone());
    record
}

fn set_start(day: &str) -> MutationSpec {
    MutationSpec::Update(Patch::new().set("start", json!(day)))
}

#[tokio::test]
async fn second_writer_with_same_base_conflicts() {
    for mode in [GuardMode::ConditionalWrite, GuardMode::ReadThenWrite] {
        let store = Arc::new(MemoryRecordStore::new());
        let record = seed(&store, Duration::from_secs(60));
        let t0 = record.last_modified_at;
        let guard = VersionGuard::new(store.clone()).with_mode(mode);

        let a = guard
            .guarded_mutate(&record.filter(), Some(t0), &set_start("2026-01-06"))
            .await;
        let ConflictOutcome::Applied(t1) = a else {
            panic!("caller A should apply, got {:?}", a);
        };
        assert!(t1 > t0);

        let b = guard
            .guarded_mutate(&record.filter(), Some(t0), &set_start("2026-01-09"))
            .await;
        assert_eq!(b, ConflictOutcome::Conflict(t1));

        let stored = store.get(&record.id).unwrap();
        assert_eq!(stored.fields["start"], json!("2026-01-06"));
        assert_eq!(stored.last_modified_at, t1);
    }
}

#[tokio::test]
async fn retry_with_refreshed_version_applies() {
    let store = Arc::new(MemoryRecordStore::new());
    let record = seed(&store, Duration::from_secs(60));
    let guard = VersionGuard::new(store.clone());

    let ConflictOutcome::Applied(t1) = guard
        .guarded_mutate(&record.filter(), Some(record.last_modified_at), &set_start("a"))
        .await
    else {
        panic!("first write should apply");
    };

    let retry = guard
        .guarded_mutate(&record.filter(), Some(t1), &set_start("b"))
        .await;
    assert!(retry.is_applied());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn conditional_write_admits_one_racer_per_version() {
    let store = Arc::new(MemoryRecordStore::new());
    let record = seed(&store, Duration::from_secs(60));
    let guard = VersionGuard::new(store.clone()).with_tolerance(Duration::ZERO);

    let mut handles = Vec::new();
    for i in 0..16 {
        let guard = guard.clone();
        let filter = record.filter();
        let base = record.last_modified_at;
        handles.push(tokio::spawn(async move {
            guard
                .guarded_mutate(&filter, Some(base), &set_start(&format!("racer-{}", i)))
                .await
        }));
    }

    let mut applied = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ConflictOutcome::Applied(_) => applied += 1,
            ConflictOutcome::Conflict(_) => conflicts += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(conflicts, 15);
}
