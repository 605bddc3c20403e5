//! In-memory record store.

use crate::filter::RecordFilter;
use crate::record::{NewRecord, Patch, Record};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use stagehand_common_core::{RecordId, Version};
use std::collections::HashMap;

/// Record store backed by a map under a single lock.
///
/// Holding the lock across match-and-write gives every operation the same
/// atomicity a conditional SQL statement has.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RecordId, Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a record, bypassing tenant scoping.
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.lock().get(id).cloned()
    }

    /// Store a record exactly as given, version included.
    pub fn put(&self, record: Record) {
        self.records.lock().insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError> {
        let mut records = self.records.lock();
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        let stored = record.into_record(Version::now());
        records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        Ok(self
            .records
            .lock()
            .get(&filter.id)
            .filter(|r| r.matches(filter))
            .cloned())
    }

    async fn update_where(
        &self,
        filter: &RecordFilter,
        patch: &Patch,
    ) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.lock();
        match records.get_mut(&filter.id) {
            Some(record) if record.matches(filter) => {
                patch.apply_to(&mut record.fields);
                record.last_modified_at = Version::next_after(&record.last_modified_at);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_where(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.lock();
        let matched = records
            .get(&filter.id)
            .is_some_and(|record| record.matches(filter));
        Ok(if matched { records.remove(&filter.id) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::VersionPredicate;
    use serde_json::json;
    use stagehand_audit_types::ResourceType;
    use stagehand_common_core::OrganizationId;
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemoryRecordStore::new();
        let record = store
            .insert(NewRecord::new(ResourceType::Task, OrganizationId::new()).field("title", json!("a")))
            .await
            .unwrap();

        let found = store.find_one(&record.filter()).await.unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_duplicate_insert_fails() {
        let store = MemoryRecordStore::new();
        let draft = NewRecord::new(ResourceType::Task, OrganizationId::new());
        store.insert(draft.clone()).await.unwrap();
        assert!(matches!(
            store.insert(draft).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_conditional_update_with_stale_version_touches_nothing() {
        let store = MemoryRecordStore::new();
        let record = store
            .insert(NewRecord::new(ResourceType::Task, OrganizationId::new()))
            .await
            .unwrap();

        let stale = Version::from_millis(record.last_modified_at.as_millis() - 5_000).unwrap();
        let filter = record
            .filter()
            .with_version(VersionPredicate::new(stale, Duration::from_millis(1000)));

        let updated = store
            .update_where(&filter, &Patch::new().set("title", json!("b")))
            .await
            .unwrap();

        assert!(updated.is_none());
        assert_eq!(store.get(&record.id), Some(record));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryRecordStore::new();
        let record = store
            .insert(NewRecord::new(ResourceType::Task, OrganizationId::new()))
            .await
            .unwrap();

        let updated = store
            .update_where(&record.filter(), &Patch::new().set("title", json!("b")))
            .await
            .unwrap()
            .unwrap();

        assert!(updated.last_modified_at > record.last_modified_at);
        assert_eq!(updated.fields["title"], json!("b"));
    }

    #[tokio::test]
    async fn test_delete_respects_tenant() {
        let store = MemoryRecordStore::new();
        let record = store
            .insert(NewRecord::new(ResourceType::File, OrganizationId::new()))
            .await
            .unwrap();

        let foreign = RecordFilter::new(ResourceType::File, record.id, OrganizationId::new());
        assert_eq!(store.delete_where(&foreign).await.unwrap(), None);
        assert_eq!(store.delete_where(&record.filter()).await.unwrap(), Some(record.clone()));
        assert!(store.is_empty());
    }
}
