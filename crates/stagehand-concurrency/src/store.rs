//! The record store collaborator.

use crate::filter::RecordFilter;
use crate::record::{NewRecord, Patch, Record};
use async_trait::async_trait;
use stagehand_common_core::RecordId;
use thiserror::Error;

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} already exists")]
    Duplicate(RecordId),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Storage for versioned records.
///
/// Every method evaluates the whole [`RecordFilter`], including its version
/// predicate, atomically with the operation it guards: a conditional
/// `update_where` either matches and writes, or touches nothing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record, stamping its first version.
    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError>;

    /// The record selected by `filter`, if any.
    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError>;

    /// Merge `patch` into the selected record and stamp a fresh
    /// `last_modified_at` strictly greater than the previous one.
    ///
    /// Returns the updated record, or `None` when nothing matched.
    async fn update_where(
        &self,
        filter: &RecordFilter,
        patch: &Patch,
    ) -> Result<Option<Record>, StoreError>;

    /// Remove the selected record.
    ///
    /// Returns the record as it was before removal, or `None` when nothing
    /// matched.
    async fn delete_where(&self, filter: &RecordFilter) -> Result<Option<Record>, StoreError>;
}
