//! The version guard.

use crate::filter::{RecordFilter, VersionPredicate};
use crate::record::{MutationSpec, PatchError};
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use stagehand_common_core::Version;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Default skew tolerance between a claimed and a stored version.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_millis(1000);

/// How the version comparison is joined to the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// The version predicate travels inside the scoped write, so compare and
    /// write are one store operation. A read happens only after a write
    /// matched nothing, to tell `NotFound` from `Conflict`.
    #[default]
    ConditionalWrite,
    /// Read, compare in process, then write. Two writers that read the same
    /// version before either writes can both succeed.
    ReadThenWrite,
}

/// Why a guarded mutation was refused without reaching a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Rejection {
    /// The mutation payload was malformed.
    InvalidPatch(String),
    /// The store failed; the underlying message is preserved.
    Store(String),
}

impl Rejection {
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidPatch(m) | Self::Store(m) => m,
        }
    }
}

impl From<PatchError> for Rejection {
    fn from(err: PatchError) -> Self {
        Self::InvalidPatch(err.to_string())
    }
}

impl From<StoreError> for Rejection {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result of a guarded mutation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "version", rename_all = "snake_case")]
pub enum ConflictOutcome {
    /// The write happened. For updates this is the record's new
    /// `last_modified_at`; for deletes, the time of removal.
    Applied(Version),
    /// The claimed base version is stale; this is the current one.
    Conflict(Version),
    /// No record matched the id, tenant and scope filters.
    NotFound,
    Rejected(Rejection),
}

impl ConflictOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Arbitrates concurrent writes to versioned records.
#[derive(Clone)]
pub struct VersionGuard {
    store: Arc<dyn RecordStore>,
    tolerance: Duration,
    mode: GuardMode,
}

impl VersionGuard {
    /// Guard with the default tolerance in conditional-write mode.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            tolerance: DEFAULT_TOLERANCE,
            mode: GuardMode::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_mode(mut self, mode: GuardMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Apply `mutation` to the record selected by `filter` if
    /// `claimed_base_version` still matches the stored version.
    ///
    /// Without a claimed version the write is unconditional. Any version
    /// predicate already on `filter` is replaced.
    #[instrument(
        skip(self, mutation),
        fields(record_id = %filter.id, organization_id = %filter.organization_id, mode = ?self.mode)
    )]
    pub async fn guarded_mutate(
        &self,
        filter: &RecordFilter,
        claimed_base_version: Option<Version>,
        mutation: &MutationSpec,
    ) -> ConflictOutcome {
        if let MutationSpec::Update(patch) = mutation {
            if let Err(err) = patch.validate() {
                debug!(error = %err, "Rejecting invalid patch");
                return ConflictOutcome::Rejected(err.into());
            }
        }

        let filter = filter.without_version();
        let result = match self.mode {
            GuardMode::ConditionalWrite => {
                self.conditional_write(&filter, claimed_base_version, mutation).await
            }
            GuardMode::ReadThenWrite => {
                self.read_then_write(&filter, claimed_base_version, mutation).await
            }
        };

        match result {
            Ok(outcome) => {
                if let ConflictOutcome::Conflict(current) = &outcome {
                    info!(
                        claimed = ?claimed_base_version,
                        current = %current,
                        "Version conflict"
                    );
                }
                outcome
            }
            Err(err) => {
                error!(error = %err, "Record store failure");
                ConflictOutcome::Rejected(err.into())
            }
        }
    }

    async fn conditional_write(
        &self,
        filter: &RecordFilter,
        claimed: Option<Version>,
        mutation: &MutationSpec,
    ) -> Result<ConflictOutcome, StoreError> {
        let guarded = match claimed {
            Some(version) => filter
                .clone()
                .with_version(VersionPredicate::new(version, self.tolerance)),
            None => filter.clone(),
        };

        if let Some(version) = self.write(&guarded, mutation).await? {
            return Ok(ConflictOutcome::Applied(version));
        }

        // Nothing matched: either the record is gone or its version moved.
        Ok(match self.store.find_one(filter).await? {
            Some(current) if claimed.is_some() => ConflictOutcome::Conflict(current.last_modified_at),
            _ => ConflictOutcome::NotFound,
        })
    }

    async fn read_then_write(
        &self,
        filter: &RecordFilter,
        claimed: Option<Version>,
        mutation: &MutationSpec,
    ) -> Result<ConflictOutcome, StoreError> {
        let current = match self.store.find_one(filter).await? {
            Some(record) => record.last_modified_at,
            None => return Ok(ConflictOutcome::NotFound),
        };

        if let Some(version) = claimed {
            if !version.matches(&current, self.tolerance) {
                return Ok(ConflictOutcome::Conflict(current));
            }
        }

        Ok(match self.write(filter, mutation).await? {
            Some(version) => ConflictOutcome::Applied(version),
            None => ConflictOutcome::NotFound,
        })
    }

    async fn write(
        &self,
        filter: &RecordFilter,
        mutation: &MutationSpec,
    ) -> Result<Option<Version>, StoreError> {
        match mutation {
            MutationSpec::Update(patch) => Ok(self
                .store
                .update_where(filter, patch)
                .await?
                .map(|record| record.last_modified_at)),
            // A delete's version is the removal time, never earlier than the
            // version it removed.
            MutationSpec::Delete => Ok(self
                .store
                .delete_where(filter)
                .await?
                .map(|removed| Version::next_after(&removed.last_modified_at))),
        }
    }
}
