//! Optimistic concurrency control for Stagehand records.
//!
//! Every write declares the [`Version`] of the record it was based on. The
//! [`VersionGuard`] applies the write only if that claim still matches the
//! stored `last_modified_at` (within a small tolerance), and otherwise
//! reports a conflict carrying the current version so the caller can
//! refresh. Expected outcomes are returned as [`ConflictOutcome`] values,
//! never as errors.
//!
//! [`Version`]: stagehand_common_core::Version

mod filter;
mod guard;
mod memory;
mod record;
mod store;

pub use filter::{RecordFilter, VersionPredicate};
pub use guard::{ConflictOutcome, GuardMode, Rejection, VersionGuard, DEFAULT_TOLERANCE};
pub use memory::MemoryRecordStore;
pub use record::{MutationSpec, NewRecord, Patch, PatchError, Record, RESERVED_FIELDS};
pub use store::{RecordStore, StoreError};
