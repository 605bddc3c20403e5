//! Stagehand common core types and utilities.
//!
//! Identifiers shared by every Stagehand crate, the [`Version`] marker used
//! for optimistic concurrency.

pub mod id;
pub mod version;

pub use id::{IdParseError, OrganizationId, ProjectId, RecordId, UserId};
pub use version::Version;
