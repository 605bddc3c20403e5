//! Audited actions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The verb of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    /// A record was created.
    Create,
    /// A record's fields were changed.
    Update,
    /// A record was removed.
    Delete,
    /// A privileged read.
    Access,
}

impl AuditAction {
    /// Whether the action changed persisted state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Access)
    }
}
