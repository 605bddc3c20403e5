//! Resource kinds that appear in audit entries and record stores.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The kind of entity a record or audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    Organization,
    Member,
    Project,
    Task,
    Budget,
    File,
    Schedule,
    Vendor,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
