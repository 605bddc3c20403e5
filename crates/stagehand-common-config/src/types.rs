//! Configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagehandConfig {
    pub concurrency: ConcurrencyConfig,
    pub authz: AuthzConfig,
    pub audit: AuditConfig,
    pub database: DatabaseConfig,
}

/// How a version guard applies its check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// The version predicate travels inside the scoped write.
    #[default]
    ConditionalWrite,
    /// Read, compare, then write.
    ReadThenWrite,
}

impl std::str::FromStr for ConcurrencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "conditional_write" => Ok(Self::ConditionalWrite),
            "read_then_write" => Ok(Self::ReadThenWrite),
            other => Err(format!("unknown guard mode: {other}")),
        }
    }
}

/// Optimistic concurrency settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Allowed distance between a claimed and a stored version, in ms.
    pub tolerance_ms: u64,
    pub mode: ConcurrencyMode,
}

impl ConcurrencyConfig {
    pub fn tolerance(&self) -> Duration {
        Duration::from_millis(self.tolerance_ms)
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 1000,
            mode: ConcurrencyMode::default(),
        }
    }
}

/// Authorization engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Memoise decisions per effective role set.
    pub decision_cache: bool,
    pub decision_cache_capacity: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            decision_cache: true,
            decision_cache_capacity: 4096,
        }
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record an `access` entry for privileged reads.
    pub record_access: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { record_access: true }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File path, or `:memory:`.
    pub path: String,
    pub max_connections: u32,
    pub wal_mode: bool,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "stagehand.db".to_string(),
            max_connections: 5,
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}
