//! SQLite persistence for Stagehand.
//!
//! [`DatabasePool`] opens the database and brings the schema up to date;
//! [`SqliteRecordStore`] and [`SqliteAuditStore`] implement the record and
//! audit collaborator traits on top of it.

pub mod audit;
pub mod migration;
pub mod pool;
pub mod records;

pub use audit::SqliteAuditStore;
pub use migration::{schema, Migration, MigrationError, MigrationRunner};
pub use pool::{DatabasePool, PoolConfig, PoolError};
pub use records::SqliteRecordStore;
