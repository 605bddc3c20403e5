//! Configuration types for Stagehand.
//!
//! Settings live in `.stagehand/config.yaml`; every section has defaults so a
//! missing or partial file is valid.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
