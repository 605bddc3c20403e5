//! The mutation orchestrator.
//!
//! [`Orchestrator::perform`] runs one write through the full pipeline:
//! authorize the principal, apply the mutation under the version guard, and
//! record an audit entry for the change. Each stage can stop the pipeline,
//! and later stages never run once an earlier one has.
//!
//! Business outcomes (forbidden, not found, conflict, invalid payload) come
//! back as [`MutationOutcome`] values. Only infrastructure failures are
//! errors: see [`MutationError`].

mod decision;
mod error;
mod orchestrator;
mod outcome;

pub use decision::log_decision;
pub use error::MutationError;
pub use orchestrator::Orchestrator;
pub use outcome::{MutationOutcome, ReadOutcome};
