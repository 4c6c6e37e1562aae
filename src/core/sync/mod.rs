//! Sync orchestration
//!
//! The coordinator that drives fetch → resolve → apply → checkpoint per
//! entity, and the run summary it produces.

pub mod coordinator;
pub mod summary;

pub use coordinator::SyncCoordinator;
pub use summary::{EntityReport, SyncRunError, SyncSummary};
