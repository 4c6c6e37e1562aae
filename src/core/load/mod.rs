//! Batch loading
//!
//! The upsert engine and its per-chunk outcome types.

pub mod engine;
pub mod outcome;

pub use engine::UpsertEngine;
pub use outcome::{ApplyOutcome, ChunkOutcome, ChunkStatus};
