//! Foreign-key reference resolution
//!
//! Declarations, per-key missing-reference policies, and the resolver that
//! patches or prunes batches before they reach the upsert engine.

pub mod policy;
pub mod resolver;

pub use policy::{ForeignKey, MissingRefPolicy};
pub use resolver::{ReferenceResolver, Resolution};
