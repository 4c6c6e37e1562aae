//! Record source adapters
//!
//! The upstream extraction client (authentication, remote queries,
//! pagination, field derivation) lives outside this crate. The core only
//! needs the [`RecordSource`] capability: given an entity and its watermark,
//! return the batches to load. Fetching with an unchanged watermark is
//! assumed to return an equivalent result set; the idempotent upsert path
//! makes re-application safe either way.

pub mod json_dir;

use crate::core::state::Watermark;
use crate::domain::ids::TableName;
use crate::domain::{RecordBatch, Result};
use async_trait::async_trait;

pub use json_dir::JsonDirSource;

/// Fetch collaborator seam
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the batches for one entity, newer than `since` when given
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::SyncError::Source`] when the upstream data
    /// cannot be read or decoded.
    async fn fetch(
        &self,
        entity: &TableName,
        since: Option<&Watermark>,
    ) -> Result<Vec<RecordBatch>>;
}
