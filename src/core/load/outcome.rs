//! Apply outcomes for the upsert engine
//!
//! Partial success is explicit: an [`ApplyOutcome`] reports what happened to
//! every chunk rather than treating the whole batch as atomic. The
//! orchestrator decides whether partial success is acceptable per entity.

use crate::domain::SyncError;

/// Terminal status of one chunk
#[derive(Debug)]
pub enum ChunkStatus {
    /// The chunk's statement executed; `rows_affected` is the combined
    /// inserted-or-updated count reported by the warehouse
    Applied {
        /// Affected-row count for the chunk
        rows_affected: u64,
    },
    /// The chunk failed after exhausting its retry budget (or immediately,
    /// for non-retryable failures)
    Failed {
        /// The terminal error
        error: SyncError,
    },
}

/// Result of applying one chunk
#[derive(Debug)]
pub struct ChunkOutcome {
    /// Position of the chunk within the batch
    pub index: usize,
    /// Number of rows in the chunk
    pub rows: usize,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Terminal status
    pub status: ChunkStatus,
}

impl ChunkOutcome {
    /// True when the chunk landed
    pub fn is_applied(&self) -> bool {
        matches!(self.status, ChunkStatus::Applied { .. })
    }

    /// The terminal error for failed chunks
    pub fn error(&self) -> Option<&SyncError> {
        match &self.status {
            ChunkStatus::Failed { error } => Some(error),
            ChunkStatus::Applied { .. } => None,
        }
    }
}

/// Result of applying a whole batch
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Per-chunk outcomes, in chunk order
    pub chunks: Vec<ChunkOutcome>,
}

impl ApplyOutcome {
    /// Total rows in chunks that applied
    pub fn rows_applied(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.is_applied())
            .map(|c| c.rows)
            .sum()
    }

    /// Total rows in chunks that failed terminally
    pub fn rows_failed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| !c.is_applied())
            .map(|c| c.rows)
            .sum()
    }

    /// Combined affected-row count across applied chunks
    pub fn rows_affected(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| match c.status {
                ChunkStatus::Applied { rows_affected } => rows_affected,
                ChunkStatus::Failed { .. } => 0,
            })
            .sum()
    }

    /// Chunks that failed after exhausting retries
    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| !c.is_applied())
    }

    /// True when every chunk applied
    pub fn is_complete_success(&self) -> bool {
        self.chunks.iter().all(|c| c.is_applied())
    }

    /// True when any chunk failed on a foreign-key violation
    ///
    /// Such chunks are never retried as-is; the caller re-invokes the
    /// reference resolver before trying again.
    pub fn has_referential_failure(&self) -> bool {
        self.failed_chunks()
            .any(|c| c.error().map(|e| e.is_referential()).unwrap_or(false))
    }

    /// First schema-class failure, if any
    pub fn schema_failure(&self) -> Option<&SyncError> {
        self.failed_chunks()
            .filter_map(|c| c.error())
            .find(|e| e.is_schema_fatal())
    }
}
