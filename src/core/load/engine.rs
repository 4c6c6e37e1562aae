//! Upsert engine
//!
//! Applies a record batch to its target table in bounded chunks, each as a
//! single atomic insert-or-update statement. Transient failures are retried
//! with the shared backoff policy; foreign-key violations and schema
//! mismatches surface immediately in the per-chunk outcome.

use crate::adapters::warehouse::sql;
use crate::adapters::warehouse::traits::BatchWriter;
use crate::core::load::outcome::{ApplyOutcome, ChunkOutcome, ChunkStatus};
use crate::core::retry::{retry_transient, RetryPolicy};
use crate::domain::{RecordBatch, Result, ScalarValue, SyncError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Applies batches with insert-or-update-on-conflict semantics
pub struct UpsertEngine {
    writer: Arc<dyn BatchWriter>,
    retry: RetryPolicy,
    parallel_chunks: usize,
}

impl UpsertEngine {
    /// Create an engine over the given writer
    ///
    /// `parallel_chunks` bounds how many chunks of one batch are in flight at
    /// once. Primary-key uniqueness within a batch guarantees concurrent
    /// chunks never touch the same row.
    pub fn new(writer: Arc<dyn BatchWriter>, retry: RetryPolicy, parallel_chunks: usize) -> Self {
        Self {
            writer,
            retry,
            parallel_chunks: parallel_chunks.max(1),
        }
    }

    /// Apply a batch in chunks of at most `chunk_size` rows
    ///
    /// Each chunk is one multi-row `INSERT ... ON CONFLICT (pk) DO UPDATE`
    /// statement, so a re-applied batch converges to the incoming values
    /// without duplicating rows (last-write-wins per primary key).
    ///
    /// The returned outcome lists every chunk with its affected-row count or
    /// terminal error; partial success is explicit and the caller decides
    /// what to do with it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] for a zero `chunk_size`.
    /// Execution failures never fail the call itself; they are reported per
    /// chunk in the outcome.
    pub async fn apply(&self, batch: &RecordBatch, chunk_size: usize) -> Result<ApplyOutcome> {
        if chunk_size == 0 {
            return Err(SyncError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if batch.is_empty() {
            tracing::debug!(table = %batch.table(), "Empty batch, nothing to apply");
            return Ok(ApplyOutcome::default());
        }

        // Keep each statement under the wire limit on bind parameters.
        let columns = batch.columns().len();
        let effective = chunk_size
            .min(sql::MAX_STATEMENT_PARAMS / columns.max(1))
            .max(1);
        if effective < chunk_size {
            tracing::debug!(
                table = %batch.table(),
                requested = chunk_size,
                effective,
                "Capping chunk size to honor the statement parameter limit"
            );
        }

        tracing::info!(
            table = %batch.table(),
            rows = batch.len(),
            chunk_size = effective,
            "Applying batch"
        );

        let mut outcomes: Vec<ChunkOutcome> = stream::iter(
            batch
                .rows()
                .chunks(effective)
                .enumerate()
                .map(|(index, rows)| self.apply_chunk(batch, index, rows)),
        )
        .buffer_unordered(self.parallel_chunks)
        .collect()
        .await;

        outcomes.sort_by_key(|c| c.index);
        let outcome = ApplyOutcome { chunks: outcomes };

        if outcome.is_complete_success() {
            tracing::info!(
                table = %batch.table(),
                rows = batch.len(),
                affected = outcome.rows_affected(),
                "Batch applied"
            );
        } else {
            tracing::warn!(
                table = %batch.table(),
                rows_failed = outcome.rows_failed(),
                chunks_failed = outcome.failed_chunks().count(),
                "Batch applied with failures"
            );
        }

        Ok(outcome)
    }

    async fn apply_chunk(
        &self,
        batch: &RecordBatch,
        index: usize,
        rows: &[Vec<ScalarValue>],
    ) -> ChunkOutcome {
        let statement = sql::build_upsert(
            batch.table(),
            batch.columns(),
            batch.primary_key(),
            rows.len(),
        );
        let params: Vec<ScalarValue> = rows.iter().flatten().cloned().collect();

        let report = retry_transient(&self.retry, "chunk upsert", || {
            self.writer.execute_upsert(&statement, &params)
        })
        .await;

        match report.result {
            Ok(rows_affected) => {
                tracing::debug!(
                    table = %batch.table(),
                    chunk = index,
                    rows = rows.len(),
                    rows_affected,
                    attempts = report.attempts,
                    "Chunk applied"
                );
                ChunkOutcome {
                    index,
                    rows: rows.len(),
                    attempts: report.attempts,
                    status: ChunkStatus::Applied { rows_affected },
                }
            }
            Err(error) => {
                tracing::error!(
                    table = %batch.table(),
                    chunk = index,
                    rows = rows.len(),
                    attempts = report.attempts,
                    error = %error,
                    "Chunk failed"
                );
                ChunkOutcome {
                    index,
                    rows: rows.len(),
                    attempts: report.attempts,
                    status: ChunkStatus::Failed { error },
                }
            }
        }
    }
}
