//! Sync coordinator - main orchestrator for a sync run
//!
//! Sequences entities through fetch → resolve → apply → checkpoint in an
//! order derived from the declared foreign keys. The coordinator is the sole
//! owner of the sync state: the engine and resolver only report outcomes, and
//! a watermark advances only after its entity's batches have been durably
//! applied.

use crate::adapters::source::{JsonDirSource, RecordSource};
use crate::adapters::warehouse::traits::{
    BatchWriter, LedgerStorage, ReferenceLookup, StateQueries,
};
use crate::adapters::warehouse::WarehouseClient;
use crate::config::schema::{TableConfig, TributaryConfig};
use crate::core::ledger::{MissingRefLedger, RefStatus};
use crate::core::load::UpsertEngine;
use crate::core::plan;
use crate::core::resolve::ReferenceResolver;
use crate::core::retry::RetryPolicy;
use crate::core::state::{SyncStateStore, Watermark};
use crate::core::sync::summary::{EntityReport, SyncRunError, SyncSummary};
use crate::domain::ids::{ColumnName, TableName};
use crate::domain::{RecordBatch, Result, SyncError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Sync coordinator
pub struct SyncCoordinator {
    tables: Vec<TableConfig>,
    chunk_size: usize,
    checkpoint_failure_aborts: bool,
    source: Arc<dyn RecordSource>,
    resolver: ReferenceResolver,
    engine: UpsertEngine,
    ledger: MissingRefLedger,
    queries: Arc<dyn StateQueries>,
    state: SyncStateStore,
    shutdown: watch::Receiver<bool>,
}

impl SyncCoordinator {
    /// Create a coordinator wired to the real warehouse and staging source
    ///
    /// Connects the pool, verifies the connection, ensures the operational
    /// schema, and loads the durable sync state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the warehouse is
    /// unreachable, or the state file exists but cannot be parsed.
    pub async fn connect(
        config: TributaryConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        config.validate().map_err(SyncError::Configuration)?;

        let TributaryConfig {
            warehouse,
            source,
            sync,
            tables,
            ..
        } = config;

        let client = Arc::new(WarehouseClient::connect(warehouse).await?);
        client.test_connection().await?;
        client.ensure_schema().await?;
        tracing::info!(
            warehouse = %client.connection_string_safe(),
            "Warehouse ready"
        );

        let state = SyncStateStore::load(&sync.state_file)?;
        let record_source: Arc<dyn RecordSource> = Arc::new(JsonDirSource::new(&source.path));

        Ok(Self::with_components(
            tables,
            sync.chunk_size,
            sync.parallel_chunks,
            sync.checkpoint_failure_aborts,
            sync.retry.to_policy(),
            record_source,
            client.clone(),
            client.clone(),
            client.clone(),
            client,
            state,
            shutdown,
        ))
    }

    /// Create a coordinator from explicit components
    ///
    /// Production wiring goes through [`connect`](Self::connect); this
    /// constructor exists so tests can script the warehouse seams.
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        tables: Vec<TableConfig>,
        chunk_size: usize,
        parallel_chunks: usize,
        checkpoint_failure_aborts: bool,
        retry: RetryPolicy,
        source: Arc<dyn RecordSource>,
        lookup: Arc<dyn ReferenceLookup>,
        writer: Arc<dyn BatchWriter>,
        ledger_storage: Arc<dyn LedgerStorage>,
        queries: Arc<dyn StateQueries>,
        state: SyncStateStore,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            tables,
            chunk_size,
            checkpoint_failure_aborts,
            source,
            resolver: ReferenceResolver::new(lookup),
            engine: UpsertEngine::new(writer, retry, parallel_chunks),
            ledger: MissingRefLedger::new(ledger_storage),
            queries,
            state,
            shutdown,
        }
    }

    /// Execute one sync run
    ///
    /// Entities are processed in dependency order. A failed entity does not
    /// stop the run unless the failure is schema-class (or a checkpoint write
    /// failed and `checkpoint_failure_aborts` is set); its watermark simply
    /// does not advance, so the next run picks the same records up again.
    pub async fn execute_sync(&mut self) -> Result<SyncSummary> {
        let start = Instant::now();
        let mut summary = SyncSummary::new();

        tracing::info!(run_id = %summary.run_id, tables = self.tables.len(), "Starting sync run");

        let pairs = self
            .dependency_pairs()
            .map_err(SyncError::Configuration)?;
        let order = plan::load_order(&pairs)?;

        for table_name in order {
            if *self.shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping between entities");
                summary.interrupted = true;
                break;
            }

            let table = self
                .tables
                .iter()
                .find(|t| t.name == table_name.as_str())
                .cloned()
                .expect("load order only contains configured tables");

            tracing::info!(table = %table_name, "Processing entity");

            match self.sync_entity(&table).await {
                Ok(report) => {
                    if !report.is_successful() {
                        summary.add_error(
                            SyncRunError::from_sync_error(&SyncError::Other(format!(
                                "{} chunk(s) failed after retries",
                                report.chunks_failed
                            )))
                            .with_context(format!("table={}", table_name)),
                        );
                    }
                    summary.add_entity(report);
                }
                Err(e) => {
                    tracing::error!(table = %table_name, error = %e, "Entity sync failed");
                    let fatal_schema = e.is_schema_fatal();
                    let checkpoint_failed = matches!(e, SyncError::State(_));
                    summary.add_error(
                        SyncRunError::from_sync_error(&e)
                            .with_context(format!("table={}", table_name)),
                    );

                    if fatal_schema {
                        tracing::error!(
                            "Schema-class failure, aborting remaining entities"
                        );
                        summary.aborted_on_schema_error = true;
                        break;
                    }
                    if checkpoint_failed && self.checkpoint_failure_aborts {
                        tracing::error!(
                            "Watermark checkpoint failed, aborting remaining entities"
                        );
                        break;
                    }
                }
            }
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Read-only view of the sync state, for status reporting
    pub fn state(&self) -> &SyncStateStore {
        &self.state
    }

    fn dependency_pairs(&self) -> std::result::Result<Vec<(TableName, Vec<TableName>)>, String> {
        self.tables
            .iter()
            .map(|t| {
                let name = t.table_name()?;
                let refs = t
                    .foreign_keys
                    .iter()
                    .map(|fk| TableName::new(fk.references_table.clone()))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((name, refs))
            })
            .collect()
    }

    /// Process one entity: fetch → resolve → apply → checkpoint
    async fn sync_entity(&mut self, table: &TableConfig) -> Result<EntityReport> {
        let table_name = table.table_name().map_err(SyncError::Configuration)?;
        let key = table.state_key();
        let mut report = EntityReport::new(table_name.clone());

        // Current watermark, bootstrapped from the warehouse when configured
        // and no checkpoint exists yet.
        let since = match self.state.get_opt(&key) {
            Some(w) => Some(w.clone()),
            None => match &table.bootstrap {
                Some(bootstrap) => {
                    let column = ColumnName::new(bootstrap.column.clone())
                        .map_err(SyncError::Configuration)?;
                    let max = self
                        .queries
                        .max_id(&table_name, &column, bootstrap.prefix.as_deref())
                        .await?;
                    let watermark = Watermark::Id(max);
                    tracing::info!(
                        table = %table_name,
                        key = %key,
                        watermark = %watermark,
                        "Bootstrapped watermark from warehouse"
                    );
                    self.state.set(key.clone(), watermark.clone());
                    Some(watermark)
                }
                None => None,
            },
        };

        let batches = self.source.fetch(&table_name, since.as_ref()).await?;
        if batches.is_empty() {
            tracing::info!(table = %table_name, "Nothing to load");
            return Ok(report);
        }

        let foreign_keys = table
            .domain_foreign_keys()
            .map_err(SyncError::Configuration)?;
        let watermark_column = table
            .watermark_column_name()
            .map_err(SyncError::Configuration)?;

        let mut all_applied = true;
        let mut candidate: Option<Watermark> = None;

        for batch in batches {
            let fetched = batch.len();
            report.rows_fetched += fetched;

            let (placeholders, batch, entries) = if foreign_keys.is_empty() {
                (Vec::new(), batch, Vec::new())
            } else {
                let resolution = self.resolver.resolve(batch, &foreign_keys).await?;
                report.rows_dropped += fetched - resolution.batch.len();
                (
                    resolution.placeholders,
                    resolution.batch,
                    resolution.ledger_entries,
                )
            };

            // Placeholders must be durably applied before any dependent row.
            for placeholder in &placeholders {
                let outcome = self.engine.apply(placeholder, self.chunk_size).await?;
                report.placeholder_rows += outcome.rows_applied();
                if let Some(schema) = outcome.schema_failure() {
                    return Err(SyncError::SchemaViolation(schema.to_string()));
                }
                if !outcome.is_complete_success() {
                    return Err(SyncError::Resolution(format!(
                        "Placeholder batch for {} failed; dependent batch for {} withheld",
                        placeholder.table(),
                        table_name
                    )));
                }
            }

            if !entries.is_empty() {
                report.unresolved_refs += entries
                    .iter()
                    .filter(|e| e.status == RefStatus::Unresolved)
                    .count();
                report.ledger_entries += self.ledger.record_all(&entries).await?;
            }

            let outcome = self.engine.apply(&batch, self.chunk_size).await?;
            report.rows_applied += outcome.rows_applied();
            report.rows_failed += outcome.rows_failed();
            report.chunks_failed += outcome.failed_chunks().count();

            if let Some(schema) = outcome.schema_failure() {
                return Err(SyncError::SchemaViolation(schema.to_string()));
            }
            if outcome.has_referential_failure() {
                // The resolver ran before this apply, so a violation here
                // means references changed underneath us or a key was not
                // declared; surfacing beats a blind retry either way.
                tracing::warn!(
                    table = %table_name,
                    "Foreign-key violation survived resolution; check the declared keys"
                );
            }

            if outcome.is_complete_success() {
                if let Some(column) = &watermark_column {
                    let batch_max = batch_watermark_candidate(&batch, column)?;
                    candidate = merge_candidates(candidate, batch_max)?;
                }
            } else {
                all_applied = false;
                // Tables with cross-row consistency requirements stop at the
                // first failed chunk instead of applying later batches around
                // the hole.
                if table.require_full_success {
                    tracing::warn!(
                        table = %table_name,
                        "Table requires full success; remaining batches withheld"
                    );
                    break;
                }
            }
        }

        // Watermark and checkpoint only after every chunk of every batch
        // landed; a partially applied entity is re-fetched next run.
        if all_applied {
            if let Some(candidate) = candidate {
                report.watermark_advanced = self.state.advance(&key, candidate)?;
            }
            self.state.save()?;
            report.checkpointed = true;
        } else {
            tracing::warn!(
                table = %table_name,
                chunks_failed = report.chunks_failed,
                "Entity had failed chunks; watermark not advanced"
            );
        }

        Ok(report)
    }
}

/// Maximum watermark candidate carried by a batch column
fn batch_watermark_candidate(
    batch: &RecordBatch,
    column: &ColumnName,
) -> Result<Option<Watermark>> {
    let idx = batch.column_index(column).ok_or_else(|| {
        SyncError::SchemaViolation(format!(
            "Watermark column {} is not part of the batch for {}",
            column,
            batch.table()
        ))
    })?;

    let mut best: Option<Watermark> = None;
    for row in batch.rows() {
        if let Some(value) = Watermark::from_scalar(&row[idx]) {
            best = merge_candidates(best, Some(value))?;
        }
    }
    Ok(best)
}

fn merge_candidates(
    current: Option<Watermark>,
    incoming: Option<Watermark>,
) -> Result<Option<Watermark>> {
    match (current, incoming) {
        (None, incoming) => Ok(incoming),
        (current, None) => Ok(current),
        (Some(current), Some(incoming)) => {
            if incoming.is_ahead_of(&current).map_err(SyncError::State)? {
                Ok(Some(incoming))
            } else {
                Ok(Some(current))
            }
        }
    }
}
