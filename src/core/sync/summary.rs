//! Sync run summary and reporting
//!
//! This module defines structures for tracking and reporting the results of
//! one sync run: per-entity row accounting, unresolved-reference counts, and
//! the errors encountered along the way.

use crate::domain::ids::TableName;
use crate::domain::SyncError;
use std::time::Duration;
use uuid::Uuid;

/// Per-entity results of one sync run
#[derive(Debug, Clone)]
pub struct EntityReport {
    /// Entity table
    pub table: TableName,

    /// Rows fetched from the source
    pub rows_fetched: usize,

    /// Rows in chunks that applied
    pub rows_applied: usize,

    /// Rows in chunks that failed after retries
    pub rows_failed: usize,

    /// Rows dropped under the drop-row missing-reference policy
    pub rows_dropped: usize,

    /// Placeholder rows written into referenced tables
    pub placeholder_rows: usize,

    /// Ledger entries recorded (after dedup)
    pub ledger_entries: usize,

    /// Entries recorded with unresolved status
    pub unresolved_refs: usize,

    /// Chunks that failed after exhausting retries
    pub chunks_failed: usize,

    /// Whether the stored watermark moved forward
    pub watermark_advanced: bool,

    /// Whether state was persisted after this entity
    pub checkpointed: bool,
}

impl EntityReport {
    /// Create an empty report for an entity
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            rows_fetched: 0,
            rows_applied: 0,
            rows_failed: 0,
            rows_dropped: 0,
            placeholder_rows: 0,
            ledger_entries: 0,
            unresolved_refs: 0,
            chunks_failed: 0,
            watermark_advanced: false,
            checkpointed: false,
        }
    }

    /// True when every fetched row either applied or was deliberately dropped
    pub fn is_successful(&self) -> bool {
        self.chunks_failed == 0 && self.rows_failed == 0
    }
}

/// Type of sync run error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncErrorType {
    /// Fetch collaborator failure
    Source,
    /// Warehouse failure
    Warehouse,
    /// Reference resolution failure
    Resolution,
    /// State persistence failure
    State,
    /// Configuration failure
    Configuration,
    /// Record shape or column mismatch
    Schema,
    /// Unclassified failure
    Unknown,
}

/// Sync run error with context
#[derive(Debug, Clone)]
pub struct SyncRunError {
    /// Type of error
    pub error_type: SyncErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g. the entity being processed)
    pub context: Option<String>,
}

impl SyncRunError {
    /// Create a new sync run error
    pub fn new(error_type: SyncErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Classify a domain error into a run error
    pub fn from_sync_error(error: &SyncError) -> Self {
        let error_type = match error {
            SyncError::Source(_) => SyncErrorType::Source,
            SyncError::Warehouse(_) => SyncErrorType::Warehouse,
            SyncError::Resolution(_) => SyncErrorType::Resolution,
            SyncError::State(_) => SyncErrorType::State,
            SyncError::Configuration(_) => SyncErrorType::Configuration,
            SyncError::SchemaViolation(_) => SyncErrorType::Schema,
            _ => SyncErrorType::Unknown,
        };
        Self::new(error_type, error.to_string())
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

/// Summary of one sync run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    /// Run identifier, stamped on log output
    pub run_id: Uuid,

    /// Per-entity reports, in load order
    pub entities: Vec<EntityReport>,

    /// Errors encountered during the run
    pub errors: Vec<SyncRunError>,

    /// Duration of the run
    pub duration: Duration,

    /// Whether the run stopped early on a shutdown signal
    pub interrupted: bool,

    /// Whether a schema-class failure aborted the remaining entities
    pub aborted_on_schema_error: bool,
}

impl SyncSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entities: Vec::new(),
            errors: Vec::new(),
            duration: Duration::from_secs(0),
            interrupted: false,
            aborted_on_schema_error: false,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an entity report
    pub fn add_entity(&mut self, report: EntityReport) {
        self.entities.push(report);
    }

    /// Add an error
    pub fn add_error(&mut self, error: SyncRunError) {
        self.errors.push(error);
    }

    /// Total rows fetched across entities
    pub fn rows_fetched(&self) -> usize {
        self.entities.iter().map(|e| e.rows_fetched).sum()
    }

    /// Total rows applied across entities
    pub fn rows_applied(&self) -> usize {
        self.entities.iter().map(|e| e.rows_applied).sum()
    }

    /// Total rows that failed across entities
    pub fn rows_failed(&self) -> usize {
        self.entities.iter().map(|e| e.rows_failed).sum()
    }

    /// Total unresolved references recorded
    pub fn unresolved_refs(&self) -> usize {
        self.entities.iter().map(|e| e.unresolved_refs).sum()
    }

    /// Total placeholder rows written
    pub fn placeholder_rows(&self) -> usize {
        self.entities.iter().map(|e| e.placeholder_rows).sum()
    }

    /// True when no rows failed and no errors were recorded
    pub fn is_successful(&self) -> bool {
        self.rows_failed() == 0
            && self.errors.is_empty()
            && !self.aborted_on_schema_error
            && self.entities.iter().all(|e| e.is_successful())
    }

    /// Success rate as a percentage of fetched rows
    pub fn success_rate(&self) -> f64 {
        let fetched = self.rows_fetched();
        if fetched == 0 {
            return 100.0;
        }
        (self.rows_applied() as f64 / fetched as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            entities = self.entities.len(),
            rows_fetched = self.rows_fetched(),
            rows_applied = self.rows_applied(),
            rows_failed = self.rows_failed(),
            placeholder_rows = self.placeholder_rows(),
            unresolved_refs = self.unresolved_refs(),
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            interrupted = self.interrupted,
            "Sync run completed"
        );

        for entity in &self.entities {
            tracing::info!(
                table = %entity.table,
                rows_fetched = entity.rows_fetched,
                rows_applied = entity.rows_applied,
                rows_failed = entity.rows_failed,
                rows_dropped = entity.rows_dropped,
                placeholder_rows = entity.placeholder_rows,
                unresolved_refs = entity.unresolved_refs,
                watermark_advanced = entity.watermark_advanced,
                "Entity result"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(error_count = self.errors.len(), "Sync run had errors");
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Sync error"
                );
            }
        }
    }
}

impl Default for SyncSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WarehouseError;

    fn table(s: &str) -> TableName {
        TableName::new(s).unwrap()
    }

    #[test]
    fn test_summary_accounting() {
        let mut summary = SyncSummary::new();

        let mut dims = EntityReport::new(table("dim_categories"));
        dims.rows_fetched = 10;
        dims.rows_applied = 10;
        summary.add_entity(dims);

        let mut facts = EntityReport::new(table("fact_sales_lines"));
        facts.rows_fetched = 100;
        facts.rows_applied = 90;
        facts.rows_failed = 10;
        facts.chunks_failed = 1;
        facts.unresolved_refs = 3;
        summary.add_entity(facts);

        assert_eq!(summary.rows_fetched(), 110);
        assert_eq!(summary.rows_applied(), 100);
        assert_eq!(summary.rows_failed(), 10);
        assert_eq!(summary.unresolved_refs(), 3);
        assert!(!summary.is_successful());
        assert!((summary.success_rate() - 90.909).abs() < 0.01);
    }

    #[test]
    fn test_empty_summary_is_successful() {
        let summary = SyncSummary::new();
        assert!(summary.is_successful());
        assert_eq!(summary.success_rate(), 100.0);
    }

    #[test]
    fn test_error_classification() {
        let err: SyncError = WarehouseError::Query("boom".into()).into();
        let run_error = SyncRunError::from_sync_error(&err)
            .with_context("table=dim_products".to_string());
        assert_eq!(run_error.error_type, SyncErrorType::Warehouse);
        assert_eq!(run_error.context.as_deref(), Some("table=dim_products"));

        let err = SyncError::SchemaViolation("ragged".into());
        assert_eq!(
            SyncRunError::from_sync_error(&err).error_type,
            SyncErrorType::Schema
        );
    }

    #[test]
    fn test_errors_make_run_unsuccessful() {
        let mut summary = SyncSummary::new();
        summary.add_error(SyncRunError::new(
            SyncErrorType::Source,
            "staging file unreadable".to_string(),
        ));
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_with_duration() {
        let summary = SyncSummary::new().with_duration(Duration::from_secs(42));
        assert_eq!(summary.duration, Duration::from_secs(42));
    }
}
