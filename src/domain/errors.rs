//! Domain error types
//!
//! This module defines the error hierarchy for tributary. All errors are
//! domain-specific and don't expose third-party types; classification into
//! the transient / referential / schema / state taxonomy lives here so the
//! retry and resolution paths can route failures without string matching.

use thiserror::Error;

/// Main tributary error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Warehouse-related errors
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Sync-state persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Record shape or column mismatch errors, never retried
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Fetch collaborator errors
    #[error("Source error: {0}")]
    Source(String),

    /// Reference resolution errors
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// True for failures worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Warehouse(w) if w.is_transient())
    }

    /// True for foreign-key violations, which are routed to the reference
    /// resolver instead of being retried
    pub fn is_referential(&self) -> bool {
        matches!(self, SyncError::Warehouse(w) if w.is_referential())
    }

    /// True for structural failures that abort the remaining entities of a run
    pub fn is_schema_fatal(&self) -> bool {
        match self {
            SyncError::SchemaViolation(_) => true,
            SyncError::Warehouse(w) => w.is_schema(),
            _ => false,
        }
    }
}

/// Warehouse-specific errors
///
/// Errors raised by the relational warehouse adapter. Variants carry the
/// classification the upsert engine needs: transient conditions are retried,
/// foreign-key violations are routed to the resolver, schema mismatches are
/// fatal for the affected chunk.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Failed to obtain a pooled connection
    #[error("Failed to get connection from pool: {0}")]
    Pool(String),

    /// Connection dropped mid-operation
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Statement or connect timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Deadlock or serialization conflict
    #[error("Serialization conflict: {0}")]
    SerializationConflict(String),

    /// Foreign-key constraint violated
    #[error("Foreign key violation on {constraint}: {detail}")]
    ForeignKeyViolation {
        /// Name of the violated constraint
        constraint: String,
        /// Server-reported detail, e.g. the offending key
        detail: String,
    },

    /// Undefined table/column, type mismatch, or other structural failure
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Query failed for a reason outside the classified taxonomy
    #[error("Query failed: {0}")]
    Query(String),

    /// TLS setup failure
    #[error("TLS error: {0}")]
    Tls(String),
}

impl WarehouseError {
    /// True for conditions that may clear on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WarehouseError::Pool(_)
                | WarehouseError::ConnectionLost(_)
                | WarehouseError::Timeout(_)
                | WarehouseError::SerializationConflict(_)
        )
    }

    /// True for foreign-key violations
    pub fn is_referential(&self) -> bool {
        matches!(self, WarehouseError::ForeignKeyViolation { .. })
    }

    /// True for structural mismatches that retrying cannot fix
    pub fn is_schema(&self) -> bool {
        matches!(self, WarehouseError::SchemaMismatch(_))
    }
}

/// Sync-state persistence errors
///
/// Failures of the durable watermark store. Persistence failures are always
/// surfaced; the in-memory watermark is not considered committed until a save
/// succeeds.
#[derive(Debug, Error)]
pub enum StateError {
    /// State file could not be read or written
    #[error("State file I/O failed: {0}")]
    Io(String),

    /// State file contents could not be parsed or encoded
    #[error("State encoding failed: {0}")]
    Serialization(String),

    /// A watermark advance was attempted with an incompatible value type
    #[error("Watermark type mismatch for {key}: stored {stored}, candidate {candidate}")]
    WatermarkTypeMismatch {
        /// State key being advanced
        key: String,
        /// Variant name of the stored watermark
        stored: &'static str,
        /// Variant name of the rejected candidate
        candidate: &'static str,
    },
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_warehouse_error_conversion() {
        let wh_err = WarehouseError::ConnectionLost("socket closed".to_string());
        let err: SyncError = wh_err.into();
        assert!(matches!(err, SyncError::Warehouse(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_referential_classification() {
        let err: SyncError = WarehouseError::ForeignKeyViolation {
            constraint: "fk_dim_categories_category_id".to_string(),
            detail: "Key (category_id)=(3) is not present".to_string(),
        }
        .into();
        assert!(err.is_referential());
        assert!(!err.is_transient());
        assert!(!err.is_schema_fatal());
    }

    #[test]
    fn test_schema_classification() {
        let err: SyncError =
            WarehouseError::SchemaMismatch("column \"Name\" does not exist".to_string()).into();
        assert!(err.is_schema_fatal());
        assert!(!err.is_transient());

        let shape = SyncError::SchemaViolation("ragged row".to_string());
        assert!(shape.is_schema_fatal());
    }

    #[test]
    fn test_transient_variants() {
        assert!(WarehouseError::Pool("exhausted".into()).is_transient());
        assert!(WarehouseError::Timeout("statement".into()).is_transient());
        assert!(WarehouseError::SerializationConflict("deadlock".into()).is_transient());
        assert!(!WarehouseError::Query("boom".into()).is_transient());
    }

    #[test]
    fn test_state_error_conversion() {
        let state_err = StateError::Io("permission denied".to_string());
        let err: SyncError = state_err.into();
        assert!(matches!(err, SyncError::State(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = SyncError::Resolution("test".to_string());
        let _: &dyn std::error::Error = &err;
        let wh = WarehouseError::Query("test".to_string());
        let _: &dyn std::error::Error = &wh;
    }
}
