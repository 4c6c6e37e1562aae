//! Configuration schema types
//!
//! This module defines the configuration structure for tributary. Everything
//! the core consumes is declared here: warehouse connection settings, sync
//! tuning, and the per-table declarations (primary keys, watermarks, foreign
//! keys and their missing-reference policies). Nothing is inferred at
//! runtime.

use crate::config::SecretString;
use crate::core::resolve::{ForeignKey, MissingRefPolicy};
use crate::core::retry::RetryPolicy;
use crate::domain::ids::{ColumnName, StateKey, TableName};
use crate::domain::ScalarValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Main tributary configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Deserialize)]
pub struct TributaryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Warehouse connection configuration
    pub warehouse: WarehouseConfig,

    /// Record source configuration
    pub source: SourceConfig,

    /// Sync engine tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Per-table declarations, in any order; load order is derived from the
    /// foreign keys
    pub tables: Vec<TableConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TributaryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.warehouse.validate()?;
        self.source.validate()?;
        self.sync.validate()?;
        self.logging.validate()?;

        if self.tables.is_empty() {
            return Err("At least one [[tables]] entry is required".to_string());
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !seen.insert(table.name.as_str()) {
                return Err(format!("Table '{}' is declared twice", table.name));
            }
        }

        Ok(())
    }

    /// The `(table, referenced tables)` pairs used for load-order planning
    pub fn dependency_pairs(&self) -> Result<Vec<(TableName, Vec<TableName>)>, String> {
        self.tables
            .iter()
            .map(|t| {
                let name = t.table_name()?;
                let refs = t
                    .foreign_keys
                    .iter()
                    .map(|fk| TableName::new(fk.references_table.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((name, refs))
            })
            .collect()
    }

    /// Find a table declaration by name
    pub fn table(&self, name: &TableName) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name.as_str())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Warehouse connection configuration
#[derive(Debug, Deserialize)]
pub struct WarehouseConfig {
    /// PostgreSQL connection string; credentials are held zeroized in memory
    pub connection_string: SecretString,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Timeout for acquiring and creating connections
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout applied on every checkout
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,

    /// TLS mode: "disable" or "require"
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

impl WarehouseConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.connection_string.expose_secret().is_empty() {
            return Err("warehouse.connection_string cannot be empty".to_string());
        }
        if !self.connection_string.expose_secret().starts_with("postgres") {
            return Err(
                "warehouse.connection_string must be a postgresql:// connection string"
                    .to_string(),
            );
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err("warehouse.max_connections must be between 1 and 100".to_string());
        }
        let valid_modes = ["disable", "require"];
        if !valid_modes.contains(&self.ssl_mode.as_str()) {
            return Err(format!(
                "Invalid ssl_mode '{}'. Must be one of: {}",
                self.ssl_mode,
                valid_modes.join(", ")
            ));
        }
        Ok(())
    }
}

/// Record source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source kind; currently only "json-dir"
    #[serde(default = "default_source_kind")]
    pub kind: String,

    /// Staging directory holding one `<table>.json` document per entity
    pub path: String,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.kind != "json-dir" {
            return Err(format!(
                "Unsupported source kind '{}'. Only 'json-dir' is available",
                self.kind
            ));
        }
        if self.path.trim().is_empty() {
            return Err("source.path cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Sync engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Rows per upsert chunk (1-5000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunks of one batch in flight at once (1-32)
    #[serde(default = "default_parallel_chunks")]
    pub parallel_chunks: usize,

    /// Path of the durable watermark file
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Abort the run when a watermark checkpoint cannot be persisted;
    /// disable to continue un-checkpointed
    #[serde(default = "default_true")]
    pub checkpoint_failure_aborts: bool,

    /// Retry configuration shared by the engine and warehouse query paths
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            parallel_chunks: default_parallel_chunks(),
            state_file: default_state_file(),
            checkpoint_failure_aborts: true,
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 || self.chunk_size > 5000 {
            return Err("sync.chunk_size must be between 1 and 5000".to_string());
        }
        if self.parallel_chunks == 0 || self.parallel_chunks > 32 {
            return Err("sync.parallel_chunks must be between 1 and 32".to_string());
        }
        if self.state_file.trim().is_empty() {
            return Err("sync.state_file cannot be empty".to_string());
        }
        self.retry.validate()
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per chunk, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err("sync.retry.max_attempts must be between 1 and 10".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("sync.retry.backoff_multiplier must be at least 1.0".to_string());
        }
        Ok(())
    }

    /// Convert into the core retry policy
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// Declarations for one target table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name in the warehouse
    pub name: String,

    /// Primary key column(s) used for upsert conflict resolution
    pub primary_key: Vec<String>,

    /// State-file key for this entity's watermark; defaults to
    /// `<name>_watermark`
    #[serde(default)]
    pub state_key: Option<String>,

    /// Column whose maximum value becomes the new watermark candidate after
    /// a successful load; entities without one are re-fetched in full
    #[serde(default)]
    pub watermark_column: Option<String>,

    /// Refuse to advance past partial failures and report the entity failed
    /// when any chunk fails; default tolerates partial success
    #[serde(default)]
    pub require_full_success: bool,

    /// How to seed the watermark when the state file has no entry
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,

    /// Declared foreign keys with their missing-reference policies
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyConfig>,
}

impl TableConfig {
    fn validate(&self) -> Result<(), String> {
        TableName::new(self.name.clone())?;
        if self.primary_key.is_empty() {
            return Err(format!("Table '{}' declares no primary key", self.name));
        }
        for pk in &self.primary_key {
            ColumnName::new(pk.clone())?;
        }
        if let Some(col) = &self.watermark_column {
            ColumnName::new(col.clone())?;
        }
        if let Some(bootstrap) = &self.bootstrap {
            bootstrap.validate(&self.name)?;
        }
        for fk in &self.foreign_keys {
            fk.validate(&self.name)?;
        }
        Ok(())
    }

    /// The validated table name
    pub fn table_name(&self) -> Result<TableName, String> {
        TableName::new(self.name.clone())
    }

    /// The state-file key for this entity
    pub fn state_key(&self) -> StateKey {
        let key = self
            .state_key
            .clone()
            .unwrap_or_else(|| format!("{}_watermark", self.name));
        StateKey::new(key).expect("validated table names produce non-empty keys")
    }

    /// The validated watermark column, when declared
    pub fn watermark_column_name(&self) -> Result<Option<ColumnName>, String> {
        self.watermark_column
            .as_ref()
            .map(|c| ColumnName::new(c.clone()))
            .transpose()
    }

    /// Convert the declared foreign keys into their domain form
    pub fn domain_foreign_keys(&self) -> Result<Vec<ForeignKey>, String> {
        self.foreign_keys.iter().map(|fk| fk.to_domain()).collect()
    }
}

/// Watermark bootstrap declaration
///
/// When the state file has no entry for an entity, the current maximum of
/// this column is queried from the warehouse instead of starting from zero,
/// so a rebuilt state file doesn't trigger a full re-extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Key column to take the maximum of
    pub column: String,

    /// Key prefix for unioned tables with type-prefixed IDs (e.g. "POS-")
    #[serde(default)]
    pub prefix: Option<String>,
}

impl BootstrapConfig {
    fn validate(&self, table: &str) -> Result<(), String> {
        ColumnName::new(self.column.clone())
            .map_err(|e| format!("Table '{}' bootstrap: {}", table, e))?;
        Ok(())
    }
}

/// One declared foreign key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// Column on this table
    pub column: String,

    /// Referenced table
    pub references_table: String,

    /// Referenced key column
    pub references_column: String,

    /// Missing-reference policy: "placeholder" or "drop"
    #[serde(default = "default_on_missing")]
    pub on_missing: String,

    /// Default values for the placeholder's non-key columns; only valid with
    /// the placeholder policy
    #[serde(default)]
    pub placeholder_defaults: Option<BTreeMap<String, toml::Value>>,
}

impl ForeignKeyConfig {
    fn validate(&self, table: &str) -> Result<(), String> {
        ColumnName::new(self.column.clone())
            .map_err(|e| format!("Table '{}' foreign key: {}", table, e))?;
        TableName::new(self.references_table.clone())
            .map_err(|e| format!("Table '{}' foreign key: {}", table, e))?;
        ColumnName::new(self.references_column.clone())
            .map_err(|e| format!("Table '{}' foreign key: {}", table, e))?;

        match self.on_missing.as_str() {
            "placeholder" => {
                if let Some(defaults) = &self.placeholder_defaults {
                    for (column, value) in defaults {
                        if column == &self.references_column {
                            return Err(format!(
                                "Table '{}': placeholder default '{}' collides with the referenced key column",
                                table, column
                            ));
                        }
                        ColumnName::new(column.clone())
                            .map_err(|e| format!("Table '{}' placeholder default: {}", table, e))?;
                        scalar_from_toml(value).map_err(|e| {
                            format!("Table '{}' placeholder default '{}': {}", table, column, e)
                        })?;
                    }
                }
                Ok(())
            }
            "drop" => {
                if self.placeholder_defaults.is_some() {
                    return Err(format!(
                        "Table '{}': placeholder_defaults is only valid with on_missing = \"placeholder\"",
                        table
                    ));
                }
                Ok(())
            }
            other => Err(format!(
                "Table '{}': invalid on_missing '{}'. Must be 'placeholder' or 'drop'",
                table, other
            )),
        }
    }

    /// Convert into the domain foreign-key declaration
    pub fn to_domain(&self) -> Result<ForeignKey, String> {
        let on_missing = match self.on_missing.as_str() {
            "drop" => MissingRefPolicy::DropRow,
            _ => {
                let mut defaults = BTreeMap::new();
                if let Some(configured) = &self.placeholder_defaults {
                    for (column, value) in configured {
                        defaults.insert(ColumnName::new(column.clone())?, scalar_from_toml(value)?);
                    }
                }
                MissingRefPolicy::Placeholder { defaults }
            }
        };

        ForeignKey::new(
            &self.column,
            &self.references_table,
            &self.references_column,
            on_missing,
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid = ["daily", "hourly"];
        if !valid.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid.join(", ")
            ));
        }
        Ok(())
    }
}

/// Convert a TOML scalar into the core value domain
fn scalar_from_toml(value: &toml::Value) -> Result<ScalarValue, String> {
    match value {
        toml::Value::String(s) => Ok(ScalarValue::Text(s.clone())),
        toml::Value::Integer(i) => Ok(ScalarValue::Int(*i)),
        toml::Value::Float(f) => Ok(ScalarValue::Float(*f)),
        toml::Value::Boolean(b) => Ok(ScalarValue::Bool(*b)),
        toml::Value::Datetime(d) => d
            .to_string()
            .parse()
            .map(ScalarValue::Timestamp)
            .map_err(|e| format!("invalid datetime: {e}")),
        other => Err(format!("unsupported scalar value: {other}")),
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> usize {
    20
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    60
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_source_kind() -> String {
    "json-dir".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_parallel_chunks() -> usize {
    1
}

fn default_state_file() -> String {
    "tributary_state.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_on_missing() -> String {
    "placeholder".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}
