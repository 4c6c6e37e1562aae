//! Batch record set model
//!
//! A [`RecordBatch`] is the unit of data handed from the fetch collaborator to
//! the reference resolver and upsert engine: an ordered set of uniform-shape
//! rows plus the declared target table and primary key. Shape invariants are
//! enforced at construction so that everything downstream can rely on them.

use crate::domain::errors::SyncError;
use crate::domain::ids::{ColumnName, TableName};
use crate::domain::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Scalar value domain for warehouse rows
///
/// Closed set of column value types carried through the core. Conversion to
/// and from wire parameters happens only at the warehouse adapter boundary.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Boolean
    Bool(bool),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// SQL NULL
    Null,
}

impl ScalarValue {
    /// Returns true for the SQL NULL variant
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Int(_) => "int",
            ScalarValue::Float(_) => "float",
            ScalarValue::Text(_) => "text",
            ScalarValue::Bool(_) => "bool",
            ScalarValue::Timestamp(_) => "timestamp",
            ScalarValue::Null => "null",
        }
    }
}

// Floats compare by bit pattern so values can key hash sets during
// reference resolution and primary-key uniqueness checks.
impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::Text(a), ScalarValue::Text(b)) => a == b,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Timestamp(a), ScalarValue::Timestamp(b)) => a == b,
            (ScalarValue::Null, ScalarValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Int(v) => v.hash(state),
            ScalarValue::Float(v) => v.to_bits().hash(state),
            ScalarValue::Text(v) => v.hash(state),
            ScalarValue::Bool(v) => v.hash(state),
            ScalarValue::Timestamp(v) => v.timestamp_micros().hash(state),
            ScalarValue::Null => {}
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Text(v) => write!(f, "{}", v),
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            ScalarValue::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(v: DateTime<Utc>) -> Self {
        ScalarValue::Timestamp(v)
    }
}

/// An ordered batch of uniform-shape records bound for one warehouse table
///
/// Invariants, checked at construction:
/// - the primary key is non-empty and a subset of the declared columns
/// - every row has exactly one value per declared column
/// - primary-key tuples are unique within the batch
///
/// # Examples
///
/// ```
/// use tributary::domain::record::{RecordBatch, ScalarValue};
///
/// let batch = RecordBatch::new(
///     "dim_products",
///     &["id", "name"],
///     &["id"],
///     vec![
///         vec![ScalarValue::Int(1), ScalarValue::from("Aspirin")],
///         vec![ScalarValue::Int(2), ScalarValue::from("Ibuprofen")],
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch.table().as_str(), "dim_products");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    table: TableName,
    columns: Vec<ColumnName>,
    primary_key: Vec<ColumnName>,
    rows: Vec<Vec<ScalarValue>>,
}

impl RecordBatch {
    /// Create a batch from string names, validating all shape invariants
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SchemaViolation`] if any invariant is broken and
    /// [`SyncError::Configuration`] if a name is not a valid identifier.
    pub fn new(
        table: &str,
        columns: &[&str],
        primary_key: &[&str],
        rows: Vec<Vec<ScalarValue>>,
    ) -> Result<Self> {
        let table = TableName::new(table).map_err(SyncError::Configuration)?;
        let columns = columns
            .iter()
            .map(|c| ColumnName::new(*c).map_err(SyncError::Configuration))
            .collect::<Result<Vec<_>>>()?;
        let primary_key = primary_key
            .iter()
            .map(|c| ColumnName::new(*c).map_err(SyncError::Configuration))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parts(table, columns, primary_key, rows)
    }

    /// Create a batch from already-validated identifier types
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SchemaViolation`] if any shape invariant is broken.
    pub fn from_parts(
        table: TableName,
        columns: Vec<ColumnName>,
        primary_key: Vec<ColumnName>,
        rows: Vec<Vec<ScalarValue>>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(SyncError::SchemaViolation(format!(
                "Batch for {} declares no columns",
                table
            )));
        }
        if primary_key.is_empty() {
            return Err(SyncError::SchemaViolation(format!(
                "Batch for {} declares no primary key",
                table
            )));
        }
        for pk in &primary_key {
            if !columns.contains(pk) {
                return Err(SyncError::SchemaViolation(format!(
                    "Primary key column {} is not among the declared columns of {}",
                    pk, table
                )));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SyncError::SchemaViolation(format!(
                    "Row {} of batch for {} has {} values, expected {}",
                    i,
                    table,
                    row.len(),
                    columns.len()
                )));
            }
        }

        let batch = Self {
            table,
            columns,
            primary_key,
            rows,
        };

        let pk_indices = batch.primary_key_indices();
        let mut seen: HashSet<Vec<&ScalarValue>> = HashSet::with_capacity(batch.rows.len());
        for (i, row) in batch.rows.iter().enumerate() {
            let key: Vec<&ScalarValue> = pk_indices.iter().map(|&idx| &row[idx]).collect();
            if !seen.insert(key) {
                return Err(SyncError::SchemaViolation(format!(
                    "Duplicate primary key in batch for {} at row {} ({})",
                    batch.table,
                    i,
                    batch.row_key(row)
                )));
            }
        }

        Ok(batch)
    }

    /// Target table of the batch
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Declared columns, in row order
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Declared primary key columns
    pub fn primary_key(&self) -> &[ColumnName] {
        &self.primary_key
    }

    /// Rows, aligned with [`columns`](Self::columns)
    pub fn rows(&self) -> &[Vec<ScalarValue>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the batch carries no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if declared
    pub fn column_index(&self, column: &ColumnName) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Positions of the primary key columns
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|pk| self.column_index(pk))
            .collect()
    }

    /// Render the primary-key tuple of a row for ledger and log output
    ///
    /// Composite keys are joined with `:`, matching the way prefixed order
    /// identifiers are rendered elsewhere.
    pub fn row_key(&self, row: &[ScalarValue]) -> String {
        let parts: Vec<String> = self
            .primary_key_indices()
            .iter()
            .map(|&idx| row[idx].to_string())
            .collect();
        parts.join(":")
    }

    /// Return a copy of the batch with the given row indexes removed
    ///
    /// Used by the reference resolver when a foreign key is configured with
    /// the drop-row policy. Shape invariants are preserved by construction.
    pub fn without_rows(&self, drop: &HashSet<usize>) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, row)| row.clone())
            .collect();
        Self {
            table: self.table.clone(),
            columns: self.columns.clone(),
            primary_key: self.primary_key.clone(),
            rows,
        }
    }
}
