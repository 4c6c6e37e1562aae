//! Warehouse abstraction traits
//!
//! These traits are the seams between the core subsystems and the relational
//! warehouse. The pooled PostgreSQL client implements all of them; tests use
//! scripted fakes.

use crate::core::ledger::MissingRefEntry;
use crate::domain::ids::{ColumnName, TableName};
use crate::domain::{Result, ScalarValue};
use async_trait::async_trait;

/// Write path used by the upsert engine
///
/// A single statement applies a whole chunk atomically; the engine never does
/// application-side read-modify-write.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Execute an upsert statement with positional parameters
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::domain::WarehouseError`]-wrapping error classified
    /// into the transient / referential / schema taxonomy.
    async fn execute_upsert(&self, statement: &str, params: &[ScalarValue]) -> Result<u64>;
}

/// Existence checks used by the reference resolver
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Of `candidates`, return those key values already present in
    /// `table.column`
    ///
    /// # Errors
    ///
    /// A failed query is surfaced as an error; it must never be conflated
    /// with "no keys exist".
    async fn existing_keys(
        &self,
        table: &TableName,
        column: &ColumnName,
        candidates: &[ScalarValue],
    ) -> Result<Vec<ScalarValue>>;
}

/// Ledger table access used by the missing-reference ledger
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Append an entry unless an open entry with the same
    /// (source table, source row, referenced table, referenced key) exists
    ///
    /// Returns whether a row was inserted.
    async fn insert_if_open_missing(&self, entry: &MissingRefEntry) -> Result<bool>;

    /// List unresolved entries, optionally filtered by referenced table,
    /// oldest first
    async fn list_unresolved(
        &self,
        referenced_table: Option<&TableName>,
    ) -> Result<Vec<MissingRefEntry>>;
}

/// Aggregate queries used to bootstrap and cross-check sync state
#[async_trait]
pub trait StateQueries: Send + Sync {
    /// Current maximum of a numeric key column, 0 for an empty table
    ///
    /// With `prefix` set, the column is treated as text of the form
    /// `<prefix><number>`: only matching keys are considered and the numeric
    /// tail is compared. Supports unioned tables keyed like `POS-1017`.
    ///
    /// # Errors
    ///
    /// A failed query is surfaced; it never silently falls back to 0.
    async fn max_id(
        &self,
        table: &TableName,
        column: &ColumnName,
        prefix: Option<&str>,
    ) -> Result<i64>;
}
