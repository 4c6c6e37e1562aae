//! Missing-reference ledger
//!
//! Append-only log of unresolved foreign-key references for operator
//! follow-up. The core only appends (with dedup) and lists; resolution is an
//! out-of-band operational activity.

use crate::adapters::warehouse::traits::LedgerStorage;
use crate::domain::ids::TableName;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Resolution status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStatus {
    /// Logged, nothing written to the referenced table
    Unresolved,
    /// A placeholder row was created in the referenced table
    PlaceholderCreated,
    /// Marked resolved by operator tooling or a reconciliation pass
    Resolved,
}

impl RefStatus {
    /// Database representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            RefStatus::Unresolved => "unresolved",
            RefStatus::PlaceholderCreated => "placeholder-created",
            RefStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for RefStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RefStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(RefStatus::Unresolved),
            "placeholder-created" => Ok(RefStatus::PlaceholderCreated),
            "resolved" => Ok(RefStatus::Resolved),
            other => Err(format!("Unknown reference status '{other}'")),
        }
    }
}

/// One logged missing reference
#[derive(Debug, Clone, PartialEq)]
pub struct MissingRefEntry {
    /// Table whose row carried the dangling reference
    pub source_table: TableName,
    /// Rendered primary key of the referencing row
    pub source_row_id: String,
    /// Table the reference points into
    pub referenced_table: TableName,
    /// Rendered missing key value
    pub referenced_key: String,
    /// Current resolution status
    pub status: RefStatus,
    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
}

impl MissingRefEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        source_table: TableName,
        source_row_id: impl Into<String>,
        referenced_table: TableName,
        referenced_key: impl Into<String>,
        status: RefStatus,
    ) -> Self {
        Self {
            source_table,
            source_row_id: source_row_id.into(),
            referenced_table,
            referenced_key: referenced_key.into(),
            status,
            created_at: Utc::now(),
        }
    }

    /// Dedup identity: same source row pointing at the same missing key
    pub fn dedup_key(&self) -> (String, String, String, String) {
        (
            self.source_table.to_string(),
            self.source_row_id.clone(),
            self.referenced_table.to_string(),
            self.referenced_key.clone(),
        )
    }
}

/// Ledger facade over the warehouse-backed storage
pub struct MissingRefLedger {
    storage: Arc<dyn LedgerStorage>,
}

impl MissingRefLedger {
    /// Create a ledger backed by the given storage
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    /// Record a set of entries, deduplicating within the call and against
    /// open entries already in the ledger
    ///
    /// Returns the number of entries actually inserted. Recording the same
    /// unresolved reference twice produces exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails; partial inserts are
    /// possible and the count reflects what landed.
    pub async fn record_all(&self, entries: &[MissingRefEntry]) -> Result<usize> {
        let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
        let mut recorded = 0;

        for entry in entries {
            if !seen.insert(entry.dedup_key()) {
                continue;
            }
            if self.storage.insert_if_open_missing(entry).await? {
                recorded += 1;
                tracing::warn!(
                    source_table = %entry.source_table,
                    source_row = %entry.source_row_id,
                    referenced_table = %entry.referenced_table,
                    referenced_key = %entry.referenced_key,
                    status = %entry.status,
                    "Recorded missing reference"
                );
            }
        }

        Ok(recorded)
    }

    /// List open entries, optionally restricted to one referenced table
    ///
    /// Read-only operator query; not consumed by the automated path.
    pub async fn list_unresolved(
        &self,
        referenced_table: Option<&TableName>,
    ) -> Result<Vec<MissingRefEntry>> {
        self.storage.list_unresolved(referenced_table).await
    }
}
