//! Reference resolver
//!
//! Given a batch destined for a table with declared foreign keys, determines
//! which referenced keys are missing from the warehouse and either emits
//! placeholder rows for them (Policy A) or drops the dependent rows
//! (Policy B), logging every decision to the missing-reference ledger.

use crate::adapters::warehouse::traits::ReferenceLookup;
use crate::core::ledger::{MissingRefEntry, RefStatus};
use crate::core::resolve::policy::{ForeignKey, MissingRefPolicy};
use crate::domain::{RecordBatch, Result, ScalarValue, SyncError};
use std::collections::HashSet;
use std::sync::Arc;

/// Output of resolving one batch
#[derive(Debug)]
pub struct Resolution {
    /// Placeholder batches for referenced tables
    ///
    /// Contractually applied before `batch`; the coordinator enforces the
    /// ordering.
    pub placeholders: Vec<RecordBatch>,

    /// The input batch, with rows dropped under [`MissingRefPolicy::DropRow`]
    pub batch: RecordBatch,

    /// Ledger entries for every missing reference encountered
    pub ledger_entries: Vec<MissingRefEntry>,
}

impl Resolution {
    /// True when every reference was already satisfied
    pub fn is_clean(&self) -> bool {
        self.placeholders.is_empty() && self.ledger_entries.is_empty()
    }
}

/// Resolves foreign-key references for batches before they are upserted
pub struct ReferenceResolver {
    lookup: Arc<dyn ReferenceLookup>,
}

impl ReferenceResolver {
    /// Create a resolver over the given warehouse lookup
    pub fn new(lookup: Arc<dyn ReferenceLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve all declared foreign keys for a batch
    ///
    /// For each foreign key the referenced-key values present in the batch
    /// are checked against the referenced table. Missing keys are handled per
    /// the key's configured policy. Re-resolving the same batch against a
    /// warehouse already patched with placeholders finds every key present
    /// and produces neither placeholders nor ledger entries.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SchemaViolation`] if a declared foreign-key column is
    ///   not part of the batch
    /// - any lookup failure, surfaced as-is; a failed existence query aborts
    ///   resolution for the batch rather than being treated as "all missing"
    pub async fn resolve(
        &self,
        batch: RecordBatch,
        foreign_keys: &[ForeignKey],
    ) -> Result<Resolution> {
        let mut placeholders = Vec::new();
        let mut ledger_entries: Vec<MissingRefEntry> = Vec::new();
        let mut entry_keys: HashSet<(String, String, String, String)> = HashSet::new();
        let mut dropped: HashSet<usize> = HashSet::new();

        for fk in foreign_keys {
            let col_idx = batch.column_index(&fk.column).ok_or_else(|| {
                SyncError::SchemaViolation(format!(
                    "Foreign key column {} is not part of the batch for {}",
                    fk.column,
                    batch.table()
                ))
            })?;

            // Distinct referenced values, first-seen order for stable queries.
            let mut seen_values: HashSet<ScalarValue> = HashSet::new();
            let mut candidates: Vec<ScalarValue> = Vec::new();
            for (row_idx, row) in batch.rows().iter().enumerate() {
                if dropped.contains(&row_idx) {
                    continue;
                }
                let value = &row[col_idx];
                if value.is_null() {
                    continue;
                }
                if seen_values.insert(value.clone()) {
                    candidates.push(value.clone());
                }
            }

            if candidates.is_empty() {
                continue;
            }

            let existing: HashSet<ScalarValue> = self
                .lookup
                .existing_keys(&fk.references_table, &fk.references_column, &candidates)
                .await?
                .into_iter()
                .collect();

            let missing: Vec<ScalarValue> = candidates
                .into_iter()
                .filter(|v| !existing.contains(v))
                .collect();

            if missing.is_empty() {
                continue;
            }

            tracing::warn!(
                table = %batch.table(),
                column = %fk.column,
                referenced_table = %fk.references_table,
                missing = missing.len(),
                "Missing foreign-key references"
            );

            match &fk.on_missing {
                MissingRefPolicy::Placeholder { defaults } => {
                    placeholders.push(build_placeholder_batch(fk, &missing, defaults)?);

                    let missing_set: HashSet<&ScalarValue> = missing.iter().collect();
                    for row in batch.rows() {
                        let value = &row[col_idx];
                        if !missing_set.contains(value) {
                            continue;
                        }
                        let entry = MissingRefEntry::new(
                            batch.table().clone(),
                            batch.row_key(row),
                            fk.references_table.clone(),
                            value.to_string(),
                            RefStatus::PlaceholderCreated,
                        );
                        if entry_keys.insert(entry.dedup_key()) {
                            ledger_entries.push(entry);
                        }
                    }
                }
                MissingRefPolicy::DropRow => {
                    let missing_set: HashSet<&ScalarValue> = missing.iter().collect();
                    for (row_idx, row) in batch.rows().iter().enumerate() {
                        if dropped.contains(&row_idx) {
                            continue;
                        }
                        let value = &row[col_idx];
                        if !missing_set.contains(value) {
                            continue;
                        }
                        dropped.insert(row_idx);
                        let entry = MissingRefEntry::new(
                            batch.table().clone(),
                            batch.row_key(row),
                            fk.references_table.clone(),
                            value.to_string(),
                            RefStatus::Unresolved,
                        );
                        if entry_keys.insert(entry.dedup_key()) {
                            ledger_entries.push(entry);
                        }
                    }
                }
            }
        }

        let batch = if dropped.is_empty() {
            batch
        } else {
            tracing::warn!(
                table = %batch.table(),
                dropped = dropped.len(),
                "Dropping rows with unresolvable references"
            );
            batch.without_rows(&dropped)
        };

        Ok(Resolution {
            placeholders,
            batch,
            ledger_entries,
        })
    }
}

/// Build the placeholder batch for one foreign key's missing values
fn build_placeholder_batch(
    fk: &ForeignKey,
    missing: &[ScalarValue],
    defaults: &std::collections::BTreeMap<crate::domain::ColumnName, ScalarValue>,
) -> Result<RecordBatch> {
    let mut columns = vec![fk.references_column.clone()];
    columns.extend(defaults.keys().cloned());

    let rows = missing
        .iter()
        .map(|value| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(value.clone());
            row.extend(defaults.values().cloned());
            row
        })
        .collect();

    RecordBatch::from_parts(
        fk.references_table.clone(),
        columns,
        vec![fk.references_column.clone()],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ColumnName, TableName};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Lookup fake seeded with the keys each table "already has".
    struct SeededLookup {
        known: Mutex<std::collections::HashMap<String, Vec<ScalarValue>>>,
        queries: Mutex<usize>,
    }

    impl SeededLookup {
        fn new() -> Self {
            Self {
                known: Mutex::new(std::collections::HashMap::new()),
                queries: Mutex::new(0),
            }
        }

        fn seed(self, table: &str, keys: Vec<ScalarValue>) -> Self {
            self.known.lock().unwrap().insert(table.to_string(), keys);
            self
        }
    }

    #[async_trait]
    impl ReferenceLookup for SeededLookup {
        async fn existing_keys(
            &self,
            table: &TableName,
            _column: &ColumnName,
            candidates: &[ScalarValue],
        ) -> Result<Vec<ScalarValue>> {
            *self.queries.lock().unwrap() += 1;
            let known = self.known.lock().unwrap();
            let present = known.get(table.as_str()).cloned().unwrap_or_default();
            Ok(candidates
                .iter()
                .filter(|c| present.contains(c))
                .cloned()
                .collect())
        }
    }

    /// Lookup fake that always fails, for failure-surfacing tests.
    struct FailingLookup;

    #[async_trait]
    impl ReferenceLookup for FailingLookup {
        async fn existing_keys(
            &self,
            _table: &TableName,
            _column: &ColumnName,
            _candidates: &[ScalarValue],
        ) -> Result<Vec<ScalarValue>> {
            Err(crate::domain::WarehouseError::ConnectionLost("down".into()).into())
        }
    }

    fn products_batch() -> RecordBatch {
        RecordBatch::new(
            "dim_products",
            &["ref_id", "name", "category_id"],
            &["ref_id"],
            vec![
                vec![
                    ScalarValue::Int(1),
                    ScalarValue::from("Aspirin"),
                    ScalarValue::Int(1),
                ],
                vec![
                    ScalarValue::Int(2),
                    ScalarValue::from("Ibuprofen"),
                    ScalarValue::Int(2),
                ],
                vec![
                    ScalarValue::Int(3),
                    ScalarValue::from("Paracetamol"),
                    ScalarValue::Int(3),
                ],
            ],
        )
        .unwrap()
    }

    fn category_fk(policy: MissingRefPolicy) -> ForeignKey {
        ForeignKey::new("category_id", "dim_categories", "category_id", policy).unwrap()
    }

    #[tokio::test]
    async fn test_placeholder_created_for_missing_category() {
        // Categories 1 and 2 exist; 3 does not.
        let lookup = Arc::new(SeededLookup::new().seed(
            "dim_categories",
            vec![ScalarValue::Int(1), ScalarValue::Int(2)],
        ));
        let resolver = ReferenceResolver::new(lookup);

        let resolution = resolver
            .resolve(
                products_batch(),
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap();

        assert_eq!(resolution.placeholders.len(), 1);
        let ph = &resolution.placeholders[0];
        assert_eq!(ph.table().as_str(), "dim_categories");
        assert_eq!(ph.len(), 1);
        assert_eq!(ph.rows()[0][0], ScalarValue::Int(3));
        assert_eq!(ph.rows()[0][1], ScalarValue::from("Unknown - Auto Created"));

        // No rows dropped under Policy A.
        assert_eq!(resolution.batch.len(), 3);

        assert_eq!(resolution.ledger_entries.len(), 1);
        let entry = &resolution.ledger_entries[0];
        assert_eq!(entry.status, RefStatus::PlaceholderCreated);
        assert_eq!(entry.referenced_key, "3");
        assert_eq!(entry.source_row_id, "3");
    }

    #[tokio::test]
    async fn test_drop_row_policy() {
        let lookup = Arc::new(SeededLookup::new().seed(
            "dim_categories",
            vec![ScalarValue::Int(1), ScalarValue::Int(2)],
        ));
        let resolver = ReferenceResolver::new(lookup);

        let resolution = resolver
            .resolve(products_batch(), &[category_fk(MissingRefPolicy::DropRow)])
            .await
            .unwrap();

        assert!(resolution.placeholders.is_empty());
        assert_eq!(resolution.batch.len(), 2);
        assert_eq!(resolution.ledger_entries.len(), 1);
        assert_eq!(resolution.ledger_entries[0].status, RefStatus::Unresolved);
        assert_eq!(resolution.ledger_entries[0].source_row_id, "3");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_once_patched() {
        // Simulates a warehouse that already received the placeholder.
        let lookup = Arc::new(SeededLookup::new().seed(
            "dim_categories",
            vec![
                ScalarValue::Int(1),
                ScalarValue::Int(2),
                ScalarValue::Int(3),
            ],
        ));
        let resolver = ReferenceResolver::new(lookup);

        let resolution = resolver
            .resolve(
                products_batch(),
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap();

        assert!(resolution.is_clean());
        assert_eq!(resolution.batch.len(), 3);
    }

    #[tokio::test]
    async fn test_null_references_are_skipped() {
        let batch = RecordBatch::new(
            "dim_products",
            &["ref_id", "category_id"],
            &["ref_id"],
            vec![
                vec![ScalarValue::Int(1), ScalarValue::Null],
                vec![ScalarValue::Int(2), ScalarValue::Null],
            ],
        )
        .unwrap();

        let lookup = Arc::new(SeededLookup::new());
        let queries = Arc::clone(&lookup);
        let resolver = ReferenceResolver::new(lookup);

        let resolution = resolver
            .resolve(
                batch,
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap();

        assert!(resolution.is_clean());
        // All-null column means no existence query at all.
        assert_eq!(*queries.queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_missing_values_yield_one_placeholder_row() {
        let batch = RecordBatch::new(
            "dim_products",
            &["ref_id", "category_id"],
            &["ref_id"],
            vec![
                vec![ScalarValue::Int(1), ScalarValue::Int(9)],
                vec![ScalarValue::Int(2), ScalarValue::Int(9)],
            ],
        )
        .unwrap();

        let lookup = Arc::new(SeededLookup::new());
        let resolver = ReferenceResolver::new(lookup);

        let resolution = resolver
            .resolve(
                batch,
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap();

        assert_eq!(resolution.placeholders[0].len(), 1);
        // One ledger entry per referencing row, same missing key.
        assert_eq!(resolution.ledger_entries.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_fk_column_is_schema_violation() {
        let batch = RecordBatch::new(
            "dim_products",
            &["ref_id", "name"],
            &["ref_id"],
            vec![vec![ScalarValue::Int(1), ScalarValue::from("x")]],
        )
        .unwrap();

        let resolver = ReferenceResolver::new(Arc::new(SeededLookup::new()));
        let err = resolver
            .resolve(
                batch,
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap_err();
        assert!(err.is_schema_fatal());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_surfaced() {
        let resolver = ReferenceResolver::new(Arc::new(FailingLookup));
        let err = resolver
            .resolve(
                products_batch(),
                &[category_fk(MissingRefPolicy::placeholder_named_unknown())],
            )
            .await
            .unwrap_err();
        // Surfaced, not treated as "all references missing".
        assert!(err.is_transient());
    }
}
