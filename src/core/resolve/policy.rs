//! Foreign-key declarations and missing-reference policies
//!
//! Which foreign keys exist on a table, and what to do when a referenced key
//! is absent from the warehouse, are declared in configuration. Nothing here
//! is inferred at runtime.

use crate::domain::ids::{ColumnName, TableName};
use crate::domain::ScalarValue;
use std::collections::BTreeMap;

/// What to do when a referenced key is missing from the referenced table
#[derive(Debug, Clone, PartialEq)]
pub enum MissingRefPolicy {
    /// Insert a minimal stand-in row into the referenced table so the
    /// dependent row loads without violating referential integrity.
    ///
    /// The placeholder carries the key column plus the configured defaults
    /// for the referenced table's other required columns.
    Placeholder {
        /// Default values for non-key columns, e.g. `name = "Unknown - Auto Created"`
        defaults: BTreeMap<ColumnName, ScalarValue>,
    },
    /// Drop the dependent row from the batch and log it for follow-up.
    ///
    /// Used when the referenced table has no safe default shape.
    DropRow,
}

impl MissingRefPolicy {
    /// Placeholder policy with the conventional auto-created name default
    pub fn placeholder_named_unknown() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert(
            ColumnName::new("name").expect("static identifier"),
            ScalarValue::from("Unknown - Auto Created"),
        );
        MissingRefPolicy::Placeholder { defaults }
    }
}

/// A declared foreign key on a batch's target table
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Column on the dependent table
    pub column: ColumnName,
    /// Table the key points into
    pub references_table: TableName,
    /// Key column on the referenced table
    pub references_column: ColumnName,
    /// Policy applied to keys missing from the referenced table
    pub on_missing: MissingRefPolicy,
}

impl ForeignKey {
    /// Convenience constructor from string names
    ///
    /// # Errors
    ///
    /// Returns an error string if any name is not a valid identifier.
    pub fn new(
        column: &str,
        references_table: &str,
        references_column: &str,
        on_missing: MissingRefPolicy,
    ) -> Result<Self, String> {
        Ok(Self {
            column: ColumnName::new(column)?,
            references_table: TableName::new(references_table)?,
            references_column: ColumnName::new(references_column)?,
            on_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_construction() {
        let fk = ForeignKey::new(
            "category_id",
            "dim_categories",
            "category_id",
            MissingRefPolicy::placeholder_named_unknown(),
        )
        .unwrap();
        assert_eq!(fk.references_table.as_str(), "dim_categories");
        match fk.on_missing {
            MissingRefPolicy::Placeholder { ref defaults } => {
                assert_eq!(defaults.len(), 1);
            }
            _ => panic!("expected placeholder policy"),
        }
    }

    #[test]
    fn test_foreign_key_rejects_bad_names() {
        assert!(ForeignKey::new("x;--", "t", "c", MissingRefPolicy::DropRow).is_err());
    }
}
