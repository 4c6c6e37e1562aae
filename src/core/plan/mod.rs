//! Entity load-order planning
//!
//! Derives a topological load order from the declared foreign keys, so
//! referenced tables are always loaded before their dependents. The
//! "dimensions before facts" invariant is computed from configuration rather
//! than assumed from call order.

use crate::domain::ids::TableName;
use crate::domain::SyncError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Load-order planning errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// The foreign-key graph contains a cycle
    #[error("Circular dependency among tables: {0}")]
    CircularDependency(String),

    /// A foreign key references a table no batch is configured for
    ///
    /// A reference to an unmanaged table is allowed only when it resolves to
    /// placeholder rows; full dependency ordering requires the table to be
    /// part of the plan.
    #[error("Table '{0}' references '{1}' which is not configured")]
    UnknownReference(String, String),

    /// No tables were configured
    #[error("No tables configured")]
    NoTables,
}

impl From<PlanError> for SyncError {
    fn from(err: PlanError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

/// Compute the topological load order for the configured tables
///
/// Input is `(table, referenced tables)` pairs. References to tables outside
/// the configured set are reported as [`PlanError::UnknownReference`];
/// self-references are ignored (a hierarchy table referencing itself cannot
/// be ordered any further and is handled by the resolver at load time).
///
/// Ties are broken deterministically by table name so runs are reproducible.
///
/// # Examples
///
/// ```
/// use tributary::core::plan::load_order;
/// use tributary::domain::TableName;
///
/// let t = |s: &str| TableName::new(s).unwrap();
/// let order = load_order(&[
///     (t("fact_sales_lines"), vec![t("all_sales"), t("dim_products")]),
///     (t("all_sales"), vec![]),
///     (t("dim_products"), vec![t("dim_categories")]),
///     (t("dim_categories"), vec![]),
/// ])
/// .unwrap();
///
/// let pos = |name: &str| order.iter().position(|x| x.as_str() == name).unwrap();
/// assert!(pos("dim_categories") < pos("dim_products"));
/// assert!(pos("dim_products") < pos("fact_sales_lines"));
/// assert!(pos("all_sales") < pos("fact_sales_lines"));
/// ```
pub fn load_order(
    tables: &[(TableName, Vec<TableName>)],
) -> Result<Vec<TableName>, PlanError> {
    if tables.is_empty() {
        return Err(PlanError::NoTables);
    }

    let configured: BTreeSet<&TableName> = tables.iter().map(|(t, _)| t).collect();

    // dependents[referenced] = tables that must wait for it
    let mut dependents: BTreeMap<&TableName, Vec<&TableName>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&TableName, usize> = BTreeMap::new();

    for (table, _) in tables {
        in_degree.entry(table).or_insert(0);
    }

    for (table, refs) in tables {
        for referenced in refs {
            if referenced == table {
                continue;
            }
            if !configured.contains(referenced) {
                return Err(PlanError::UnknownReference(
                    table.to_string(),
                    referenced.to_string(),
                ));
            }
            dependents.entry(referenced).or_default().push(table);
            *in_degree.entry(table).or_insert(0) += 1;
        }
    }

    // Kahn's algorithm; BTreeMap iteration keeps the zero-degree frontier
    // name-ordered.
    let mut queue: VecDeque<&TableName> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&t, _)| t)
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while let Some(table) = queue.pop_front() {
        order.push(table.clone());
        if let Some(deps) = dependents.get(table) {
            for &dependent in deps {
                let deg = in_degree
                    .get_mut(dependent)
                    .expect("dependent tables are pre-seeded");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != tables.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .filter(|(_, &deg)| deg > 0)
            .map(|(t, _)| t.to_string())
            .collect();
        return Err(PlanError::CircularDependency(stuck.join(", ")));
    }

    Ok(order)
}
