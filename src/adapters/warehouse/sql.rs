//! SQL statement builders for the warehouse adapter
//!
//! All identifiers interpolated here come from [`crate::domain::ids`]
//! newtypes, which only admit plain SQL identifiers. Values always travel as
//! bind parameters.

use crate::domain::ids::{ColumnName, TableName};

/// PostgreSQL caps bind parameters per statement at u16::MAX.
pub const MAX_STATEMENT_PARAMS: usize = 65_535;

/// Build a multi-row upsert statement
///
/// One atomic `INSERT ... VALUES (...),(...) ON CONFLICT (pk) DO UPDATE`
/// statement per chunk; on conflict every non-key column takes the incoming
/// value. When all columns belong to the key there is nothing to update and
/// the conflict action degrades to `DO NOTHING`.
///
/// # Examples
///
/// ```
/// use tributary::adapters::warehouse::sql::build_upsert;
/// use tributary::domain::{TableName, ColumnName};
///
/// let table = TableName::new("dim_products").unwrap();
/// let columns = vec![
///     ColumnName::new("id").unwrap(),
///     ColumnName::new("name").unwrap(),
/// ];
/// let pk = vec![ColumnName::new("id").unwrap()];
///
/// let stmt = build_upsert(&table, &columns, &pk, 2);
/// assert!(stmt.starts_with("INSERT INTO dim_products (id, name) VALUES ($1, $2), ($3, $4)"));
/// assert!(stmt.contains("ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"));
/// ```
pub fn build_upsert(
    table: &TableName,
    columns: &[ColumnName],
    primary_key: &[ColumnName],
    row_count: usize,
) -> String {
    let column_list = join_names(columns);
    let conflict_list = join_names(primary_key);

    let width = columns.len();
    let mut values = String::new();
    for row in 0..row_count {
        if row > 0 {
            values.push_str(", ");
        }
        values.push('(');
        for col in 0..width {
            if col > 0 {
                values.push_str(", ");
            }
            values.push_str(&format!("${}", row * width + col + 1));
        }
        values.push(')');
    }

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !primary_key.contains(c))
        .map(|c| format!("{} = EXCLUDED.{}", c, c))
        .collect();

    if updates.is_empty() {
        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO NOTHING",
            table.as_str(),
            column_list,
            values,
            conflict_list
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO UPDATE SET {}",
            table.as_str(),
            column_list,
            values,
            conflict_list,
            updates.join(", ")
        )
    }
}

/// Build the existence query used by the reference resolver
///
/// Binds the candidate key set as a single array parameter.
pub fn build_existing_keys(table: &TableName, column: &ColumnName) -> String {
    format!(
        "SELECT DISTINCT {} FROM {} WHERE {} = ANY($1)",
        column.as_str(),
        table.as_str(),
        column.as_str()
    )
}

/// Build the max-ID bootstrap query for a numeric key column
pub fn build_max_id(table: &TableName, column: &ColumnName) -> String {
    format!(
        "SELECT CAST(COALESCE(MAX({}), 0) AS BIGINT) FROM {}",
        column.as_str(),
        table.as_str()
    )
}

/// Build the max-ID bootstrap query for a prefix-keyed text column
///
/// Considers only keys matching the prefix (bound as `$1` with a trailing
/// `%`) and compares the numeric tail after the prefix, supporting unioned
/// tables keyed like `POS-1017` / `DS-2044`.
pub fn build_max_id_prefixed(
    table: &TableName,
    column: &ColumnName,
    prefix_len: usize,
) -> String {
    format!(
        "SELECT COALESCE(MAX(CAST(SUBSTRING({} FROM {}) AS BIGINT)), 0) FROM {} WHERE {} LIKE $1",
        column.as_str(),
        prefix_len + 1,
        table.as_str(),
        column.as_str()
    )
}

fn join_names(names: &[ColumnName]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
