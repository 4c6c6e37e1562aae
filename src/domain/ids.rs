//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for warehouse identifiers.
//! Table and column names are validated against the SQL identifier shape at
//! construction so downstream statement builders can interpolate them safely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Checks that a name is a plain SQL identifier: leading letter or
/// underscore, then letters, digits or underscores.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Warehouse table name newtype wrapper
///
/// # Examples
///
/// ```
/// use tributary::domain::ids::TableName;
/// use std::str::FromStr;
///
/// let table = TableName::from_str("dim_products").unwrap();
/// assert_eq!(table.as_str(), "dim_products");
/// assert!(TableName::from_str("bad name; drop").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName(String);

impl TableName {
    /// Creates a new TableName from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or not a plain SQL identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        if !is_valid_identifier(&name) {
            return Err(format!(
                "Invalid table name '{}': must match [A-Za-z_][A-Za-z0-9_]*",
                name
            ));
        }
        Ok(Self(name))
    }

    /// Returns the table name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Warehouse column name newtype wrapper
///
/// Validated to the same identifier shape as [`TableName`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnName(String);

impl ColumnName {
    /// Creates a new ColumnName from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or not a plain SQL identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Column name cannot be empty".to_string());
        }
        if !is_valid_identifier(&name) {
            return Err(format!(
                "Invalid column name '{}': must match [A-Za-z_][A-Za-z0-9_]*",
                name
            ));
        }
        Ok(Self(name))
    }

    /// Returns the column name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ColumnName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sync-state key newtype wrapper
///
/// Keys the persisted watermark map, e.g. `max_pos_order_id`. Any non-empty
/// string is accepted; state keys never reach SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(String);

impl StateKey {
    /// Creates a new StateKey from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("State key cannot be empty".to_string());
        }
        Ok(Self(key))
    }

    /// Returns the state key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_table_name_valid() {
        let table = TableName::new("fact_sales_lines").unwrap();
        assert_eq!(table.as_str(), "fact_sales_lines");
        assert_eq!(table.to_string(), "fact_sales_lines");
    }

    #[test_case("dim_products", true ; "plain name")]
    #[test_case("_staging", true ; "leading underscore")]
    #[test_case("all_sales2", true ; "trailing digit")]
    #[test_case("sales; DROP TABLE x", false ; "statement injection")]
    #[test_case("sales-orders", false ; "dash")]
    #[test_case("1sales", false ; "leading digit")]
    #[test_case("", false ; "empty")]
    fn test_table_name_validation(name: &str, valid: bool) {
        assert_eq!(TableName::new(name).is_ok(), valid);
    }

    #[test]
    fn test_column_name_valid() {
        let col = ColumnName::new("promotion_id").unwrap();
        assert_eq!(col.as_str(), "promotion_id");
    }

    #[test]
    fn test_column_name_rejects_quotes() {
        assert!(ColumnName::new("id\"").is_err());
        assert!(ColumnName::new("a b").is_err());
    }

    #[test]
    fn test_state_key() {
        let key = StateKey::new("max_pos_order_id").unwrap();
        assert_eq!(key.as_str(), "max_pos_order_id");
        assert!(StateKey::new("  ").is_err());
    }
}
