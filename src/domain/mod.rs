//! Domain models and types for tributary.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TableName`], [`ColumnName`], [`StateKey`])
//! - **The batch record set** ([`RecordBatch`], [`ScalarValue`])
//! - **Error types** ([`SyncError`], [`WarehouseError`], [`StateError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so table names, column names and state
//! keys cannot be mixed, and so SQL statement builders can rely on names
//! having been validated at construction:
//!
//! ```
//! use tributary::domain::{TableName, ColumnName};
//!
//! # fn example() -> Result<(), String> {
//! let table = TableName::new("dim_products")?;
//! let column = ColumnName::new("category_id")?;
//!
//! // This won't compile - type safety prevents mixing identifiers
//! // let wrong: TableName = column;  // Compile error!
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`](Result). The
//! error taxonomy (transient / referential / schema / state) is carried on
//! the error types themselves so callers route failures without inspecting
//! message strings.

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{StateError, SyncError, WarehouseError};
pub use ids::{ColumnName, StateKey, TableName};
pub use record::{RecordBatch, ScalarValue};
pub use result::Result;
