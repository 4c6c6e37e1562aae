//! Result type alias for tributary
//!
//! Provides a convenient `Result` type alias using [`SyncError`] as the error
//! type, used throughout the crate.

use crate::domain::errors::SyncError;

/// Result type alias using SyncError
///
/// # Examples
///
/// ```
/// use tributary::domain::{Result, SyncError};
///
/// fn check_chunk_size(size: usize) -> Result<usize> {
///     if size == 0 {
///         return Err(SyncError::Configuration("chunk_size must be > 0".into()));
///     }
///     Ok(size)
/// }
///
/// assert!(check_chunk_size(250).is_ok());
/// assert!(check_chunk_size(0).is_err());
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
