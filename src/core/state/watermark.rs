//! Watermark model for tracking sync progress
//!
//! This module defines the watermark value stored per state key: the highest
//! processed identifier, timestamp, or opaque cursor for an entity. Re-runs
//! fetch only records beyond the watermark, and a watermark only moves
//! forward across successful load cycles.

use crate::domain::errors::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// High-water mark for one entity
///
/// Serialized untagged so the state file stays human-inspectable: integer
/// watermarks appear as JSON numbers, timestamps as RFC 3339 strings, and
/// composite cursors as plain strings.
///
/// # Examples
///
/// ```
/// use tributary::core::state::Watermark;
///
/// let id = Watermark::Id(500);
/// assert!(Watermark::Id(501).is_ahead_of(&id).unwrap());
/// assert_eq!(serde_json::to_string(&id).unwrap(), "500");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Watermark {
    /// Numeric high-water mark, e.g. a max row ID
    Id(i64),
    /// Timestamp high-water mark, e.g. a last-modified cutoff
    Timestamp(DateTime<Utc>),
    /// Opaque cursor, e.g. a type-prefixed composite order ID
    Cursor(String),
}

impl Watermark {
    /// Variant name, used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Watermark::Id(_) => "id",
            Watermark::Timestamp(_) => "timestamp",
            Watermark::Cursor(_) => "cursor",
        }
    }

    /// Compare two watermarks of the same variant
    ///
    /// Returns `None` when the variants differ; the caller decides whether
    /// that is an error (the state store treats it as one).
    pub fn try_cmp(&self, other: &Watermark) -> Option<Ordering> {
        match (self, other) {
            (Watermark::Id(a), Watermark::Id(b)) => Some(a.cmp(b)),
            (Watermark::Timestamp(a), Watermark::Timestamp(b)) => Some(a.cmp(b)),
            (Watermark::Cursor(a), Watermark::Cursor(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Whether `self` is strictly beyond `other`
    ///
    /// # Errors
    ///
    /// Returns [`StateError::WatermarkTypeMismatch`] when the variants differ.
    pub fn is_ahead_of(&self, other: &Watermark) -> Result<bool, StateError> {
        self.try_cmp(other)
            .map(|ord| ord == Ordering::Greater)
            .ok_or_else(|| StateError::WatermarkTypeMismatch {
                key: String::new(),
                stored: other.kind(),
                candidate: self.kind(),
            })
    }

    /// Build a watermark from a batch column value, where possible
    ///
    /// Integers become [`Watermark::Id`], timestamps become
    /// [`Watermark::Timestamp`], text becomes [`Watermark::Cursor`]. Other
    /// value types carry no usable ordering and yield `None`.
    pub fn from_scalar(value: &crate::domain::ScalarValue) -> Option<Watermark> {
        use crate::domain::ScalarValue;
        match value {
            ScalarValue::Int(v) => Some(Watermark::Id(*v)),
            ScalarValue::Timestamp(v) => Some(Watermark::Timestamp(*v)),
            ScalarValue::Text(v) => Some(Watermark::Cursor(v.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watermark::Id(v) => write!(f, "{}", v),
            Watermark::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Watermark::Cursor(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Watermark {
    fn from(v: i64) -> Self {
        Watermark::Id(v)
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(v: DateTime<Utc>) -> Self {
        Watermark::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScalarValue;

    #[test]
    fn test_id_ordering() {
        assert!(Watermark::Id(501).is_ahead_of(&Watermark::Id(500)).unwrap());
        assert!(!Watermark::Id(500).is_ahead_of(&Watermark::Id(500)).unwrap());
        assert!(!Watermark::Id(499).is_ahead_of(&Watermark::Id(500)).unwrap());
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Watermark::Timestamp("2024-01-01T00:00:00Z".parse().unwrap());
        let later = Watermark::Timestamp("2024-06-01T00:00:00Z".parse().unwrap());
        assert!(later.is_ahead_of(&earlier).unwrap());
    }

    #[test]
    fn test_cursor_ordering() {
        let a = Watermark::Cursor("POS-100".to_string());
        let b = Watermark::Cursor("POS-099".to_string());
        assert!(a.is_ahead_of(&b).unwrap());
    }

    #[test]
    fn test_mismatched_variants_error() {
        let id = Watermark::Id(5);
        let cursor = Watermark::Cursor("POS-5".to_string());
        assert!(id.is_ahead_of(&cursor).is_err());
    }

    #[test]
    fn test_serde_untagged_round_trip() {
        let id = Watermark::Id(500);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "500");
        let back: Watermark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let ts = Watermark::Timestamp("2024-03-15T10:30:00Z".parse().unwrap());
        let json = serde_json::to_string(&ts).unwrap();
        let back: Watermark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);

        let cursor = Watermark::Cursor("DS-4412".to_string());
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"DS-4412\"");
        let back: Watermark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn test_non_timestamp_string_stays_cursor() {
        // A plain string that doesn't parse as RFC 3339 must deserialize as a
        // cursor, not fail on the timestamp variant.
        let back: Watermark = serde_json::from_str("\"POS-882\"").unwrap();
        assert_eq!(back, Watermark::Cursor("POS-882".to_string()));
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(
            Watermark::from_scalar(&ScalarValue::Int(9)),
            Some(Watermark::Id(9))
        );
        assert_eq!(
            Watermark::from_scalar(&ScalarValue::from("POS-1")),
            Some(Watermark::Cursor("POS-1".to_string()))
        );
        assert_eq!(Watermark::from_scalar(&ScalarValue::Bool(true)), None);
        assert_eq!(Watermark::from_scalar(&ScalarValue::Null), None);
    }
}
