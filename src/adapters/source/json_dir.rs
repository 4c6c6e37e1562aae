//! JSON drop-directory record source
//!
//! Reads one `<entity>.json` document per entity from a staging directory.
//! Extractors (or operators replaying an export) drop files there; this
//! source decodes them into record batches and applies watermark filtering
//! when the file declares which column carries the watermark.

use crate::adapters::source::RecordSource;
use crate::core::state::Watermark;
use crate::domain::ids::TableName;
use crate::domain::{RecordBatch, Result, ScalarValue, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// On-disk document shape for one entity
#[derive(Debug, Deserialize)]
struct BatchDocument {
    /// Column names, in row order
    columns: Vec<String>,
    /// Primary key column(s)
    primary_key: Vec<String>,
    /// Columns whose string values are RFC 3339 timestamps
    #[serde(default)]
    timestamp_columns: Vec<String>,
    /// Column compared against the entity watermark, when declared
    #[serde(default)]
    watermark_column: Option<String>,
    /// Row-major values
    rows: Vec<Vec<serde_json::Value>>,
}

/// Record source reading JSON documents from a staging directory
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    /// Create a source over the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn decode(
        &self,
        entity: &TableName,
        doc: BatchDocument,
        since: Option<&Watermark>,
    ) -> Result<Option<RecordBatch>> {
        let timestamp_cols: HashSet<&String> = doc.timestamp_columns.iter().collect();

        let watermark_idx = match &doc.watermark_column {
            Some(name) => Some(doc.columns.iter().position(|c| c == name).ok_or_else(|| {
                SyncError::Source(format!(
                    "{}: watermark column '{}' not among declared columns",
                    entity, name
                ))
            })?),
            None => None,
        };

        let mut rows = Vec::with_capacity(doc.rows.len());
        for (i, raw_row) in doc.rows.into_iter().enumerate() {
            if raw_row.len() != doc.columns.len() {
                return Err(SyncError::Source(format!(
                    "{}: row {} has {} values, expected {}",
                    entity,
                    i,
                    raw_row.len(),
                    doc.columns.len()
                )));
            }

            let mut row = Vec::with_capacity(raw_row.len());
            for (value, column) in raw_row.into_iter().zip(doc.columns.iter()) {
                let scalar = if timestamp_cols.contains(column) {
                    decode_timestamp(entity, column, value)?
                } else {
                    decode_scalar(entity, column, value)?
                };
                row.push(scalar);
            }

            // Watermark filtering: keep only rows strictly past the cutoff.
            if let (Some(idx), Some(since)) = (watermark_idx, since) {
                match Watermark::from_scalar(&row[idx]) {
                    Some(candidate) => {
                        let ahead = candidate.is_ahead_of(since).map_err(|_| {
                            SyncError::Source(format!(
                                "{}: watermark column value {} is not comparable to stored {} watermark",
                                entity, row[idx], since.kind()
                            ))
                        })?;
                        if !ahead {
                            continue;
                        }
                    }
                    None => {
                        return Err(SyncError::Source(format!(
                            "{}: watermark column holds non-orderable value {}",
                            entity, row[idx]
                        )))
                    }
                }
            }

            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let columns: Vec<&str> = doc.columns.iter().map(String::as_str).collect();
        let primary_key: Vec<&str> = doc.primary_key.iter().map(String::as_str).collect();
        let batch = RecordBatch::new(entity.as_str(), &columns, &primary_key, rows)?;
        Ok(Some(batch))
    }
}

#[async_trait]
impl RecordSource for JsonDirSource {
    async fn fetch(
        &self,
        entity: &TableName,
        since: Option<&Watermark>,
    ) -> Result<Vec<RecordBatch>> {
        let path = self.dir.join(format!("{}.json", entity.as_str()));
        if !path.exists() {
            tracing::debug!(entity = %entity, path = %path.display(), "No staged document for entity");
            return Ok(Vec::new());
        }

        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SyncError::Source(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let doc: BatchDocument = serde_json::from_str(&contents).map_err(|e| {
            SyncError::Source(format!("Failed to decode {}: {}", path.display(), e))
        })?;

        match self.decode(entity, doc, since)? {
            Some(batch) => {
                tracing::info!(
                    entity = %entity,
                    rows = batch.len(),
                    "Staged batch loaded"
                );
                Ok(vec![batch])
            }
            None => {
                tracing::info!(entity = %entity, "Staged document has no rows past the watermark");
                Ok(Vec::new())
            }
        }
    }
}

fn decode_scalar(
    entity: &TableName,
    column: &str,
    value: serde_json::Value,
) -> Result<ScalarValue> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(ScalarValue::Null),
        Value::Bool(b) => Ok(ScalarValue::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ScalarValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(ScalarValue::Float(f))
            } else {
                Err(SyncError::Source(format!(
                    "{}.{}: number {} does not fit the scalar domain",
                    entity, column, n
                )))
            }
        }
        Value::String(s) => Ok(ScalarValue::Text(s)),
        other => Err(SyncError::Source(format!(
            "{}.{}: unsupported value {}",
            entity, column, other
        ))),
    }
}

fn decode_timestamp(
    entity: &TableName,
    column: &str,
    value: serde_json::Value,
) -> Result<ScalarValue> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(ScalarValue::Null),
        Value::String(s) => {
            let ts: DateTime<Utc> = s.parse().map_err(|e| {
                SyncError::Source(format!(
                    "{}.{}: invalid timestamp '{}': {}",
                    entity, column, s, e
                ))
            })?;
            Ok(ScalarValue::Timestamp(ts))
        }
        other => Err(SyncError::Source(format!(
            "{}.{}: expected timestamp string, got {}",
            entity, column, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entity(name: &str) -> TableName {
        TableName::new(name).unwrap()
    }

    fn write_doc(dir: &TempDir, name: &str, body: &str) {
        fs::write(dir.path().join(format!("{name}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_yields_no_batches() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirSource::new(dir.path());
        let batches = source.fetch(&entity("dim_products"), None).await.unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn test_decodes_scalars_and_timestamps() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir,
            "dim_products",
            r#"{
                "columns": ["id", "name", "active", "price", "updated_at"],
                "primary_key": ["id"],
                "timestamp_columns": ["updated_at"],
                "rows": [
                    [1, "Aspirin", true, 9.5, "2024-03-15T10:30:00Z"],
                    [2, null, false, 3, null]
                ]
            }"#,
        );

        let source = JsonDirSource::new(dir.path());
        let batches = source.fetch(&entity("dim_products"), None).await.unwrap();
        assert_eq!(batches.len(), 1);

        let batch = &batches[0];
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[0][0], ScalarValue::Int(1));
        assert_eq!(batch.rows()[0][3], ScalarValue::Float(9.5));
        assert!(matches!(batch.rows()[0][4], ScalarValue::Timestamp(_)));
        assert_eq!(batch.rows()[1][1], ScalarValue::Null);
        assert_eq!(batch.rows()[1][3], ScalarValue::Int(3));
    }

    #[tokio::test]
    async fn test_watermark_filtering() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir,
            "all_sales",
            r#"{
                "columns": ["id", "total"],
                "primary_key": ["id"],
                "watermark_column": "id",
                "rows": [[100, 5.0], [500, 7.5], [501, 1.0], [600, 2.0]]
            }"#,
        );

        let source = JsonDirSource::new(dir.path());
        let batches = source
            .fetch(&entity("all_sales"), Some(&Watermark::Id(500)))
            .await
            .unwrap();

        assert_eq!(batches.len(), 1);
        let ids: Vec<&ScalarValue> = batches[0].rows().iter().map(|r| &r[0]).collect();
        assert_eq!(ids, vec![&ScalarValue::Int(501), &ScalarValue::Int(600)]);
    }

    #[tokio::test]
    async fn test_all_rows_behind_watermark() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir,
            "all_sales",
            r#"{
                "columns": ["id"],
                "primary_key": ["id"],
                "watermark_column": "id",
                "rows": [[1], [2]]
            }"#,
        );

        let source = JsonDirSource::new(dir.path());
        let batches = source
            .fetch(&entity("all_sales"), Some(&Watermark::Id(10)))
            .await
            .unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn test_watermark_type_mismatch_is_surfaced() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir,
            "all_sales",
            r#"{
                "columns": ["id"],
                "primary_key": ["id"],
                "watermark_column": "id",
                "rows": [["POS-1"]]
            }"#,
        );

        let source = JsonDirSource::new(dir.path());
        let err = source
            .fetch(&entity("all_sales"), Some(&Watermark::Id(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Source(_)));
    }

    #[tokio::test]
    async fn test_ragged_document_is_source_error() {
        let dir = TempDir::new().unwrap();
        write_doc(
            &dir,
            "dim_products",
            r#"{
                "columns": ["id", "name"],
                "primary_key": ["id"],
                "rows": [[1]]
            }"#,
        );

        let source = JsonDirSource::new(dir.path());
        let err = source.fetch(&entity("dim_products"), None).await.unwrap_err();
        assert!(matches!(err, SyncError::Source(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_source_error() {
        let dir = TempDir::new().unwrap();
        write_doc(&dir, "dim_products", "{not json");
        let source = JsonDirSource::new(dir.path());
        let err = source.fetch(&entity("dim_products"), None).await.unwrap_err();
        assert!(matches!(err, SyncError::Source(_)));
    }
}
