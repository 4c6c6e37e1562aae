//! Persisted sync-state store
//!
//! This module provides the durable key/value store of progress markers. The
//! full mapping is loaded once at startup, mutated in memory by the sync
//! coordinator, and persisted wholesale at checkpoints. Writes go to a
//! temporary file which is renamed over the target, so a concurrent reader
//! never observes a partially written state file.

use crate::core::state::watermark::Watermark;
use crate::domain::errors::StateError;
use crate::domain::ids::StateKey;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable store of per-entity watermarks
///
/// # Examples
///
/// ```no_run
/// use tributary::core::state::{SyncStateStore, Watermark};
/// use tributary::domain::StateKey;
///
/// # fn example() -> Result<(), tributary::domain::StateError> {
/// let mut store = SyncStateStore::load("state/tributary_state.json")?;
/// let key = StateKey::new("max_pos_order_id").unwrap();
///
/// let current = store.get(&key, Watermark::Id(0));
/// store.advance(&key, Watermark::Id(500))?;
/// store.save()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    state: BTreeMap<StateKey, Watermark>,
}

impl SyncStateStore {
    /// Create an empty store bound to a path, without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: BTreeMap::new(),
        }
    }

    /// Load the store from its file
    ///
    /// A missing file is not an error: the store starts empty, matching a
    /// first run against a fresh warehouse.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No state file found, starting empty");
            return Ok(Self::new(path));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| StateError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let state: BTreeMap<StateKey, Watermark> = serde_json::from_str(&contents)
            .map_err(|e| StateError::Serialization(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            keys = state.len(),
            "Loaded sync state"
        );

        Ok(Self { path, state })
    }

    /// Return the watermark for a key, or the supplied default when absent
    ///
    /// Absence is not an error.
    pub fn get(&self, key: &StateKey, default: Watermark) -> Watermark {
        self.state.get(key).cloned().unwrap_or(default)
    }

    /// Return the watermark for a key, if present
    pub fn get_opt(&self, key: &StateKey) -> Option<&Watermark> {
        self.state.get(key)
    }

    /// Set a watermark unconditionally
    ///
    /// No side effect until [`save`](Self::save) is called. Used for
    /// bootstrap values; normal progress goes through
    /// [`advance`](Self::advance), which enforces monotonicity.
    pub fn set(&mut self, key: StateKey, value: Watermark) {
        self.state.insert(key, value);
    }

    /// Advance a watermark, keeping the maximum of current and candidate
    ///
    /// Returns whether the stored value moved. An absent key always advances.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::WatermarkTypeMismatch`] when the candidate's
    /// variant differs from the stored one.
    pub fn advance(&mut self, key: &StateKey, candidate: Watermark) -> Result<bool, StateError> {
        match self.state.get(key) {
            None => {
                self.state.insert(key.clone(), candidate);
                Ok(true)
            }
            Some(current) => {
                let ahead =
                    candidate
                        .is_ahead_of(current)
                        .map_err(|_| StateError::WatermarkTypeMismatch {
                            key: key.to_string(),
                            stored: current.kind(),
                            candidate: candidate.kind(),
                        })?;
                if ahead {
                    tracing::debug!(
                        key = %key,
                        from = %current,
                        to = %candidate,
                        "Advancing watermark"
                    );
                    self.state.insert(key.clone(), candidate);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Persist the full mapping to the state file
    ///
    /// Writes to `<path>.tmp` and renames it over the target, so readers see
    /// either the old or the new file, never a torn one.
    ///
    /// # Errors
    ///
    /// Returns an error on any filesystem or encoding failure; the caller
    /// decides whether to abort the run or continue un-checkpointed.
    pub fn save(&self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StateError::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let encoded = serde_json::to_string_pretty(&self.state)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, encoded)
            .map_err(|e| StateError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            StateError::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %self.path.display(),
            keys = self.state.len(),
            "Sync state saved"
        );
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate over all keys and watermarks, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &Watermark)> {
        self.state.iter()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// True when no keys are tracked
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(s: &str) -> StateKey {
        StateKey::new(s).unwrap()
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = SyncStateStore::load(dir.path().join("state.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.get(&key("max_pos_id"), Watermark::Id(0)),
            Watermark::Id(0)
        );
    }

    #[test]
    fn test_set_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut store = SyncStateStore::load(&path).unwrap();
        store.set(key("max_pos_id"), Watermark::Id(500));
        store.save().unwrap();

        let reloaded = SyncStateStore::load(&path).unwrap();
        assert_eq!(
            reloaded.get(&key("max_pos_id"), Watermark::Id(0)),
            Watermark::Id(500)
        );
    }

    #[test]
    fn test_advance_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::new(dir.path().join("state.json"));

        assert!(store.advance(&key("max_id"), Watermark::Id(100)).unwrap());
        assert!(store.advance(&key("max_id"), Watermark::Id(200)).unwrap());
        // A lower candidate never moves the stored value backwards.
        assert!(!store.advance(&key("max_id"), Watermark::Id(150)).unwrap());
        assert_eq!(
            store.get(&key("max_id"), Watermark::Id(0)),
            Watermark::Id(200)
        );
    }

    #[test]
    fn test_advance_rejects_variant_change() {
        let dir = TempDir::new().unwrap();
        let mut store = SyncStateStore::new(dir.path().join("state.json"));
        store.set(key("orders"), Watermark::Id(10));

        let err = store
            .advance(&key("orders"), Watermark::Cursor("POS-11".to_string()))
            .unwrap_err();
        assert!(matches!(err, StateError::WatermarkTypeMismatch { .. }));
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut store = SyncStateStore::new(&path);
        store.set(key("k"), Watermark::Id(1));
        store.save().unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/state.json");
        let mut store = SyncStateStore::new(&path);
        store.set(key("k"), Watermark::Id(1));
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_mixed_watermark_kinds_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut store = SyncStateStore::new(&path);
        store.set(key("max_promotion_id"), Watermark::Id(42));
        store.set(
            key("customers_synced_at"),
            Watermark::Timestamp("2024-03-15T10:30:00Z".parse().unwrap()),
        );
        store.set(key("last_order"), Watermark::Cursor("DS-991".to_string()));
        store.save().unwrap();

        let reloaded = SyncStateStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(
            reloaded.get_opt(&key("last_order")),
            Some(&Watermark::Cursor("DS-991".to_string()))
        );
        assert_eq!(
            reloaded.get_opt(&key("max_promotion_id")),
            Some(&Watermark::Id(42))
        );
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SyncStateStore::load(&path),
            Err(StateError::Serialization(_))
        ));
    }
}
