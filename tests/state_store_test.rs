//! Integration tests for the durable sync-state store

use tempfile::TempDir;
use tributary::core::state::{SyncStateStore, Watermark};
use tributary::domain::{StateError, StateKey};

fn key(s: &str) -> StateKey {
    StateKey::new(s).unwrap()
}

#[test]
fn test_fresh_store_returns_default_then_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state/tributary_state.json");

    // Empty store: get falls back to the default.
    let mut store = SyncStateStore::load(&path).unwrap();
    assert_eq!(
        store.get(&key("max_pos_id"), Watermark::Id(0)),
        Watermark::Id(0)
    );

    // Set, save, then a fresh load sees the value.
    store.set(key("max_pos_id"), Watermark::Id(500));
    store.save().unwrap();

    let reloaded = SyncStateStore::load(&path).unwrap();
    assert_eq!(
        reloaded.get(&key("max_pos_id"), Watermark::Id(0)),
        Watermark::Id(500)
    );
}

#[test]
fn test_watermark_never_decreases_across_cycles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut store = SyncStateStore::load(&path).unwrap();
    let k = key("max_promotion_id");

    // Simulate several load cycles, one of which offers a stale candidate.
    for candidate in [100i64, 250, 180, 250, 300] {
        store.advance(&k, Watermark::Id(candidate)).unwrap();
        store.save().unwrap();

        let persisted = SyncStateStore::load(&path).unwrap();
        let current = persisted.get(&k, Watermark::Id(0));
        // The persisted value is the running maximum.
        assert!(!matches!(
            current.try_cmp(&Watermark::Id(candidate)),
            Some(std::cmp::Ordering::Less)
        ));
    }

    let final_state = SyncStateStore::load(&path).unwrap();
    assert_eq!(final_state.get(&k, Watermark::Id(0)), Watermark::Id(300));
}

#[test]
fn test_state_file_is_human_inspectable_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut store = SyncStateStore::new(&path);
    store.set(key("max_pos_order_id"), Watermark::Id(1017));
    store.set(
        key("customers_synced_at"),
        Watermark::Timestamp("2024-03-15T10:30:00Z".parse().unwrap()),
    );
    store.save().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    // Plain JSON scalars, no enum tags.
    assert!(raw.contains("\"max_pos_order_id\": 1017"));
    assert!(raw.contains("customers_synced_at"));
    assert!(!raw.contains("\"Id\""));
}

#[test]
fn test_save_replaces_wholesale_without_tmp_leftovers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut store = SyncStateStore::new(&path);
    store.set(key("a"), Watermark::Id(1));
    store.set(key("b"), Watermark::Id(2));
    store.save().unwrap();

    let mut second = SyncStateStore::load(&path).unwrap();
    second.set(key("a"), Watermark::Id(10));
    second.save().unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["state.json".to_string()]);

    let reloaded = SyncStateStore::load(&path).unwrap();
    assert_eq!(reloaded.get(&key("a"), Watermark::Id(0)), Watermark::Id(10));
    assert_eq!(reloaded.get(&key("b"), Watermark::Id(0)), Watermark::Id(2));
}

#[test]
fn test_unreadable_state_is_surfaced_not_defaulted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "][").unwrap();

    match SyncStateStore::load(&path) {
        Err(StateError::Serialization(_)) => {}
        other => panic!("corrupt state must surface an error, got {other:?}"),
    }
}
