use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use workbench_core::store::{TEMPLATE_KEY, VARIABLES_KEY};
use workbench_core::{FileStore, StateStore, StoreError};

#[test]
fn test_missing_file_reads_empty_and_is_created_on_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let mut store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(TEMPLATE_KEY), None);

    store.set(TEMPLATE_KEY, "{{ x }}").unwrap();
    store.set(VARIABLES_KEY, r#"{"x": 1}"#).unwrap();
    assert!(path.exists());

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get(TEMPLATE_KEY).as_deref(), Some("{{ x }}"));
    assert_eq!(reopened.get(VARIABLES_KEY).as_deref(), Some(r#"{"x": 1}"#));
}

#[test]
fn test_last_write_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut store = FileStore::open(&path).unwrap();
    store.set(TEMPLATE_KEY, "one").unwrap();
    store.set(TEMPLATE_KEY, "two").unwrap();

    assert_eq!(FileStore::open(&path).unwrap().get(TEMPLATE_KEY).as_deref(), Some("two"));
}

#[test]
fn test_blank_file_is_empty_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "  \n").unwrap();

    assert_eq!(FileStore::open(&path).unwrap().get(TEMPLATE_KEY), None);
}

#[test]
fn test_corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    assert!(matches!(FileStore::open(&path), Err(StoreError::Json(_))));
}
