// File store and layered configuration against a temporary directory

use common::config::Settings;
use common::errors::StorageError;
use common::storage::{FileStore, KeyValueStore, STORAGE_KEY};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("nested"));

    assert!(store.get(STORAGE_KEY).unwrap().is_none());
    store.set(STORAGE_KEY, r#"{"schedules":[],"logs":[]}"#).unwrap();
    assert_eq!(
        store.get(STORAGE_KEY).unwrap().as_deref(),
        Some(r#"{"schedules":[],"logs":[]}"#)
    );
    assert!(dir.path().join("nested/medicationAlerts.json").exists());
}

#[test]
fn test_file_store_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    FileStore::new(dir.path()).set("state", "v1").unwrap();
    assert_eq!(
        FileStore::new(dir.path()).get("state").unwrap().as_deref(),
        Some("v1")
    );
}

#[test]
fn test_file_store_remove_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.set("state", "v1").unwrap();
    store.remove("state").unwrap();
    store.remove("state").unwrap();
    assert!(store.get("state").unwrap().is_none());
}

#[test]
fn test_file_store_rejects_path_like_keys() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    for key in ["../escape", "a/b", ""] {
        assert!(matches!(store.set(key, "x"), Err(StorageError::InvalidKey(_))));
    }
}

#[test]
fn test_settings_load_merges_file_over_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
[reminder]
check_interval_seconds = 15
timezone = "Europe/Berlin"

[auth]
pin = "4321"
"#,
    )
    .unwrap();

    let settings = Settings::load_from_path(dir.path()).unwrap();
    assert_eq!(settings.reminder.check_interval_seconds, 15);
    assert_eq!(settings.reminder.timezone.as_deref(), Some("Europe/Berlin"));
    assert_eq!(settings.reminder.max_log_entries, 100);
    assert_eq!(settings.auth.pin, "4321");
    assert_eq!(settings.observability.log_level, "info");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_load_without_files_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from_path(dir.path()).unwrap();
    assert_eq!(settings.reminder.tolerance_minutes, 1);
    assert!(settings.catalog.path.is_none());
}
