//! Round trips and recovery paths of the JSON file store.

use chrono::{TimeZone, Utc};
use segsync_core::{Identity, MembershipSet, PersistedState};
use segsync_store::{JsonFileStore, StateStore, StoreError};
use std::fs;

fn members(ids: &[&str]) -> MembershipSet {
    ids.iter().map(|s| Identity::from(*s)).collect()
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));

    assert_eq!(store.load(), PersistedState::default());
}

#[test]
fn test_corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(&path, b"{ not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load(), PersistedState::default());
}

#[test]
fn test_wrong_shape_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(&path, br#"{"profiles": 42}"#).unwrap();

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load(), PersistedState::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));
    let stamp = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
    let state = PersistedState::new(members(&["a@x.io", "B@x.io"]), Some(stamp));

    store.save(&state).unwrap();

    assert_eq!(store.load(), state);
    assert!(!dir.path().join(".cache.json.tmp").exists());
}

#[test]
fn test_save_overwrites_previous_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));

    store
        .save(&PersistedState::new(members(&["a", "b", "c"]), None))
        .unwrap();
    store.save(&PersistedState::new(members(&["c"]), None)).unwrap();

    assert_eq!(store.load().members, members(&["c"]));
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested/deeper/cache.json"));

    store.save(&PersistedState::default()).unwrap();

    assert!(store.path().exists());
}

#[test]
fn test_save_failure_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the record should be makes the final rename fail.
    let path = dir.path().join("cache.json");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("occupied"), b"x").unwrap();

    let store = JsonFileStore::new(&path);
    let result = store.save(&PersistedState::default());

    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[test]
fn test_failed_save_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("occupied"), b"x").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(store.save(&PersistedState::default()).is_err());

    assert!(!dir.path().join(".cache.json.tmp").exists());
    // The record that was in the way is untouched.
    assert!(path.join("occupied").exists());
}

#[test]
fn test_record_with_both_member_keys_keeps_everyone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(&path, br#"{"profiles": ["a@x.io"], "members": ["a@x.io", "b@x.io"]}"#).unwrap();

    let state = JsonFileStore::new(&path).load();

    assert_eq!(state.members, members(&["a@x.io", "b@x.io"]));
}

#[test]
fn test_reads_record_written_by_legacy_tool() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(
        &path,
        br#"{
    "profiles": [
        "one@x.io",
        "two@x.io"
    ],
    "last_updated": "2025-01-15T10:11:12.345678+00:00"
}"#,
    )
    .unwrap();

    let state = JsonFileStore::new(&path).load();

    assert_eq!(state.members, members(&["one@x.io", "two@x.io"]));
    assert!(state.last_updated.is_some());
}
