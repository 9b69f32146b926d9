use std::fs;
use std::path::PathBuf;

use credential_store::{credential_path, CredentialStore, CredentialStoreError};
use serde_json::json;
use tempfile::TempDir;

fn store_in_tempdir() -> (TempDir, CredentialStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = CredentialStore::new(credential_path(dir.path()));
    (dir, store)
}

fn write_raw(path: &PathBuf, value: serde_json::Value) {
    fs::create_dir_all(path.parent().expect("parent")).expect("parent dir");
    fs::write(path, value.to_string()).expect("raw credential written");
}

#[test]
fn load_returns_none_when_nothing_saved() {
    let (_dir, store) = store_in_tempdir();
    assert!(store.load().expect("missing file is not an error").is_none());
}

#[test]
fn save_then_load_returns_trimmed_identity() {
    let (_dir, store) = store_in_tempdir();

    let saved = store
        .save(" dev@example.com ", " tok-123 ")
        .expect("save should succeed");
    let loaded = store.load().expect("load").expect("credential present");

    assert_eq!(loaded, saved);
    assert_eq!(loaded.email, "dev@example.com");
    assert_eq!(loaded.token, "tok-123");
    assert_eq!(loaded.version, 1);
}

#[test]
fn save_replaces_previous_identity() {
    let (_dir, store) = store_in_tempdir();
    store.save("a@example.com", "tok-a").expect("first save");
    store.save("b@example.com", "tok-b").expect("second save");

    let loaded = store.load().expect("load").expect("credential present");
    assert_eq!(loaded.email, "b@example.com");
    assert_eq!(loaded.token, "tok-b");
}

#[test]
fn clear_reports_whether_a_file_existed() {
    let (_dir, store) = store_in_tempdir();
    assert!(!store.clear().expect("clear on empty store"));

    store.save("a@example.com", "tok").expect("save");
    assert!(store.clear().expect("clear"));
    assert!(store.load().expect("load").is_none());
}

#[test]
fn save_rejects_blank_token() {
    let (_dir, store) = store_in_tempdir();
    let error = store.save("a@example.com", "  ").expect_err("blank token");
    assert!(matches!(
        error,
        CredentialStoreError::EmptyInput { field: "token" }
    ));
}

#[test]
fn load_rejects_unsupported_version() {
    let (_dir, store) = store_in_tempdir();
    write_raw(
        &store.path().to_path_buf(),
        json!({
            "version": 2,
            "email": "a@example.com",
            "token": "tok",
            "saved_at": "2026-10-16T00:00:00Z",
        }),
    );

    let error = store.load().expect_err("version 2 must fail");
    assert!(matches!(
        error,
        CredentialStoreError::UnsupportedVersion { found: 2, .. }
    ));
}

#[test]
fn load_rejects_unknown_fields_and_garbage() {
    let (_dir, store) = store_in_tempdir();
    write_raw(
        &store.path().to_path_buf(),
        json!({
            "version": 1,
            "email": "a@example.com",
            "token": "tok",
            "saved_at": "2026-10-16T00:00:00Z",
            "refresh": "nope",
        }),
    );
    assert!(matches!(
        store.load().expect_err("unknown field"),
        CredentialStoreError::JsonParse { .. }
    ));

    fs::write(store.path(), "not json").expect("garbage written");
    assert!(matches!(
        store.load().expect_err("garbage"),
        CredentialStoreError::JsonParse { .. }
    ));
}

#[test]
fn load_rejects_bad_timestamp() {
    let (_dir, store) = store_in_tempdir();
    write_raw(
        &store.path().to_path_buf(),
        json!({
            "version": 1,
            "email": "a@example.com",
            "token": "tok",
            "saved_at": "yesterday",
        }),
    );

    assert!(matches!(
        store.load().expect_err("bad timestamp"),
        CredentialStoreError::InvalidTimestamp { .. }
    ));
}

#[test]
fn debug_output_redacts_token() {
    let (_dir, store) = store_in_tempdir();
    let saved = store.save("a@example.com", "secret-token").expect("save");
    let rendered = format!("{saved:?}");
    assert!(!rendered.contains("secret-token"));
    assert!(rendered.contains("a@example.com"));
}
