mod common;

use std::fs;
use std::sync::Arc;

use tempfile::tempdir;
use vaultmark_core::crypto::AeadCipher;
use vaultmark_core::storage::{JsonDirStore, PersistentStore, SqliteStore};
use vaultmark_core::{LockState, VaultError};

use common::*;

async fn protect_and_reopen(open_store: impl Fn() -> Arc<dyn PersistentStore>) {
    let category_id = {
        let library = library_on(open_store(), Arc::new(AeadCipher)).await;
        let id = category_with_two(&library).await;
        library.set_password(id, &secret("pw")).await.unwrap();
        id
    };

    // A fresh process starts with everything locked.
    let library = library_on(open_store(), Arc::new(AeadCipher)).await;
    let summary = library
        .categories()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.id == category_id)
        .unwrap();
    assert!(summary.protected);
    assert_eq!(summary.state, LockState::Locked);
    assert_eq!(summary.bookmark_count, 2);
    assert!(matches!(
        library.bookmarks(category_id).await,
        Err(VaultError::Locked(_))
    ));

    let records = library.unlock(category_id, &secret("pw")).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(library.check_integrity().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_json_dir_store_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();

    protect_and_reopen(|| -> Arc<dyn PersistentStore> {
        Arc::new(JsonDirStore::open(&path).unwrap())
    })
    .await;

    let on_disk = fs::read_to_string(dir.path().join("bookmarks.json")).unwrap();
    assert!(on_disk.contains("\"encrypted\": true"));
    assert!(!on_disk.contains("example.com/a"));
    assert!(!on_disk.contains("Page A"));

    let categories = fs::read_to_string(dir.path().join("categories.json")).unwrap();
    assert!(categories.contains("passwordVerifier"));
    assert!(!categories.contains("\"pw\""));
}

#[tokio::test]
async fn test_sqlite_store_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vaultmark.db");

    protect_and_reopen(|| -> Arc<dyn PersistentStore> {
        Arc::new(SqliteStore::open(&path).unwrap())
    })
    .await;

    let store = SqliteStore::open(&path).unwrap();
    let raw = store.get(&["bookmarks"]).await.unwrap();
    let text = raw["bookmarks"].to_string();
    assert!(!text.contains("Page A"));
}

#[tokio::test]
async fn test_malformed_store_surfaces_storage_error() {
    let dir = tempdir().unwrap();
    let library = library_on(
        Arc::new(JsonDirStore::open(dir.path()).unwrap()),
        Arc::new(AeadCipher),
    )
    .await;
    add(&library, "https://example.com/", "Example").await;

    // Flip a plaintext bookmark's flag without touching its fields.
    let path = dir.path().join("bookmarks.json");
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("\"encrypted\": false", "\"encrypted\": true")).unwrap();

    assert!(matches!(
        library.categories().await,
        Err(VaultError::Storage(_))
    ));
}

#[tokio::test]
async fn test_initialize_is_first_run_only() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonDirStore::open(dir.path()).unwrap());
    let library = library_on(store.clone(), Arc::new(AeadCipher)).await;
    add(&library, "https://example.com/", "Example").await;

    library.initialize().await.unwrap();
    assert_eq!(library.categories().await.unwrap().len(), 1);
    assert!(dir.path().join("domainCategoryMap.json").exists());
}
