mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use vaultmark_core::crypto::AeadCipher;
use vaultmark_core::storage::{Collections, PersistentStore, StoreMap, BOOKMARKS_KEY};
use vaultmark_core::{
    AddOutcome, LockState, PasswordAdvice, PasswordChange, PasswordPurpose, VaultError,
};

use common::*;

fn urls(records: &[vaultmark_core::DecryptedBookmark]) -> BTreeSet<(String, String)> {
    records
        .iter()
        .map(|r| (r.url.clone(), r.title.clone()))
        .collect()
}

fn expected_ab() -> BTreeSet<(String, String)> {
    [
        ("https://example.com/a".to_string(), "Page A".to_string()),
        ("https://example.com/b".to_string(), "Page B".to_string()),
    ]
    .into_iter()
    .collect()
}

/// Either fully protected or fully unprotected.
fn assert_exclusive(collections: &Collections) {
    for category in &collections.categories {
        for bookmark in collections.bookmarks_in(category.id) {
            assert_eq!(
                bookmark.is_sealed(),
                category.is_protected(),
                "category {} is half-migrated",
                category.name
            );
        }
    }
}

#[tokio::test]
async fn test_set_password_then_unlock_returns_originals() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    let before = library.bookmarks(category_id).await.unwrap();

    let advice = library
        .set_password(category_id, &secret("correct-horse-battery"))
        .await
        .unwrap();
    assert_eq!(advice, PasswordAdvice::Ok);

    let collections = library.repository().load().await.unwrap();
    assert!(collections.require_category(category_id).unwrap().is_protected());
    assert!(collections.bookmarks_in(category_id).all(|b| b.is_sealed()));
    assert_exclusive(&collections);

    let unlocked = library
        .unlock(category_id, &secret("correct-horse-battery"))
        .await
        .unwrap();
    assert_eq!(urls(&unlocked), expected_ab());
    assert_eq!(unlocked, before);
}

#[tokio::test]
async fn test_wrong_password_stays_locked() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library
        .set_password(category_id, &secret("correct-horse-battery"))
        .await
        .unwrap();

    let err = library
        .unlock(category_id, &secret("wrong-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Authentication));

    let category = library.find_category("example").await.unwrap();
    assert_eq!(library.locks().state(&category), LockState::Locked);
    assert!(library.locks().cached_records(category_id).is_none());
    assert!(matches!(
        library.bookmarks(category_id).await,
        Err(VaultError::Locked(_))
    ));
}

#[tokio::test]
async fn test_change_password_rekeys_category() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("old-pw")).await.unwrap();
    let salt_before = library
        .repository()
        .load()
        .await
        .unwrap()
        .require_category(category_id)
        .unwrap()
        .protection
        .clone()
        .unwrap()
        .salt;

    library
        .change_password(category_id, &secret("old-pw"), &secret("new-pw"))
        .await
        .unwrap();

    let collections = library.repository().load().await.unwrap();
    let protection = collections
        .require_category(category_id)
        .unwrap()
        .protection
        .clone()
        .unwrap();
    assert_ne!(protection.salt, salt_before);
    assert_exclusive(&collections);

    assert!(matches!(
        library.unlock(category_id, &secret("old-pw")).await,
        Err(VaultError::Authentication)
    ));
    let unlocked = library
        .unlock(category_id, &secret("new-pw"))
        .await
        .unwrap();
    assert_eq!(urls(&unlocked), expected_ab());
}

#[tokio::test]
async fn test_remove_password_restores_plaintext() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();

    library.remove_password(category_id, &secret("pw")).await.unwrap();

    let collections = library.repository().load().await.unwrap();
    let category = collections.require_category(category_id).unwrap();
    assert!(category.protection.is_none());
    assert!(collections.bookmarks_in(category_id).all(|b| !b.is_sealed()));
    assert_exclusive(&collections);

    let records = library.bookmarks(category_id).await.unwrap();
    assert_eq!(urls(&records), expected_ab());
}

#[tokio::test]
async fn test_corrupt_ciphertext_fails_unlock_without_caching() {
    let (store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();

    let mut snapshot = store.snapshot();
    let bookmarks = snapshot.get_mut(BOOKMARKS_KEY).unwrap();
    let ciphertext = bookmarks[1]["ciphertext"].as_str().unwrap().to_string();
    let flipped = if ciphertext.starts_with('0') { "1" } else { "0" };
    bookmarks[1]["ciphertext"] = serde_json::Value::String(format!("{}{}", flipped, &ciphertext[1..]));
    store
        .set(StoreMap::from([(BOOKMARKS_KEY.to_string(), bookmarks.clone())]))
        .await
        .unwrap();

    let err = library.unlock(category_id, &secret("pw")).await.unwrap_err();
    assert!(matches!(err, VaultError::Decryption(_)), "got {:?}", err);
    assert!(library.locks().cached_records(category_id).is_none());

    let category = library.find_category(&category_id.to_string()).await.unwrap();
    assert_eq!(library.locks().state(&category), LockState::Locked);
}

#[tokio::test]
async fn test_lifecycle_preconditions() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;

    assert!(matches!(
        library.change_password(category_id, &secret("a"), &secret("b")).await,
        Err(VaultError::InvalidState(_))
    ));
    assert!(matches!(
        library.remove_password(category_id, &secret("a")).await,
        Err(VaultError::InvalidState(_))
    ));
    assert!(matches!(
        library.set_password(category_id, &secret("  ")).await,
        Err(VaultError::Validation(_))
    ));

    library.set_password(category_id, &secret("pw")).await.unwrap();
    assert!(matches!(
        library.set_password(category_id, &secret("other")).await,
        Err(VaultError::InvalidState(_))
    ));
    assert!(matches!(
        library.change_password(category_id, &secret("bad"), &secret("new")).await,
        Err(VaultError::Authentication)
    ));
    assert!(matches!(
        library.remove_password(category_id, &secret("bad")).await,
        Err(VaultError::Authentication)
    ));
}

#[tokio::test]
async fn test_short_password_is_accepted_with_advice() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    let advice = library.set_password(category_id, &secret("pw")).await.unwrap();
    assert_eq!(advice, PasswordAdvice::TooShort(2));
}

#[tokio::test]
async fn test_password_change_invalidates_cache() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();
    library.unlock(category_id, &secret("pw")).await.unwrap();
    assert!(library.locks().cached_records(category_id).is_some());

    library
        .change_password(category_id, &secret("pw"), &secret("pw2"))
        .await
        .unwrap();
    assert!(library.locks().cached_records(category_id).is_none());
}

#[tokio::test]
async fn test_add_to_protected_category() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();

    // Locked: prompts, wrong password refused.
    let wrong = ScriptedCredentials::new(&[Some("nope")]);
    assert!(matches!(
        library.add_bookmark("https://example.com/c", "C", &wrong).await,
        Err(VaultError::Authentication)
    ));

    // Locked: cancelled prompt is a no-op.
    let cancel = ScriptedCredentials::new(&[None]);
    assert!(matches!(
        library.add_bookmark("https://example.com/c", "C", &cancel).await,
        Err(VaultError::Cancelled)
    ));
    assert_eq!(library.repository().load().await.unwrap().bookmarks.len(), 2);

    // Locked: right password seals the new bookmark.
    let right = ScriptedCredentials::new(&[Some("pw")]);
    let outcome = library
        .add_bookmark("https://example.com/c", "C", &right)
        .await
        .unwrap();
    assert!(matches!(outcome, AddOutcome::Added { .. }));
    assert_eq!(right.asked(), vec![PasswordPurpose::AddBookmark]);

    // Unlocked: no prompt, and the cache grows.
    library.unlock(category_id, &secret("pw")).await.unwrap();
    library
        .add_bookmark("https://example.com/d", "D", &ScriptedCredentials::none())
        .await
        .unwrap();
    let cached = library.locks().cached_records(category_id).unwrap();
    assert_eq!(cached.len(), 4);

    let collections = library.repository().load().await.unwrap();
    assert_exclusive(&collections);

    library.lock(category_id).await;
    let reopened = library.unlock(category_id, &secret("pw")).await.unwrap();
    assert_eq!(reopened.len(), 4);
}

#[tokio::test]
async fn test_duplicates_detected_across_readable_records() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;

    let again = library
        .add_bookmark("https://example.com/a", "dup", &ScriptedCredentials::none())
        .await
        .unwrap();
    assert_eq!(again, AddOutcome::AlreadyBookmarked);

    library.set_password(category_id, &secret("pw")).await.unwrap();
    library.unlock(category_id, &secret("pw")).await.unwrap();
    let again = library
        .add_bookmark("https://example.com/b", "dup", &ScriptedCredentials::none())
        .await
        .unwrap();
    assert_eq!(again, AddOutcome::AlreadyBookmarked);
}

#[tokio::test]
async fn test_manage_password_flow() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;

    // Unprotected -> set.
    let set = library
        .manage_password(
            category_id,
            &ScriptedCredentials::new(&[Some("first-password")]),
            &Answer::yes(),
        )
        .await
        .unwrap();
    assert_eq!(set, PasswordChange::Set(PasswordAdvice::Ok));

    // Protected + yes -> change.
    let changed = library
        .manage_password(
            category_id,
            &ScriptedCredentials::new(&[Some("first-password"), Some("second-password")]),
            &Answer::yes(),
        )
        .await
        .unwrap();
    assert_eq!(changed, PasswordChange::Changed(PasswordAdvice::Ok));
    library
        .unlock(category_id, &secret("second-password"))
        .await
        .unwrap();

    // Protected + no -> remove.
    let answer = Answer::no();
    let removed = library
        .manage_password(
            category_id,
            &ScriptedCredentials::new(&[Some("second-password")]),
            &answer,
        )
        .await
        .unwrap();
    assert_eq!(removed, PasswordChange::Removed);
    assert!(answer.messages.lock()[0].contains("remove"));
    assert_exclusive(&library.repository().load().await.unwrap());
}

#[tokio::test]
async fn test_manage_password_cancellation_is_noop() {
    let (store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();
    let before = store.snapshot();

    // Cancel at the current-password prompt.
    let err = library
        .manage_password(category_id, &ScriptedCredentials::new(&[None]), &Answer::yes())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    // Cancel at the new-password prompt after choosing "change".
    let err = library
        .manage_password(
            category_id,
            &ScriptedCredentials::new(&[Some("pw"), None]),
            &Answer::yes(),
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());

    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_delete_protected_category_requires_password_and_confirmation() {
    let (store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    add(&library, "https://other.org/", "Other").await;
    library.set_password(category_id, &secret("pw")).await.unwrap();
    let before = store.snapshot();

    assert!(matches!(
        library
            .delete_category(category_id, &ScriptedCredentials::new(&[Some("bad")]), &Answer::yes())
            .await,
        Err(VaultError::Authentication)
    ));

    let declined = Answer::no();
    assert!(library
        .delete_category(category_id, &ScriptedCredentials::new(&[Some("pw")]), &declined)
        .await
        .unwrap_err()
        .is_cancelled());
    assert_eq!(
        declined.messages.lock()[0],
        "Delete \"Example\" and its 2 bookmark(s)?"
    );
    assert_eq!(store.snapshot(), before);

    let removed = library
        .delete_category(category_id, &ScriptedCredentials::new(&[Some("pw")]), &Answer::yes())
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let collections = library.repository().load().await.unwrap();
    assert!(collections.category(category_id).is_none());
    assert_eq!(collections.bookmarks.len(), 1);
    assert!(!collections.domain_map.contains_key("example.com"));
    assert!(library.check_integrity().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_domain_map_survives_rename() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.rename_category(category_id, "  Work  ").await.unwrap();

    let (_, again) = add(&library, "https://example.com/c", "C").await;
    assert_eq!(again, category_id);
    assert_eq!(library.find_category("work").await.unwrap().id, category_id);
    assert!(matches!(
        library.rename_category(category_id, "   ").await,
        Err(VaultError::Validation(_))
    ));
}

#[tokio::test]
async fn test_default_category_when_auto_create_disabled() {
    let store = Arc::new(vaultmark_core::MemoryStore::new());
    let settings = vaultmark_core::LibrarySettings {
        auto_create_categories: false,
        default_category_name: "Inbox".to_string(),
        ..fast_settings()
    };
    let library = vaultmark_core::Library::with_cipher(store, settings, Arc::new(AeadCipher));
    library.initialize().await.unwrap();

    let (_, first) = add(&library, "https://one.example/", "One").await;
    let (_, second) = add(&library, "https://two.example/", "Two").await;
    assert_eq!(first, second);

    let categories = library.categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Inbox");
    assert_eq!(categories[0].bookmark_count, 2);
}

#[tokio::test]
async fn test_search_skips_locked_categories() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    add(&library, "https://rust-lang.org/learn", "Learn Rust").await;
    library.set_password(category_id, &secret("pw")).await.unwrap();

    let hits = library.search("PAGE").await.unwrap();
    assert!(hits.is_empty());
    assert_eq!(library.search("rust").await.unwrap().len(), 1);

    library.unlock(category_id, &secret("pw")).await.unwrap();
    assert_eq!(library.search("page").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_bookmarks_updates_cache() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();
    let records = library.unlock(category_id, &secret("pw")).await.unwrap();

    let confirmation = Answer::yes();
    let removed = library
        .delete_bookmarks(&[records[0].id], &confirmation)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(confirmation.messages.lock()[0], "Delete 1 selected bookmark(s)?");
    assert_eq!(library.locks().cached_records(category_id).unwrap().len(), 1);

    assert!(matches!(
        library.delete_bookmarks(&[records[0].id], &Answer::yes()).await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_bookmarks_declined_is_noop() {
    let (store, library) = memory_library().await;
    let (first, _) = add(&library, "https://example.com/a", "Page A").await;
    let (second, _) = add(&library, "https://other.org/", "Other").await;
    let before = store.snapshot();

    let declined = Answer::no();
    let err = library
        .delete_bookmarks(&[first, second], &declined)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(*declined.messages.lock(), vec!["Delete 2 selected bookmark(s)?".to_string()]);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_delete_bookmarks_in_locked_category_rejected() {
    let (store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    let (plain, _) = add(&library, "https://other.org/", "Other").await;
    library.set_password(category_id, &secret("pw")).await.unwrap();
    let sealed: Vec<_> = library
        .repository()
        .load()
        .await
        .unwrap()
        .bookmarks_in(category_id)
        .map(|b| b.id)
        .collect();
    assert_eq!(sealed.len(), 2);
    let before = store.snapshot();

    // A locked owner blocks the whole batch, unprotected ids included.
    let confirmation = Answer::yes();
    let mut ids = sealed.clone();
    ids.push(plain);
    assert!(matches!(
        library.delete_bookmarks(&ids, &confirmation).await,
        Err(VaultError::Locked(name)) if name == "Example"
    ));
    assert!(confirmation.messages.lock().is_empty());
    assert_eq!(store.snapshot(), before);

    library.unlock(category_id, &secret("pw")).await.unwrap();
    assert_eq!(library.delete_bookmarks(&ids, &confirmation).await.unwrap(), 3);
    assert!(library.repository().load().await.unwrap().bookmarks.is_empty());
}

#[tokio::test]
async fn test_unlock_with_prompts_once() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw")).await.unwrap();

    let credentials = ScriptedCredentials::new(&[Some("pw")]);
    library.unlock_with(category_id, &credentials).await.unwrap();
    library.unlock_with(category_id, &credentials).await.unwrap();
    assert_eq!(credentials.asked(), vec![PasswordPurpose::Unlock]);

    library.lock_all().await;
    let cancelled = library
        .unlock_with(category_id, &ScriptedCredentials::new(&[None]))
        .await
        .unwrap_err();
    assert!(cancelled.is_cancelled());
}

#[tokio::test]
async fn test_concurrent_changes_are_serialized() {
    let (_store, library) = memory_library().await;
    let category_id = category_with_two(&library).await;
    library.set_password(category_id, &secret("pw-0")).await.unwrap();
    let library = Arc::new(library);

    let first = {
        let library = library.clone();
        tokio::spawn(async move {
            library
                .change_password(category_id, &secret("pw-0"), &secret("pw-a"))
                .await
        })
    };
    let second = {
        let library = library.clone();
        tokio::spawn(async move {
            library
                .change_password(category_id, &secret("pw-0"), &secret("pw-b"))
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one change wins: {:?}", results);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(VaultError::Authentication))));

    let winner = if library.unlock(category_id, &secret("pw-a")).await.is_ok() {
        "pw-a"
    } else {
        "pw-b"
    };
    let records = library.unlock(category_id, &secret(winner)).await.unwrap();
    assert_eq!(urls(&records), expected_ab());
    assert_exclusive(&library.repository().load().await.unwrap());
}
