#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::SecretString;
use uuid::Uuid;

use vaultmark_core::crypto::{AeadCipher, DerivedKey, RecordCipher, SealedRecord};
use vaultmark_core::model::BookmarkSecret;
use vaultmark_core::storage::{MemoryStore, PersistentStore, StoreMap};
use vaultmark_core::{
    AddOutcome, Confirmation, CredentialProvider, KdfParams, Library, LibrarySettings,
    PasswordPurpose, Result, VaultError,
};

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

pub fn fast_settings() -> LibrarySettings {
    LibrarySettings {
        kdf: KdfParams::new(1024, 1, 1).expect("fast params are valid"),
        ..LibrarySettings::default()
    }
}

/// Answers password prompts from a queue; `None` entries cancel.
#[derive(Default)]
pub struct ScriptedCredentials {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<PasswordPurpose>>,
}

impl ScriptedCredentials {
    pub fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn asked(&self) -> Vec<PasswordPurpose> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    async fn request_password(
        &self,
        purpose: PasswordPurpose,
        _category: &str,
    ) -> Result<Option<SecretString>> {
        self.asked.lock().push(purpose);
        let answer = self
            .answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected password prompt: {:?}", purpose));
        Ok(answer.map(SecretString::from))
    }
}

/// Fixed answer to every confirmation; records the messages.
pub struct Answer {
    pub yes: bool,
    pub messages: Mutex<Vec<String>>,
}

impl Answer {
    pub fn yes() -> Self {
        Self {
            yes: true,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn no() -> Self {
        Self {
            yes: false,
            messages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Confirmation for Answer {
    async fn confirm(&self, message: &str) -> bool {
        self.messages.lock().push(message.to_string());
        self.yes
    }
}

/// Cipher that starts failing after a number of successful calls.
pub struct FaultyCipher {
    inner: AeadCipher,
    seals_left: AtomicUsize,
    opens_left: AtomicUsize,
}

impl FaultyCipher {
    pub fn healthy() -> Self {
        Self {
            inner: AeadCipher,
            seals_left: AtomicUsize::new(usize::MAX),
            opens_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Let `n` more seals succeed, then fail.
    pub fn fail_seal_after(&self, n: usize) {
        self.seals_left.store(n, Ordering::SeqCst);
    }

    /// Let `n` more opens succeed, then fail.
    pub fn fail_open_after(&self, n: usize) {
        self.opens_left.store(n, Ordering::SeqCst);
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl RecordCipher for FaultyCipher {
    fn seal(&self, record: &BookmarkSecret, key: &DerivedKey) -> Result<SealedRecord> {
        if !Self::take(&self.seals_left) {
            return Err(VaultError::Crypto("injected seal failure".to_string()));
        }
        self.inner.seal(record, key)
    }

    fn open(&self, sealed: &SealedRecord, key: &DerivedKey) -> Result<BookmarkSecret> {
        if !Self::take(&self.opens_left) {
            return Err(VaultError::Decryption("injected open failure".to_string()));
        }
        self.inner.open(sealed, key)
    }
}

/// Store without atomic batches whose writes can be made to fail per key.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_key: Mutex<Option<String>>,
    pub writes: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn fail_writes_to(&self, key: &str) {
        *self.failing_key.lock() = Some(key.to_string());
    }

    pub fn heal(&self) {
        *self.failing_key.lock() = None;
    }

    pub fn snapshot(&self) -> StoreMap {
        self.inner.snapshot()
    }
}

#[async_trait]
impl PersistentStore for FlakyStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        self.inner.get(keys).await
    }

    async fn set(&self, entries: StoreMap) -> Result<()> {
        let failing = self.failing_key.lock().clone();
        if let Some(failing) = failing {
            if entries.contains_key(&failing) {
                return Err(VaultError::Storage(format!("injected write failure: {}", failing)));
            }
        }
        self.writes.lock().extend(entries.keys().cloned());
        self.inner.set(entries).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.inner.remove(keys).await
    }

    fn atomic_batches(&self) -> bool {
        false
    }
}

pub async fn library_on(store: Arc<dyn PersistentStore>, cipher: Arc<dyn RecordCipher>) -> Library {
    let library = Library::with_cipher(store, fast_settings(), cipher);
    library.initialize().await.expect("initialize");
    library
}

pub async fn memory_library() -> (Arc<MemoryStore>, Library) {
    let store = Arc::new(MemoryStore::new());
    let library = library_on(store.clone(), Arc::new(AeadCipher)).await;
    (store, library)
}

/// Save a page into an unprotected category and return the ids.
pub async fn add(library: &Library, url: &str, title: &str) -> (Uuid, Uuid) {
    match library
        .add_bookmark(url, title, &ScriptedCredentials::none())
        .await
        .expect("add bookmark")
    {
        AddOutcome::Added {
            bookmark_id,
            category_id,
        } => (bookmark_id, category_id),
        AddOutcome::AlreadyBookmarked => panic!("{} was already bookmarked", url),
    }
}

/// A category on `example.com` holding bookmarks A and B.
pub async fn category_with_two(library: &Library) -> Uuid {
    let (_, id) = add(library, "https://example.com/a", "Page A").await;
    let (_, same) = add(library, "https://example.com/b", "Page B").await;
    assert_eq!(id, same);
    id
}
