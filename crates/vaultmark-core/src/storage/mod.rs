//! Persistence for categories and bookmarks.
//!
//! ## Architecture
//!
//! The storage layer has two halves:
//! - [`PersistentStore`]: a whole-collection key/value surface (`get`/`set`)
//!   implemented by the backends below
//! - [`Repository`]: the single commit abstraction on top of it. Every
//!   mutation is a read-modify-write under one lock, and multi-key commits
//!   are ordered so the `categories` collection is written last
//!
//! Backends:
//! - [`MemoryStore`]: in-process map, jointly atomic
//! - [`JsonDirStore`]: one JSON file per key, each replaced via temp file + rename
//! - [`SqliteStore`]: key/value table, every `set` in one transaction

pub mod json_dir;
pub mod memory;
pub mod records;
pub mod repository;
pub mod sqlite;
pub mod traits;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
pub use repository::{Collections, Repository};
pub use sqlite::SqliteStore;
pub use traits::{PersistentStore, StoreMap, BOOKMARKS_KEY, CATEGORIES_KEY, DOMAIN_MAP_KEY};
