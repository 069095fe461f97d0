//! Opening the configured store and shared command plumbing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;
use vaultmark_core::{
    Category, DecryptedBookmark, JsonDirStore, Library, LibrarySettings, PasswordPurpose,
    PersistentStore, SqliteStore, VaultError,
};

use crate::cli::Cli;
use crate::config::{default_config_path, default_store_path, read_config, Backend};
use crate::errors::CliError;
use crate::prompt::{TerminalPrompts, MAX_ATTEMPTS};

/// An opened library plus the prompts commands hand to it.
pub struct App {
    pub library: Library,
    pub prompts: TerminalPrompts,
    pub store_path: PathBuf,
}

pub fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(PathBuf::from(path)),
        None => default_config_path(),
    }
}

/// Guess the backend of a store given only by path.
pub fn backend_for_path(path: &Path) -> Backend {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db" | "sqlite" | "sqlite3") => Backend::Sqlite,
        _ => Backend::Json,
    }
}

pub fn open_store(path: &Path, backend: Backend) -> anyhow::Result<Arc<dyn PersistentStore>> {
    Ok(match backend {
        Backend::Json => Arc::new(JsonDirStore::open(path)?),
        Backend::Sqlite => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteStore::open(path)?)
        }
    })
}

/// Resolve store location and settings from flags and config, then open it.
///
/// `--store` (or `VAULTMARK_STORE`) wins over the config file, which wins
/// over the default data directory.
pub async fn open_app(cli: &Cli) -> anyhow::Result<App> {
    let config_path = config_path(cli)?;
    let config = if config_path.exists() {
        Some(read_config(&config_path)?)
    } else {
        None
    };

    let (store_path, backend) = match (&cli.store, &config) {
        (Some(path), Some(config)) if Path::new(path) == Path::new(&config.store.path) => {
            (PathBuf::from(path), config.store.backend)
        }
        (Some(path), _) => (PathBuf::from(path), backend_for_path(Path::new(path))),
        (None, Some(config)) => (PathBuf::from(&config.store.path), config.store.backend),
        (None, None) => (default_store_path(Backend::Json)?, Backend::Json),
    };

    if !store_path.exists() {
        return Err(CliError::not_found(
            format!("No store found at {}", store_path.display()),
            "Run `vaultmark init` to create one.",
        )
        .into());
    }

    let settings = match &config {
        Some(config) => config.library_settings()?,
        None => LibrarySettings::default(),
    };

    tracing::debug!(path = %store_path.display(), ?backend, "opening store");
    let library = Library::new(open_store(&store_path, backend)?, settings);
    library.initialize().await?;

    Ok(App {
        library,
        prompts: TerminalPrompts::new(cli.yes),
        store_path,
    })
}

impl App {
    pub async fn find_category(&self, selector: &str) -> anyhow::Result<Category> {
        Ok(self.library.find_category(selector).await?)
    }

    /// Readable bookmarks of a category, prompting for its password when
    /// protected. A mistyped password may be retried at the terminal.
    pub async fn unlock(&self, category: &Category) -> anyhow::Result<Vec<DecryptedBookmark>> {
        let mut attempts = 0;
        loop {
            match self.library.unlock_with(category.id, &self.prompts).await {
                Err(VaultError::Authentication)
                    if self.prompts.can_retry(PasswordPurpose::Unlock)
                        && attempts + 1 < MAX_ATTEMPTS =>
                {
                    attempts += 1;
                    eprintln!(
                        "Incorrect password. {} attempt(s) remaining.",
                        MAX_ATTEMPTS - attempts
                    );
                }
                other => return Ok(other?),
            }
        }
    }

    /// Resolve full bookmark ids or unique prefixes.
    pub async fn resolve_bookmark_ids(&self, selectors: &[String]) -> anyhow::Result<Vec<Uuid>> {
        let collections = self.library.repository().load().await?;
        let known: Vec<Uuid> = collections.bookmarks.iter().map(|b| b.id).collect();
        selectors
            .iter()
            .map(|selector| resolve_id(&known, selector))
            .collect()
    }
}

fn resolve_id(known: &[Uuid], selector: &str) -> anyhow::Result<Uuid> {
    let selector = selector.trim().to_lowercase();
    if let Ok(id) = Uuid::parse_str(&selector) {
        return Ok(id);
    }
    if selector.len() < 4 {
        return Err(CliError::invalid_input(format!(
            "Id prefix {:?} is too short; use at least 4 characters",
            selector
        ))
        .into());
    }
    let matches: Vec<&Uuid> = known
        .iter()
        .filter(|id| id.to_string().starts_with(&selector))
        .collect();
    match matches.as_slice() {
        [id] => Ok(**id),
        [] => Err(CliError::not_found(
            format!("No bookmark matches {}", selector),
            "Run `vaultmark show <CATEGORY>` to see bookmark ids.",
        )
        .into()),
        _ => Err(CliError::invalid_input(format!(
            "Id prefix {} matches {} bookmarks",
            selector,
            matches.len()
        ))
        .into()),
    }
}
