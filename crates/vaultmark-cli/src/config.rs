use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vaultmark_core::{KdfParams, LibrarySettings};

use crate::constants::APP_DIR;

#[derive(Debug, Serialize, Deserialize)]
pub struct VaultmarkConfig {
    pub store: StoreSection,
    #[serde(default)]
    pub library: LibrarySection,
    #[serde(default)]
    pub kdf: KdfSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: String,
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LibrarySection {
    pub auto_create_categories: bool,
    pub default_category_name: String,
}

impl Default for LibrarySection {
    fn default() -> Self {
        let defaults = LibrarySettings::default();
        Self {
            auto_create_categories: defaults.auto_create_categories,
            default_category_name: defaults.default_category_name,
        }
    }
}

/// Argon2id work factor for newly protected categories.
#[derive(Debug, Serialize, Deserialize)]
pub struct KdfSection {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfSection {
    fn default() -> Self {
        let defaults = KdfParams::default();
        Self {
            memory_kib: defaults.memory_kib,
            iterations: defaults.iterations,
            parallelism: defaults.parallelism,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One JSON file per collection in a directory
    #[default]
    Json,
    /// Single SQLite database file
    Sqlite,
}

impl VaultmarkConfig {
    pub fn new(store_path: PathBuf, backend: Backend) -> Self {
        Self {
            store: StoreSection {
                path: store_path.to_string_lossy().to_string(),
                backend,
            },
            library: LibrarySection::default(),
            kdf: KdfSection::default(),
        }
    }

    pub fn library_settings(&self) -> anyhow::Result<LibrarySettings> {
        let kdf = KdfParams::new(self.kdf.memory_kib, self.kdf.iterations, self.kdf.parallelism)?;
        Ok(LibrarySettings {
            auto_create_categories: self.library.auto_create_categories,
            default_category_name: self.library.default_category_name.clone(),
            kdf,
        })
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_store_path(backend: Backend) -> anyhow::Result<PathBuf> {
    let data = xdg_data_dir()?;
    Ok(match backend {
        Backend::Json => data.join("store"),
        Backend::Sqlite => data.join("vaultmark.db"),
    })
}

pub fn read_config(path: &Path) -> anyhow::Result<VaultmarkConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &VaultmarkConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"])
}

fn xdg_dir(var: &str, fallback: &[&str]) -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    let mut dir = home_dir()?;
    dir.extend(fallback);
    Ok(dir.join(APP_DIR))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: VaultmarkConfig = toml::from_str("[store]\npath = \"/tmp/store\"\n").unwrap();
        assert_eq!(config.store.backend, Backend::Json);
        assert!(config.library.auto_create_categories);

        let settings = config.library_settings().unwrap();
        assert_eq!(settings.kdf, KdfParams::default());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = VaultmarkConfig::new(PathBuf::from("/data/vaultmark.db"), Backend::Sqlite);
        config.kdf.memory_kib = 1024;
        config.kdf.iterations = 1;
        write_config(&path, &config).unwrap();

        let read = read_config(&path).unwrap();
        assert_eq!(read.store.backend, Backend::Sqlite);
        assert_eq!(read.store.path, "/data/vaultmark.db");
        assert_eq!(read.library_settings().unwrap().kdf.memory_kib, 1024);
    }

    #[test]
    fn test_invalid_kdf_section_is_rejected() {
        let config: VaultmarkConfig =
            toml::from_str("[store]\npath = \"x\"\n[kdf]\nmemory_kib = 1\niterations = 0\nparallelism = 1\n")
                .unwrap();
        assert!(config.library_settings().is_err());
    }
}
