//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\musicshelf\config.toml
//! - macOS: ~/Library/Application Support/musicshelf/config.toml
//! - Linux: ~/.config/musicshelf/config.toml
//!
//! The config file is human-readable and editable. Settings are loaded
//! at startup; loading never fails — a missing or unparseable file falls
//! back to defaults with a logged warning.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database and album-art storage locations
    pub storage: StorageConfig,

    /// Roon Core connection settings
    pub roon: RoonConfig,

    /// AI enrichment settings (keep separate for potential future encryption)
    pub enrichment: EnrichmentConfig,
}

/// Database and content-store locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file (empty = musicshelf.db in the data dir)
    pub database_path: Option<PathBuf>,

    /// Directory for downloaded/extracted album art (empty = data dir)
    pub art_dir: Option<PathBuf>,
}

/// Roon Core connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoonConfig {
    /// Roon Core host (IP address; mDNS discovery is not attempted)
    pub host: String,

    /// Roon Core port
    pub port: u16,
}

impl Default for RoonConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 9330,
        }
    }
}

/// AI enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Anthropic API key for credits lookups
    pub anthropic_api_key: Option<String>,

    /// Model to query
    pub model: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: "claude-sonnet-4-6".to_string(),
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("musicshelf"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Get the data directory (database, album art, Roon pairing token).
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("musicshelf")
}

impl Config {
    /// Resolved database URL for sqlx.
    pub fn db_url(&self) -> String {
        let path = self
            .storage
            .database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("musicshelf.db"));
        format!("sqlite:{}", path.display())
    }

    /// Resolved album-art directory.
    pub fn art_dir(&self) -> PathBuf {
        self.storage
            .art_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("album_art"))
    }

    /// Path of the persisted Roon pairing token.
    pub fn roon_token_path(&self) -> PathBuf {
        data_dir().join("roon_token.json")
    }
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if needed.
pub fn save(config: &Config) -> std::io::Result<()> {
    let Some(dir) = config_dir() else {
        return Err(std::io::Error::other("could not determine config directory"));
    };
    std::fs::create_dir_all(&dir)?;

    let contents =
        toml::to_string_pretty(config).map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(dir.join("config.toml"), contents)
}
