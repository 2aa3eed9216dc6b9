use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_ARCHIVE_DOWNLOAD_URL, DEFAULT_ARCHIVE_METADATA_URL, DEFAULT_ARCHIVE_TIMEOUT_SECS,
};

fn default_port() -> u16 {
    8080
}

fn default_metadata_url() -> String {
    DEFAULT_ARCHIVE_METADATA_URL.to_string()
}

fn default_download_url() -> String {
    DEFAULT_ARCHIVE_DOWNLOAD_URL.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_ARCHIVE_TIMEOUT_SECS
}

/// External archive endpoints and fetch bounds (maps to [archive] in TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL for metadata lookups, keyed by story slug
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    /// Base URL for audio downloads, templated with slug and chapter name
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// Timeout for one metadata fetch in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            metadata_url: default_metadata_url(),
            download_url: default_download_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Server configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port for the API server (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the SQLite database file (required)
    pub database_path: PathBuf,
    /// Bearer token required on mutating story endpoints (required, no default)
    pub admin_token: String,
    /// External archive settings (maps to [archive] section in TOML)
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl AppConfig {
    /// Load and validate a config file; startup fails on a missing or empty
    /// admin_token rather than falling back to an insecure default
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.admin_token.trim().is_empty() {
            return Err("admin_token must be set to a non-empty value in config".to_string());
        }
        if self.archive.fetch_timeout_secs == 0 {
            return Err("archive.fetch_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}
