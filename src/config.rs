//! Configuration file parser for ~/.config/radar/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and logged as warnings.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `provider.api_key`.
pub const PROVIDER_KEY_ENV: &str = "RADAR_PROVIDER_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// Every section uses `#[serde(default)]`, so any subset of keys can be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file path. Defaults to `~/.config/radar/radar.db`.
    pub database_path: Option<PathBuf>,
    pub provider: ProviderConfig,
    pub recent: RecentConfig,
    pub bookmarks: BookmarkConfig,
}

/// Which request/response convention the trends provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiShape {
    /// `GET trends?geo=..&category=..` returning `{"trends": [...]}`
    #[default]
    Current,
    /// `GET trends?categoria=..` returning a bare array
    Legacy,
}

/// Settings for the external trends provider.
///
/// Custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL; `trends` is appended. Fetch commands fail while unset.
    pub base_url: Option<String>,
    /// Region code sent as `geo`.
    pub region: String,
    pub api_shape: ApiShape,
    pub timeout_secs: u64,
    /// Label prefixed to every normalized trend's `source`.
    pub source_label: String,
    /// Bearer token. `RADAR_PROVIDER_KEY` takes precedence.
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("api_shape", &self.api_shape)
            .field("timeout_secs", &self.timeout_secs)
            .field("source_label", &self.source_label)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            region: "BR".to_string(),
            api_shape: ApiShape::Current,
            timeout_secs: 30,
            source_label: "Google Trends API".to_string(),
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// API key from the environment, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<SecretString> {
        std::env::var(PROVIDER_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .map(SecretString::from)
    }
}

/// Defaults for the "recent trends" read.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub window_hours: u64,
    pub min_score: u8,
    pub limit: u32,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            min_score: 90,
            limit: 10,
        }
    }
}

/// What to do when a user bookmarks the same trend twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Every save creates a new row.
    #[default]
    Allow,
    /// A second save of the same trend is refused.
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookmarkConfig {
    pub duplicates: DuplicatePolicy,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = ["database_path", "provider", "recent", "bookmarks"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown top-level keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            region = %config.provider.region,
            api_shape = ?config.provider.api_shape,
            duplicates = ?config.bookmarks.duplicates,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
