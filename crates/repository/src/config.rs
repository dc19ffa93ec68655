//! Configuration management for privfiles.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/privfiles/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::AcceptedTypes;
use crate::local::{LocalContexts, LocalFileBrowser};
use crate::mimetypes::{PixIcons, ICON_SIZES};
use crate::user::UserRepository;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("user id must be non-zero")]
    InvalidUserId,

    #[error("user context id must be non-zero")]
    InvalidContextId,

    #[error("icon_size must be one of 16, 24, 32, 48, 64, 128, 256; got {0}")]
    InvalidIconSize(u32),

    #[error("accepted_types entries must not be blank")]
    BlankAcceptedType,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for privfiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Local file store.
    pub storage: StorageConfig,

    /// The acting user.
    pub user: UserConfig,

    /// Listing behaviour.
    pub repository: RepositoryConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Local file store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the file store.
    pub root: PathBuf,
}

/// Acting user configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    /// Host user id.
    pub id: u64,

    /// Id of the user's context.
    pub context_id: u64,
}

/// Listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// File types the destination accepts (`*`, `.ext`, or a type group).
    pub accepted_types: Vec<String>,

    /// Base URL of the icon set.
    pub icon_base_url: String,

    /// Icon size in pixels.
    pub icon_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: 2,
            context_id: 5,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            accepted_types: vec!["*".to_string()],
            icon_base_url: "/pix".to_string(),
            icon_size: 32,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("privfiles")
        .join("config.toml")
}

/// Returns the default file store root.
fn default_storage_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("privfiles")
        .join("files")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - PRIVFILES_STORAGE_ROOT: Override the file store root
    /// - PRIVFILES_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("PRIVFILES_STORAGE_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding storage root from environment: {}", root);
                self.storage.root = PathBuf::from(root);
            }
        }

        if let Ok(level) = std::env::var("PRIVFILES_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user.id == 0 {
            return Err(ConfigError::InvalidUserId);
        }

        if self.user.context_id == 0 {
            return Err(ConfigError::InvalidContextId);
        }

        if !ICON_SIZES.contains(&self.repository.icon_size) {
            return Err(ConfigError::InvalidIconSize(self.repository.icon_size));
        }

        if self
            .repository
            .accepted_types
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::BlankAcceptedType);
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// The entry filter described by `accepted_types`.
    pub fn accepted_types(&self) -> AcceptedTypes {
        AcceptedTypes::parse(&self.repository.accepted_types)
    }

    /// Icon resolver described by the repository section.
    pub fn icons(&self) -> PixIcons {
        PixIcons::new(&self.repository.icon_base_url, self.repository.icon_size)
    }

    /// Build a repository over the local file store.
    pub fn local_repository(
        &self,
    ) -> UserRepository<LocalFileBrowser, LocalContexts, PixIcons, AcceptedTypes> {
        let mut contexts = LocalContexts::new();
        contexts.register_user(self.user.id, self.user.context_id);

        UserRepository::new(
            LocalFileBrowser::new(&self.storage.root),
            contexts,
            self.icons(),
        )
        .with_filter(self.accepted_types())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::IconResolver;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.root.to_string_lossy().contains("privfiles"));
        assert_eq!(config.user.id, 2);
        assert_eq!(config.user.context_id, 5);
        assert_eq!(config.repository.accepted_types, vec!["*"]);
        assert_eq!(config.repository.icon_base_url, "/pix");
        assert_eq!(config.repository.icon_size, 32);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[user]
id = 7

[logging]
level = "debug"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.user.id, 7);
        assert_eq!(config.logging.level, "debug");
        // Other values should be defaults
        assert_eq!(config.user.context_id, 5);
        assert_eq!(config.repository.icon_size, 32);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[storage]
root = "/srv/files"

[user]
id = 11
context_id = 42

[repository]
accepted_types = [".pdf", "image"]
icon_base_url = "https://example.org/pix"
icon_size = 64

[logging]
level = "trace"
file = "/var/log/privfiles.log"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.storage.root, PathBuf::from("/srv/files"));
        assert_eq!(config.user.id, 11);
        assert_eq!(config.user.context_id, 42);
        assert_eq!(config.repository.accepted_types, vec![".pdf", "image"]);
        assert_eq!(config.repository.icon_base_url, "https://example.org/pix");
        assert_eq!(config.repository.icon_size, 64);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/privfiles.log"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[user
id = 3
"#;
        let result = Config::from_toml(toml);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[repository]
icon_size = "big"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.user.id = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidUserId));

        let mut config = Config::default();
        config.user.context_id = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidContextId));

        let mut config = Config::default();
        config.repository.icon_size = 33;
        assert_eq!(config.validate(), Err(ConfigError::InvalidIconSize(33)));

        let mut config = Config::default();
        config.repository.accepted_types = vec![".pdf".to_string(), " ".to_string()];
        assert_eq!(config.validate(), Err(ConfigError::BlankAcceptedType));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("loud".to_string()))
        );
    }

    #[test]
    fn test_validate_accepts_uppercase_log_level() {
        let mut config = Config::default();
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_accepted_types_and_icons() {
        let mut config = Config::default();
        assert!(config.accepted_types().accepts_all());

        config.repository.accepted_types = vec![".pdf".to_string()];
        assert!(!config.accepted_types().accepts_all());
        assert!(config.accepted_types().accepts_filename("a.pdf"));

        config.repository.icon_size = 64;
        assert_eq!(config.icons().folder_icon(), "/pix/f/folder-64");
    }

    #[test]
    fn test_roundtrip() {
        let mut original = Config::default();
        original.user.id = 9;
        original.repository.accepted_types = vec!["document".to_string()];
        original.logging.file = Some(PathBuf::from("/tmp/privfiles.log"));

        let toml = original.to_toml().unwrap();
        let loaded = Config::from_toml(&toml).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.logging.level = "debug".to_string();
        original.storage.root = temp_dir.path().join("files");

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid [ toml").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("privfiles"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("PRIVFILES_STORAGE_ROOT", "/env/files");
        std::env::set_var("PRIVFILES_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.storage.root, PathBuf::from("/env/files"));
        assert_eq!(config.logging.level, "trace");

        std::env::remove_var("PRIVFILES_STORAGE_ROOT");
        std::env::remove_var("PRIVFILES_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("PRIVFILES_LOG_LEVEL", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "info");

        std::env::remove_var("PRIVFILES_LOG_LEVEL");
    }
}
