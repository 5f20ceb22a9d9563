//! Annotator configuration
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional TOML
//! file, then `ANNOTATOR_*` environment variables.

use crate::error::ConfigError;
use crate::persistence::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "annotator.toml";

/// Environment variable overriding [`AnnotatorConfig::storage_dir`]
pub const ENV_STORAGE_DIR: &str = "ANNOTATOR_STORAGE_DIR";

/// Environment variable overriding [`AnnotatorConfig::export_dir`]
pub const ENV_EXPORT_DIR: &str = "ANNOTATOR_EXPORT_DIR";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Directory holding the persisted snapshot
    pub storage_dir: PathBuf,
    /// Snapshot key (file stem inside `storage_dir`)
    pub storage_key: String,
    /// Directory exports are written to
    pub export_dir: PathBuf,
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub log_filter: String,
}

impl AnnotatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With storage directory
    #[inline]
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With export directory
    #[inline]
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Parse from TOML text; missing keys take defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on malformed input or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.checked()
    }

    /// Load configuration
    ///
    /// With `path`, the file must exist. Without it, [`DEFAULT_CONFIG_FILE`]
    /// is read if present and defaults are used otherwise. Environment
    /// overrides are applied last.
    ///
    /// # Errors
    /// Returns error if a config file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        base.with_env_overrides(|key| std::env::var(key).ok()).checked()
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `ANNOTATOR_*` overrides from a variable lookup
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_STORAGE_DIR).filter(|v| !v.is_empty()) {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_EXPORT_DIR).filter(|v| !v.is_empty()) {
            self.export_dir = PathBuf::from(dir);
        }
        self
    }

    fn checked(self) -> Result<Self, ConfigError> {
        let key = self.storage_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ConfigError::InvalidValue {
                key: "storage_key".to_string(),
                reason: format!("'{}' is not usable as a file name", self.storage_key),
            });
        }
        Ok(self)
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".annotator"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            export_dir: PathBuf::from("."),
            log_filter: "info".to_string(),
        }
    }
}
