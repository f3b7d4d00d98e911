//! Configuration file parsing (typeforge.toml)

use crate::hooks::HookFailurePolicy;
use crate::references::{DedupPolicy, ScanOptions};
use crate::services::LoadMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use typeforge_engine::MODULE_EXTENSION;

/// Default configuration file name
pub const CONFIG_FILE: &str = "typeforge.toml";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    pub references: ReferencesConfig,
    pub compile: CompileConfig,
    pub load: LoadConfig,
    pub hooks: HooksConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferencesConfig {
    /// Directory scanned for modules (default: the executable's directory)
    pub directory: Option<PathBuf>,
    pub extension: String,
    pub dedup: DedupPolicy,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            directory: None,
            extension: MODULE_EXTENSION.to_string(),
            dedup: DedupPolicy::default(),
        }
    }
}

impl ReferencesConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            directory: self.directory.clone(),
            extension: self.extension.trim_start_matches('.').to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub warnings_as_errors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub mode: LoadMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HooksConfig {
    pub failure: HookFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: crate::logging::DEFAULT_FILTER.to_string(),
        }
    }
}

impl ForgeConfig {
    /// Parse a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ForgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `typeforge.toml` from `dir` if present, otherwise the defaults.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let extension = self.references.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigError::Invalid("references.extension must not be empty".to_string()));
        }
        if extension.contains(['/', '\\', '.']) {
            return Err(ConfigError::Invalid(format!(
                "references.extension '{}' must be a single extension",
                self.references.extension
            )));
        }
        if let Some(dir) = &self.references.directory {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("references.directory must not be empty".to_string()));
            }
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log.filter must not be empty".to_string()));
        }
        Ok(())
    }
}
