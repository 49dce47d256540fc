//! Configuration management for the Aegis dashboard core.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `AEGIS_*` environment variables (`__` separates nested keys, e.g.
//! `AEGIS_WEB__PORT=9000`).

pub mod loader;
pub mod validation;

use crate::producers::{AutoAgentSettings, GeneratorSettings};
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no API key is configured
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AegisConfig {
    pub general: GeneralConfig,
    pub store: StoreConfig,
    pub auto_agent: AutoAgentSettings,
    pub generator: GeneratorSettings,
    pub ai: AiConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// `text` or `compact`
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// AI proxy settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
        }
    }
}

impl AiConfig {
    /// Configured key, else `GEMINI_API_KEY`; blank values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(GEMINI_KEY_VAR).ok().filter(|k| !k.trim().is_empty()))
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// HTTP surface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub cors: bool,
    /// Start the auto visual agent together with the server
    pub start_auto_agent: bool,
    /// Start the real-time generator together with the server
    pub start_generator: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors: true,
            start_auto_agent: false,
            start_generator: false,
        }
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),
}

/// Configuration manager
#[derive(Debug)]
pub struct ConfigManager {
    config: AegisConfig,
    config_path: PathBuf,
    loader: loader::ConfigLoader,
    validator: validation::ConfigValidator,
}

impl ConfigManager {
    /// `<config dir>/aegis/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aegis")
            .join("config.toml")
    }

    /// Load and validate configuration. A missing file just means defaults.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = config_path.unwrap_or_else(Self::default_path);
        let loader = loader::ConfigLoader::new();
        let validator = validation::ConfigValidator::new();

        let config = loader.load(&config_path)?;
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path,
            loader,
            validator,
        })
    }

    pub fn config(&self) -> &AegisConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply a change; rejected changes leave the configuration as it was.
    pub fn update<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut AegisConfig),
    {
        let mut candidate = self.config.clone();
        updater(&mut candidate);
        self.validator.validate(&candidate)?;
        self.config = candidate;
        Ok(())
    }

    /// Write the current configuration to its file, creating directories
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.loader.save_to_file(&self.config, &self.config_path)
    }

    pub fn reset_to_default(&mut self) {
        self.config = AegisConfig::default();
    }
}
