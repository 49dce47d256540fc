//! Configuration loading and saving utilities.

use crate::config::{AegisConfig, ConfigError};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

pub const ENV_PREFIX: &str = "AEGIS";

/// Configuration loader/saver
#[derive(Debug)]
pub struct ConfigLoader {
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::with_env_prefix(ENV_PREFIX)
    }

    /// Read environment overrides from `<prefix>_SECTION__KEY` instead of `AEGIS_…`
    pub fn with_env_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: prefix.into(),
        }
    }

    /// Defaults, then the file at `path` when it exists, then the environment.
    pub fn load(&self, path: &Path) -> Result<AegisConfig, ConfigError> {
        let settings = Config::builder()
            .add_source(Config::try_from(&AegisConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn save_to_file(&self, config: &AegisConfig, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
