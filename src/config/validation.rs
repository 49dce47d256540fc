//! Configuration validation.
//!
//! Reports the first violation found as [`ConfigError::ValidationError`].

use crate::config::{AegisConfig, AiConfig, ConfigError, GeneralConfig, WebConfig};
use crate::producers::{AutoAgentSettings, GeneratorSettings};
use std::collections::HashSet;

#[derive(Debug)]
pub struct ConfigValidator {
    valid_log_levels: HashSet<&'static str>,
    valid_log_formats: HashSet<&'static str>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            valid_log_levels: ["error", "warn", "warning", "info", "debug", "trace"]
                .into_iter()
                .collect(),
            valid_log_formats: ["text", "compact"].into_iter().collect(),
        }
    }

    pub fn validate(&self, config: &AegisConfig) -> Result<(), ConfigError> {
        self.validate_general(&config.general)?;
        self.validate_auto_agent(&config.auto_agent)?;
        self.validate_generator(&config.generator)?;
        self.validate_ai(&config.ai)?;
        self.validate_web(&config.web)?;

        if let Some(0) = config.store.audit_capacity {
            return Err(invalid("store.audit_capacity must be at least 1"));
        }
        Ok(())
    }

    fn validate_general(&self, general: &GeneralConfig) -> Result<(), ConfigError> {
        let level = general.log_level.to_lowercase();
        if !self.valid_log_levels.contains(level.as_str()) {
            return Err(invalid(format!(
                "Invalid log_level '{}'. Valid options are: error, warn, info, debug, trace",
                general.log_level
            )));
        }
        if !self.valid_log_formats.contains(general.log_format.as_str()) {
            return Err(invalid(format!(
                "Invalid log_format '{}'. Valid options are: text, compact",
                general.log_format
            )));
        }
        Ok(())
    }

    fn validate_auto_agent(&self, agent: &AutoAgentSettings) -> Result<(), ConfigError> {
        if !(10..=100).contains(&agent.sensitivity) {
            return Err(invalid(format!(
                "auto_agent.sensitivity must be between 10 and 100, got {}",
                agent.sensitivity
            )));
        }
        if !(500..=5000).contains(&agent.analysis_interval_ms) || agent.analysis_interval_ms % 500 != 0 {
            return Err(invalid(format!(
                "auto_agent.analysis_interval_ms must be a multiple of 500 between 500 and 5000, got {}",
                agent.analysis_interval_ms
            )));
        }
        if agent.max_detections == 0 {
            return Err(invalid("auto_agent.max_detections must be at least 1"));
        }
        Ok(())
    }

    fn validate_generator(&self, generator: &GeneratorSettings) -> Result<(), ConfigError> {
        if !(1000..=10_000).contains(&generator.frequency_ms) {
            return Err(invalid(format!(
                "generator.frequency_ms must be between 1000 and 10000, got {}",
                generator.frequency_ms
            )));
        }
        if !(10..=100).contains(&generator.intensity) {
            return Err(invalid(format!(
                "generator.intensity must be between 10 and 100, got {}",
                generator.intensity
            )));
        }
        Ok(())
    }

    fn validate_ai(&self, ai: &AiConfig) -> Result<(), ConfigError> {
        if ai.model.trim().is_empty() {
            return Err(invalid("ai.model cannot be empty"));
        }
        if !ai.endpoint.starts_with("http://") && !ai.endpoint.starts_with("https://") {
            return Err(invalid(format!(
                "ai.endpoint must be an http(s) URL, got '{}'",
                ai.endpoint
            )));
        }
        if ai.timeout_secs == 0 {
            return Err(invalid("ai.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    fn validate_web(&self, web: &WebConfig) -> Result<(), ConfigError> {
        if web.port == 0 {
            return Err(invalid("web.port cannot be 0"));
        }
        if web.host.trim().is_empty() {
            return Err(invalid("web.host cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(mutate: impl FnOnce(&mut AegisConfig)) -> Result<(), ConfigError> {
        let mut config = AegisConfig::default();
        mutate(&mut config);
        ConfigValidator::new().validate(&config)
    }

    #[test]
    fn defaults_are_valid() {
        assert!(check(|_| {}).is_ok());
    }

    #[test]
    fn ranges_are_enforced() {
        assert!(check(|c| c.auto_agent.sensitivity = 101).is_err());
        assert!(check(|c| c.auto_agent.analysis_interval_ms = 1250).is_err());
        assert!(check(|c| c.auto_agent.analysis_interval_ms = 5500).is_err());
        assert!(check(|c| c.auto_agent.analysis_interval_ms = 4500).is_ok());
        assert!(check(|c| c.auto_agent.max_detections = 0).is_err());
        assert!(check(|c| c.generator.frequency_ms = 999).is_err());
        assert!(check(|c| c.generator.intensity = 9).is_err());
        assert!(check(|c| c.web.port = 0).is_err());
        assert!(check(|c| c.store.audit_capacity = Some(0)).is_err());
    }

    #[test]
    fn log_settings_are_checked() {
        assert!(check(|c| c.general.log_level = "DEBUG".into()).is_ok());
        assert!(check(|c| c.general.log_level = "loud".into()).is_err());
        assert!(check(|c| c.general.log_format = "json".into()).is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = check(|c| c.generator.intensity = 200).unwrap_err();
        assert!(err.to_string().contains("generator.intensity"));
    }
}
