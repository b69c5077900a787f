//! Configuration loading and the model catalog for Hearth.
//!
//! Loads `config.toml` with serde defaults and environment-variable
//! overrides (`HEARTH_MODEL`, `HEARTH_MAX_TOKENS`, `HEARTH_TEMPERATURE`).
//! A missing file is not an error — every field has a default.

pub mod catalog;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use catalog::{all_models, spec, ModelId, ModelSpec, DEFAULT_MODEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which catalog model to run.
    #[serde(default = "default_model_id")]
    pub model: ModelId,

    /// Override the model's default max tokens per response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Override the model's default sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Context window to request from the inference engine.
    #[serde(default = "default_context_size")]
    pub context_size: u32,

    /// SQLite file backing the knowledge base.
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: String,
}

fn default_model_id() -> ModelId {
    DEFAULT_MODEL
}
fn default_context_size() -> u32 {
    8_192
}
fn default_knowledge_base_path() -> String {
    "knowledge_base.sqlite".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model_id(),
            max_tokens: None,
            temperature: None,
            context_size: default_context_size(),
            knowledge_base_path: default_knowledge_base_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("HEARTH_MODEL") {
            if let Ok(id) = toml::Value::String(model).try_into::<ModelId>() {
                self.model = id;
            }
        }
        if let Ok(max_tokens) = std::env::var("HEARTH_MAX_TOKENS") {
            if let Ok(n) = max_tokens.parse() {
                self.max_tokens = Some(n);
            }
        }
        if let Ok(temperature) = std::env::var("HEARTH_TEMPERATURE") {
            if let Ok(t) = temperature.parse() {
                self.temperature = Some(t);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "temperature {t} outside [0.0, 2.0]"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ConfigError::Invalid("max_tokens must be positive".into()));
        }
        Ok(())
    }

    /// The catalog spec for the configured model, with any config-level
    /// overrides applied.
    pub fn model_spec(&self) -> ModelSpec {
        let mut spec = spec(self.model);
        if let Some(max_tokens) = self.max_tokens {
            spec.default_max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            spec.default_temperature = temperature;
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = AppConfig::load(Path::new("/nonexistent/hearth-config.toml")).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.context_size, 8_192);
    }

    #[test]
    fn loads_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"llama-3.2-1b-instruct\"\nmax_tokens = 256\ntemperature = 0.2\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.model, ModelId::Llama32_1bInstruct);
        assert_eq!(config.max_tokens, Some(256));

        let spec = config.model_spec();
        assert_eq!(spec.default_max_tokens, 256);
        assert!((spec.default_temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_bad_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = 9.5\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn model_spec_without_overrides_uses_catalog_defaults() {
        let config = AppConfig::default();
        let spec = config.model_spec();
        assert_eq!(spec.default_max_tokens, 512);
    }
}
