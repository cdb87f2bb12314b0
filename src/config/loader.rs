//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{ApiKey, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variable holding the expected API key.
pub const ENV_API_KEY: &str = "API_KEY";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Environment variable overriding `logging.save_on_file`.
pub const ENV_LOG_SAVE_ON_FILE: &str = "LOG_SAVE_ON_FILE";

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(bind) = &self.bind_address {
            config.listener.bind_address = bind.clone();
        }
    }
}

/// Load configuration: defaults, then the TOML file (if any), then the
/// process environment, then `overrides`, then validation.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ServiceConfig, ConfigError> {
    load_config_with_env(path, overrides, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with_env<F>(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    env: F,
) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `API_KEY`, `LOG_LEVEL` and `LOG_SAVE_ON_FILE` on top of `config`.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = env(ENV_API_KEY) {
        config.auth.api_key = ApiKey::new(key);
    }
    if let Some(level) = env(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(raw) = env(ENV_LOG_SAVE_ON_FILE) {
        config.logging.save_on_file = parse_bool(&raw).ok_or_else(|| ConfigError::Env {
            name: ENV_LOG_SAVE_ON_FILE,
            reason: format!("`{}` is not a boolean", raw),
        })?;
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
