//! Configuration validation.
//!
//! Serde handles syntax; this checks values that parse but cannot run.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::observability::logging::parse_level;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("auth.api_key must be set")]
    MissingApiKey,

    #[error("auth.header_name must not be empty")]
    EmptyHeaderName,

    #[error("logging.level `{0}` is not a known level")]
    UnknownLogLevel(String),

    #[error("logging.file_path must not be empty when save_on_file is enabled")]
    EmptyLogFilePath,

    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Collect every validation error instead of stopping at the first.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.api_key.is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }
    if config.auth.header_name.trim().is_empty() {
        errors.push(ValidationError::EmptyHeaderName);
    }
    if parse_level(&config.logging.level).is_err() {
        errors.push(ValidationError::UnknownLogLevel(config.logging.level.clone()));
    }
    if config.logging.save_on_file && config.logging.file_path.trim().is_empty() {
        errors.push(ValidationError::EmptyLogFilePath);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ApiKey;

    fn valid() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.auth.api_key = ApiKey::new("secret");
        config
    }

    #[test]
    fn test_defaults_with_key_are_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_default_config_needs_api_key() {
        let errors = validate_config(&ServiceConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingApiKey]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.logging.level = "loud".into();
        config.listener.bind_address = "localhost".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UnknownLogLevel("loud".into()),
                ValidationError::InvalidBindAddress("localhost".into()),
                ValidationError::ZeroRequestTimeout,
            ]
        );
    }

    #[test]
    fn test_file_path_only_checked_when_saving() {
        let mut config = valid();
        config.logging.file_path = String::new();
        assert!(validate_config(&config).is_ok());

        config.logging.save_on_file = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::EmptyLogFilePath]
        );
    }
}
