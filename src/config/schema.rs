//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults so a minimal file only needs the API key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Log threshold and sinks.
    pub logging: LoggingConfig,

    /// API key authentication.
    pub auth: AuthConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity (trace, debug, info, warn/warning, error).
    pub level: String,

    /// Also write records to a size-rotating file.
    pub save_on_file: bool,

    /// Path of the rotating log file.
    pub file_path: String,

    /// Targets whose events are dropped entirely.
    ///
    /// `tower_http::trace` emits its own per-request events, which would
    /// duplicate the ones written by the request-logging middleware.
    pub suppressed_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            save_on_file: false,
            file_path: "app.log".to_string(),
            suppressed_targets: vec!["tower_http::trace".to_string()],
        }
    }
}

/// API key authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected API key. Must be set, through the file or `API_KEY`.
    pub api_key: ApiKey,

    /// Header carrying the raw key.
    pub header_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            header_name: "Authorization".to_string(),
        }
    }
}

/// A secret API key. `Debug` never prints the value.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(\"\")")
        } else {
            f.write_str("ApiKey(**********)")
        }
    }
}
