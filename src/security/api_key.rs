//! API key authentication middleware.
//! Compares the raw header value against the configured key.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::{ApiKey, AuthConfig};

/// Rejection returned when the supplied key does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid API Key")]
    InvalidApiKey,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Checks supplied credentials against the configured key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    expected: ApiKey,
    header_name: String,
}

impl ApiKeyAuth {
    pub fn new(expected: ApiKey, header_name: impl Into<String>) -> Self {
        Self {
            expected,
            header_name: header_name.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.api_key.clone(), config.header_name.clone())
    }

    /// Header the key is read from.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Allow only an exact match. Missing or empty keys never match.
    pub fn verify(&self, supplied: Option<&str>) -> Result<(), AuthError> {
        let supplied = supplied.unwrap_or_default();
        if supplied.is_empty() || self.expected.is_empty() {
            return Err(AuthError::InvalidApiKey);
        }

        // Constant-time comparison.
        if supplied.as_bytes().ct_eq(self.expected.expose().as_bytes()).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

pub async fn api_key_middleware(
    State(auth): State<Arc<ApiKeyAuth>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let supplied = request
        .headers()
        .get(auth.header_name())
        .and_then(|h| h.to_str().ok());

    match auth.verify(supplied) {
        Ok(()) => Ok(next.run(request).await),
        Err(err) => {
            tracing::warn!("Rejected request to {}: {}", request.uri().path(), err);
            Err(err)
        }
    }
}
