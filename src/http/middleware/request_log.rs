//! Request logging middleware.
//!
//! Writes one line per request carrying the `request`, `response` and
//! `process_time` context fields. Takes the place of the per-request
//! events from `tower_http::trace`, which are filtered out by default.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::time::Instant;

use crate::http::X_REQUEST_ID;

/// Request side of a log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            request_id: request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Response side of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub status_code: u16,
}

impl ResponseInfo {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status_code: status.as_u16(),
        }
    }
}

pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_info = RequestInfo::from_request(&request);

    let response = next.run(request).await;

    let process_time = start.elapsed().as_secs_f64();
    let status = response.status();
    let request_json = serde_json::to_string(&request_info).unwrap_or_default();
    let response_json = serde_json::to_string(&ResponseInfo::new(status)).unwrap_or_default();

    if status.is_server_error() {
        tracing::error!(
            request = %request_json,
            response = %response_json,
            process_time,
            "{} {} failed with {}",
            request_info.method,
            request_info.path,
            status
        );
    } else {
        tracing::info!(
            request = %request_json,
            response = %response_json,
            process_time,
            "{} {} {}",
            request_info.method,
            request_info.path,
            status.as_u16()
        );
    }

    response
}
