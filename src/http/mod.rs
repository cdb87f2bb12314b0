//! HTTP service subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → TraceLayer (tower_http::trace, silenced by default)
//!     → request ID (x-request-id, generated if absent, echoed back)
//!     → middleware/request_log.rs (one JSON line per request)
//!     → timeout
//!     → /health            (open)
//!     → /api/*             (security::api_key)
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
