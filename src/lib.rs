//! API key guard and structured JSON logging for a small HTTP service.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use observability::{init_logging, JsonFormatter};
pub use security::{ApiKeyAuth, AuthError};
