//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request to /api/*:
//!     → api_key.rs (compare configured header with the expected key)
//!     → 401 {"detail": "Invalid API Key"} on mismatch
//!     → handler otherwise
//! ```
//!
//! # Design Decisions
//! - Fail closed: missing, empty, or unset keys never match
//! - Constant-time comparison

pub mod api_key;

pub use api_key::{api_key_middleware, ApiKeyAuth, AuthError};
