//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing event (any module, any target)
//!     → EnvFilter (threshold, suppressed targets)
//!     → format.rs (JsonFormatter: one JSON object per line)
//!     → stdout
//!     → rotation.rs (size-rotating file, optional)
//! ```
//!
//! # Design Decisions
//! - Fixed key set: timestamp, level, message, request, response,
//!   process_time, error, trace
//! - Empty context values are dropped, never written as null
//! - Sink installation is idempotent

#[cfg(test)]
pub(crate) mod capture;
pub mod format;
pub mod logging;
pub mod rotation;

pub use format::{format_timestamp, JsonFormatter, LogRecord};
pub use logging::{init_logging, InstalledSinks, LoggingError, Sink};
pub use rotation::RotatingFileWriter;
