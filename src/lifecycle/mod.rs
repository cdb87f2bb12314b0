//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Install log sinks → Bind → Serve
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → stop accepting → drain in-flight requests → exit
//! ```

pub mod signals;

pub use signals::shutdown_signal;
