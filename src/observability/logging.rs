//! Structured logging.
//!
//! # Responsibilities
//! - Install the global subscriber exactly once
//! - Console sink on stdout, optional size-rotating file sink
//! - Both sinks share the JSON formatter
//! - Severity threshold from config; noisy targets silenced
//!
//! # Design Decisions
//! - A second `init_logging` call returns the sinks installed by the first
//! - `tower_http::trace` is off by default: the request-logging middleware
//!   already writes one line per request

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, ParseError};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt};

use crate::config::LoggingConfig;
use crate::observability::format::JsonFormatter;
use crate::observability::rotation::{RotatingFileWriter, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level `{0}`")]
    UnknownLevel(String),

    #[error("invalid log filter `{directives}`: {source}")]
    Filter {
        directives: String,
        #[source]
        source: ParseError,
    },

    #[error("cannot open log file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("another global subscriber is already installed")]
    AlreadyInstalled,

    #[error("cannot install the global subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// A destination records are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Console,
    RotatingFile {
        path: PathBuf,
        max_bytes: u64,
        backup_count: usize,
    },
}

/// What `init_logging` attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledSinks {
    pub level: LevelFilter,
    pub sinks: Vec<Sink>,
}

impl InstalledSinks {
    pub fn console_count(&self) -> usize {
        self.sinks.iter().filter(|s| matches!(s, Sink::Console)).count()
    }

    pub fn file_count(&self) -> usize {
        self.sinks
            .iter()
            .filter(|s| matches!(s, Sink::RotatingFile { .. }))
            .count()
    }
}

static INSTALLED: Mutex<Option<InstalledSinks>> = Mutex::new(None);

/// Parse a level name. Accepts the tracing names plus `warning`,
/// `critical` and `fatal`, case-insensitive.
pub fn parse_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(LevelFilter::WARN),
        "critical" | "fatal" => Ok(LevelFilter::ERROR),
        "" => Err(LoggingError::UnknownLevel(raw.to_string())),
        other => LevelFilter::from_str(other).map_err(|_| LoggingError::UnknownLevel(raw.to_string())),
    }
}

/// Threshold plus an `off` directive for every suppressed target.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let level = parse_level(&config.level)?;

    let mut directives = vec![level.to_string()];
    directives.extend(
        config
            .suppressed_targets
            .iter()
            .map(|target| format!("{}=off", target)),
    );
    let joined = directives.join(",");

    EnvFilter::try_new(&joined).map_err(|source| LoggingError::Filter {
        directives: joined,
        source,
    })
}

/// Install the console sink and, when configured, the rotating file sink.
///
/// Idempotent: once sinks are attached, later calls attach nothing and
/// return the first installation. If a subscriber installed by someone
/// else is already global, returns `AlreadyInstalled` without touching
/// the file system.
pub fn init_logging(config: &LoggingConfig) -> Result<InstalledSinks, LoggingError> {
    let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(sinks) = installed.as_ref() {
        return Ok(sinks.clone());
    }

    let sinks = install(config)?;
    *installed = Some(sinks.clone());
    Ok(sinks)
}

fn install(config: &LoggingConfig) -> Result<InstalledSinks, LoggingError> {
    if tracing::dispatcher::has_been_set() {
        return Err(LoggingError::AlreadyInstalled);
    }

    let level = parse_level(&config.level)?;
    let filter = build_filter(config)?;
    let mut sinks = vec![Sink::Console];

    let console = fmt::layer()
        .event_format(JsonFormatter)
        .with_writer(io::stdout);

    let file = if config.save_on_file {
        let path = PathBuf::from(&config.file_path);
        let writer = RotatingFileWriter::open(&path, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT)
            .map_err(|source| LoggingError::File {
                path: path.clone(),
                source,
            })?;
        sinks.push(Sink::RotatingFile {
            path,
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        });
        Some(
            fmt::layer()
                .event_format(JsonFormatter)
                .with_writer(Mutex::new(writer)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(InstalledSinks { level, sinks })
}
