//! JSON log lines: one JSON object per line for ingestion.
//!
//! The key set is closed. `timestamp`, `level` and `message` are always
//! written. `request`, `response` and `process_time` are written when the
//! event carries a non-empty value for them. `error` and `trace` are only
//! written for ERROR events.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// The timestamp is not finite or falls outside the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("timestamp {0} cannot be represented as a date")]
pub struct TimestampError(pub f64);

/// Format a Unix timestamp as `YYYY-MM-DD HH:MM:SS,mmm` in local time.
pub fn format_timestamp(ts: f64) -> Result<String, TimestampError> {
    format_timestamp_in(ts, &Local)
}

/// Format a Unix timestamp as `YYYY-MM-DD HH:MM:SS,mmm` in `tz`.
///
/// The fractional second is resolved to whole microseconds first (ties to
/// even), then cut to milliseconds. Milliseconds are never rounded up.
pub fn format_timestamp_in<Tz>(ts: f64, tz: &Tz) -> Result<String, TimestampError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if !ts.is_finite() {
        return Err(TimestampError(ts));
    }

    let mut secs = ts.trunc();
    let mut micros = (ts.fract() * 1_000_000.0).round_ties_even();
    if micros >= 1_000_000.0 {
        secs += 1.0;
        micros -= 1_000_000.0;
    } else if micros < 0.0 {
        secs -= 1.0;
        micros += 1_000_000.0;
    }
    let micros = micros as u32;

    let utc = DateTime::from_timestamp(secs as i64, micros * 1_000).ok_or(TimestampError(ts))?;
    let local = utc.with_timezone(tz);

    Ok(format!(
        "{},{:03}",
        local.format("%Y-%m-%d %H:%M:%S"),
        micros / 1_000
    ))
}

/// Fields collected from a single tracing event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFields {
    pub message: String,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub process_time: Option<Value>,
    /// Formatted error, including its source chain.
    pub error: Option<String>,
    /// Stack trace text.
    pub trace: Option<String>,
}

impl EventFields {
    fn record_text(&mut self, name: &str, text: String) {
        match name {
            "message" => self.message = text,
            "request" => self.request = Some(parse_payload(text)),
            "response" => self.response = Some(parse_payload(text)),
            "process_time" => self.process_time = Some(parse_payload(text)),
            "error" => self.error = Some(text),
            "trace" | "backtrace" => self.trace = Some(text),
            _ => {}
        }
    }

    fn record_value(&mut self, name: &str, value: Value) {
        match name {
            "request" => self.request = Some(value),
            "response" => self.response = Some(value),
            "process_time" => self.process_time = Some(value),
            _ => self.record_text(name, value.to_string()),
        }
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field.name(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field.name(), value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field.name(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field.name(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field.name(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        if field.name() == "error" {
            self.error = Some(format_error_chain(value));
        } else {
            self.record_text(field.name(), value.to_string());
        }
    }
}

/// Payloads logged through `%` are usually serialized JSON; keep them
/// structured when they parse.
fn parse_payload(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn format_error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\nCaused by: {}", cause);
        source = cause.source();
    }
    out
}

/// Falsy values are treated as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A single serialized log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_time: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl LogRecord {
    pub fn new(timestamp: String, level: &Level, fields: EventFields) -> Self {
        let is_error = *level == Level::ERROR;
        Self {
            timestamp,
            level: level.as_str(),
            message: fields.message,
            request: fields.request.filter(is_present),
            response: fields.response.filter(is_present),
            process_time: fields.process_time.filter(is_present),
            error: fields.error.filter(|e| is_error && !e.is_empty()),
            trace: fields.trace.filter(|t| is_error && !t.is_empty()),
        }
    }
}

/// Event formatter writing one [`LogRecord`] per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let timestamp = format_timestamp(unix_now()).map_err(|_| fmt::Error)?;
        let record = LogRecord::new(timestamp, event.metadata().level(), fields);
        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;

        writeln!(writer, "{}", line)
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use serde_json::json;
    use std::io;

    use crate::observability::capture::capture;

    fn keys(line: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(line).unwrap();
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[derive(Debug, Error)]
    #[error("query failed")]
    struct QueryError {
        #[source]
        source: io::Error,
    }

    // ── Timestamps ───────────────────────────────────────────────────

    #[test]
    fn test_timestamp_epoch() {
        assert_eq!(format_timestamp_in(0.0, &Utc).unwrap(), "1970-01-01 00:00:00,000");
    }

    #[test]
    fn test_timestamp_truncates_milliseconds() {
        assert_eq!(format_timestamp_in(1.9994, &Utc).unwrap(), "1970-01-01 00:00:01,999");
        assert_eq!(format_timestamp_in(1.0009, &Utc).unwrap(), "1970-01-01 00:00:01,000");
        assert_eq!(
            format_timestamp_in(1_700_000_000.123_456, &Utc).unwrap(),
            "2023-11-14 22:13:20,123"
        );
    }

    #[test]
    fn test_timestamp_microsecond_carry() {
        // 999999.6 microseconds resolves to the next whole second.
        assert_eq!(format_timestamp_in(1.999_999_6, &Utc).unwrap(), "1970-01-01 00:00:02,000");
    }

    #[test]
    fn test_timestamp_never_rounds_milliseconds_up() {
        for base in [0_i64, 86_399, 1_700_000_000] {
            for k in 0..5_i64 {
                let secs = base + k;
                let prefix = DateTime::from_timestamp(secs, 0)
                    .unwrap()
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string();
                for m in 0..10_000_u32 {
                    let ts = secs as f64 + m as f64 / 1e4;
                    let expected = (ts.fract() * 1e6).round_ties_even() as u32 / 1_000;
                    assert_eq!(expected, m / 10, "ts={ts}");

                    let formatted = format_timestamp_in(ts, &Utc).unwrap();
                    assert_eq!(formatted, format!("{prefix},{expected:03}"), "ts={ts}");
                    if m % 10 >= 5 {
                        let rounded = (m + 5) / 10;
                        assert!(!formatted.ends_with(&format!(",{rounded:03}")), "ts={ts}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_timestamp_before_epoch() {
        assert_eq!(format_timestamp_in(-0.5, &Utc).unwrap(), "1969-12-31 23:59:59,500");
    }

    #[test]
    fn test_timestamp_uses_zone() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(format_timestamp_in(0.25, &cet).unwrap(), "1970-01-01 01:00:00,250");
    }

    #[test]
    fn test_timestamp_is_deterministic() {
        let ts = 1_234_567_890.987_654;
        assert_eq!(format_timestamp(ts).unwrap(), format_timestamp(ts).unwrap());
        let formatted = format_timestamp(ts).unwrap();
        assert_eq!(formatted.len(), "YYYY-MM-DD HH:MM:SS,mmm".len());
        assert!(formatted.ends_with(",987"));
    }

    #[test]
    fn test_timestamp_rejects_non_finite() {
        assert!(format_timestamp(f64::NAN).is_err());
        assert!(format_timestamp(f64::INFINITY).is_err());
        assert!(format_timestamp(1e300).is_err());
    }

    // ── Record construction ──────────────────────────────────────────

    #[test]
    fn test_record_omits_absent_fields() {
        let fields = EventFields {
            message: "hello".into(),
            ..Default::default()
        };
        let record = LogRecord::new("ts".into(), &Level::INFO, fields);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"timestamp":"ts","level":"INFO","message":"hello"}"#);
    }

    #[test]
    fn test_record_omits_empty_payloads() {
        let fields = EventFields {
            message: "m".into(),
            request: Some(json!({})),
            response: Some(json!("")),
            process_time: Some(json!(0.0)),
            ..Default::default()
        };
        let record = LogRecord::new("ts".into(), &Level::INFO, fields);
        assert_eq!(record.request, None);
        assert_eq!(record.response, None);
        assert_eq!(record.process_time, None);
    }

    #[test]
    fn test_record_keeps_payloads_in_order() {
        let fields = EventFields {
            message: "m".into(),
            request: Some(json!({"method": "GET"})),
            response: Some(json!({"status_code": 200})),
            process_time: Some(json!(0.5)),
            ..Default::default()
        };
        let json = serde_json::to_string(&LogRecord::new("ts".into(), &Level::INFO, fields)).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":"ts","level":"INFO","message":"m","request":{"method":"GET"},"response":{"status_code":200},"process_time":0.5}"#
        );
    }

    #[test]
    fn test_error_fields_only_at_error_level() {
        let fields = EventFields {
            message: "m".into(),
            error: Some("boom".into()),
            trace: Some("at main".into()),
            ..Default::default()
        };

        for level in [Level::TRACE, Level::DEBUG, Level::INFO, Level::WARN] {
            let record = LogRecord::new("ts".into(), &level, fields.clone());
            assert_eq!(record.error, None, "{level}");
            assert_eq!(record.trace, None, "{level}");
        }

        let record = LogRecord::new("ts".into(), &Level::ERROR, fields);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.trace.as_deref(), Some("at main"));
    }

    #[test]
    fn test_error_level_without_error_data() {
        let fields = EventFields {
            message: "m".into(),
            error: Some(String::new()),
            ..Default::default()
        };
        let record = LogRecord::new("ts".into(), &Level::ERROR, fields);
        assert_eq!(keys(&serde_json::to_string(&record).unwrap()), ["level", "message", "timestamp"]);
    }

    // ── Through tracing ──────────────────────────────────────────────

    #[test]
    fn test_plain_event() {
        let lines = capture(|| tracing::info!("service started"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(r#"{"timestamp":""#));
        assert_eq!(keys(&lines[0]), ["level", "message", "timestamp"]);

        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "service started");
    }

    #[test]
    fn test_context_fields_are_structured() {
        let lines = capture(|| {
            let request = json!({"method": "GET", "path": "/api/status"});
            tracing::info!(request = %request, process_time = 0.012_f64, user = "ignored", "handled");
        });

        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["request"], json!({"method": "GET", "path": "/api/status"}));
        assert_eq!(value["process_time"], json!(0.012));
        assert_eq!(keys(&lines[0]), ["level", "message", "process_time", "request", "timestamp"]);
    }

    #[test]
    fn test_unparsable_payload_kept_as_string() {
        let lines = capture(|| tracing::info!(response = "not json", "sent"));
        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["response"], "not json");
    }

    #[test]
    fn test_error_chain_serialized() {
        let err = QueryError {
            source: io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"),
        };
        let lines = capture(|| {
            tracing::error!(error = &err as &(dyn StdError + 'static), trace = "handler\nserver", "request failed");
        });

        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["error"], "query failed\nCaused by: peer went away");
        assert_eq!(value["trace"], "handler\nserver");
    }

    #[test]
    fn test_warn_drops_error_field() {
        let lines = capture(|| tracing::warn!(error = %"timeout", backtrace = "x", "retrying"));
        assert_eq!(keys(&lines[0]), ["level", "message", "timestamp"]);
    }
}
