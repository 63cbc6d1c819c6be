//! Event records and the bounded event store
//!
//! An [`EventRecord`] is created once per accepted log call and never mutated.
//! The [`EventStore`] keeps them in chronological order and mirrors the whole
//! sequence into durable storage.

mod store;

pub use store::EventStore;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a log call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Log,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// All severities in dispatch order
    pub const ALL: [Severity; 4] = [
        Severity::Log,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
    ];

    /// Upper-case tag used in records, console lines and broadcast names
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Log => "LOG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Name of the client operation receiving calls of this severity
    pub fn operation(&self) -> &'static str {
        match self {
            Severity::Log => "log",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// Check if this severity is a warning or error
    pub fn is_alert(&self) -> bool {
        matches!(self, Severity::Warn | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity: {s}"))
    }
}

/// Identifier of an event record
///
/// Ids are strictly increasing within a process and unique within it. They are
/// drawn as `max(previous + 1, now_in_millis)`, so they stay close to the
/// creation time in milliseconds but never collide when several records are
/// created within the same millisecond.
pub type EventId = u64;

static LAST_EVENT_ID: AtomicU64 = AtomicU64::new(0);

/// Draw the next event id
pub fn next_event_id() -> EventId {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let mut current = LAST_EVENT_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(current + 1);
        match LAST_EVENT_ID.compare_exchange_weak(
            current,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => current = actual,
        }
    }
}

/// Ensure ids drawn from now on are greater than `id`
///
/// Used when a persisted snapshot is read so new records sort after it.
pub(crate) fn advance_event_ids_past(id: EventId) {
    LAST_EVENT_ID.fetch_max(id, Ordering::AcqRel);
}

/// A single recorded log call
///
/// Serialized as `{"id": .., "type": "LOG", "event": .., "timestamp": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    #[serde(rename = "type")]
    pub severity: Severity,
    #[serde(rename = "event")]
    pub message: Value,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// Create a record stamped with a fresh id and the current time
    pub fn new(severity: Severity, message: Value) -> Self {
        Self {
            id: next_event_id(),
            severity,
            message,
            timestamp: Utc::now(),
        }
    }

    /// ISO-8601 timestamp with millisecond precision
    pub fn timestamp_iso(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// The message as display text (strings unquoted, other values as JSON)
    pub fn message_text(&self) -> String {
        render_value(&self.message)
    }
}

/// Format a timestamp as ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a payload value for human-readable output
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_ids_strictly_increase() {
        let ids: Vec<EventId> = (0..1000).map(|_| next_event_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_event_ids_track_wall_clock() {
        let before = Utc::now().timestamp_millis() as u64;
        let id = next_event_id();
        assert!(id >= before);
    }

    #[test]
    fn test_advance_event_ids_past() {
        let far = next_event_id() + 1_000_000;
        advance_event_ids_past(far);
        assert!(next_event_id() > far);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = EventRecord::new(Severity::Warn, json!("disk low"));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "WARN");
        assert_eq!(value["event"], "disk low");
        assert!(value["id"].is_u64());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_record_parses_browser_timestamp() {
        let raw = r#"{"id":1700000000000,"type":"LOG","event":{"a":1},"timestamp":"2024-01-02T03:04:05.678Z"}"#;
        let record: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.severity, Severity::Log);
        assert_eq!(record.message, json!({"a": 1}));
        assert_eq!(record.timestamp_iso(), "2024-01-02T03:04:05.678Z");
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Log.as_str(), "LOG");
        assert_eq!(Severity::Error.operation(), "error");
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_is_alert() {
        assert!(!Severity::Log.is_alert());
        assert!(!Severity::Info.is_alert());
        assert!(Severity::Warn.is_alert());
        assert!(Severity::Error.is_alert());
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!({"k": "v"})), r#"{"k":"v"}"#);
    }
}
