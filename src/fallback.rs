use crate::record::LogEntry;
use crate::severity::{Severity, Status};
use chrono::{SecondsFormat, TimeZone, Utc};
use std::io::Write;

/// Marker written to the fallback sink for every entry dropped because the
/// ingestion queue was full.
pub const QUEUE_FULL_MESSAGE: &str = "datadog log queue full, dropping log entry";

/// Synchronous, always-available local output.
///
/// Every record accepted by the handler is written here before it is
/// queued for remote delivery, and every delivery problem is reported
/// here. Implementations must not block for long: `write` runs on the
/// producer's thread.
pub trait FallbackSink: Send + Sync {
    /// Write a record accepted by the handler.
    fn write(&self, entry: &LogEntry);

    /// Report an operational problem of the handler itself (drops,
    /// failed deliveries).
    fn report(&self, severity: Severity, message: &str);
}

/// Writes one logfmt-style line per record to standard error.
#[derive(Clone, Default)]
pub struct StderrFallback;

impl FallbackSink for StderrFallback {
    fn write(&self, entry: &LogEntry) {
        let line = format_entry(entry);
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn report(&self, severity: Severity, message: &str) {
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let level = Status::from(severity).as_str().to_ascii_uppercase();
        let _ = writeln!(
            std::io::stderr().lock(),
            "time={} level={} msg={:?}",
            time,
            level,
            message
        );
    }
}

/// Render an entry as `time=.. level=.. msg=".." key=value ...`.
pub fn format_entry(entry: &LogEntry) -> String {
    let time = Utc
        .timestamp_millis_opt(entry.timestamp)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| entry.timestamp.to_string());

    let mut line = format!(
        "time={} level={} msg={:?}",
        time,
        entry.status.as_str().to_ascii_uppercase(),
        entry.message
    );
    for (key, value) in &entry.attributes {
        match value {
            serde_json::Value::String(s) => line.push_str(&format!(" {}={:?}", key, s)),
            other => line.push_str(&format!(" {}={}", key, other)),
        }
    }
    line
}
