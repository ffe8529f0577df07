use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Ordinal severity of a log record.
///
/// The domain is open-ended: any `i32` is a valid severity. The named
/// constants are the thresholds used to map a severity to a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(pub i32);

impl Severity {
    pub const TRACE: Severity = Severity(-8);
    pub const DEBUG: Severity = Severity(-4);
    pub const INFO: Severity = Severity(0);
    pub const WARN: Severity = Severity(4);
    pub const ERROR: Severity = Severity(8);
}

impl Default for Severity {
    fn default() -> Self {
        Severity::INFO
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Severity::TRACE,
            tracing::Level::DEBUG => Severity::DEBUG,
            tracing::Level::INFO => Severity::INFO,
            tracing::Level::WARN => Severity::WARN,
            _ => Severity::ERROR,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid severity: {0:?}")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Accepts level names (case-insensitive) or a raw integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::TRACE),
            "debug" => Ok(Severity::DEBUG),
            "info" => Ok(Severity::INFO),
            "warn" | "warning" => Ok(Severity::WARN),
            "error" => Ok(Severity::ERROR),
            other => other
                .parse::<i32>()
                .map(Severity)
                .map_err(|_| ParseSeverityError(trimmed.to_string())),
        }
    }
}

/// Closed set of status labels understood by the Datadog logs intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Debug,
    Info,
    Warning,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Debug => "debug",
            Status::Info => "info",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }
}

impl From<Severity> for Status {
    /// Total mapping: anything below `INFO` is debug, anything at or above
    /// `ERROR` is error.
    fn from(severity: Severity) -> Self {
        if severity >= Severity::ERROR {
            Status::Error
        } else if severity >= Severity::WARN {
            Status::Warning
        } else if severity >= Severity::INFO {
            Status::Info
        } else {
            Status::Debug
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
