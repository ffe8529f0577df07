use crate::severity::Status;
use serde::Serialize;
use std::collections::BTreeMap;

/// Tag sent as `ddsource` on every entry.
pub const SOURCE: &str = "datadog-cli";

/// Service label used when none is configured.
pub const DEFAULT_SERVICE: &str = "datadog-cli";

/// One structured record in the shape accepted by the Datadog logs intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub status: Status,
    pub service: String,
    #[serde(rename = "ddsource")]
    pub source: String,
    #[serde(rename = "hostname")]
    pub host: String,
    /// Milliseconds since the Unix epoch, captured when the record was created.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Empty means unset.
    #[serde(rename = "env", skip_serializing_if = "String::is_empty")]
    pub environment: String,
}
