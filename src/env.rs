//! Environment variable names read by [`HandlerConfig::from_env`].
//!
//! These are purely helpers; the handler itself never touches the
//! environment after construction.
//!
//! [`HandlerConfig::from_env`]: crate::config::HandlerConfig::from_env

/// Datadog API key. Empty or missing disables remote delivery.
pub const DD_API_KEY_ENV: &str = "DD_API_KEY";

/// Datadog site, e.g. `datadoghq.eu`.
pub const DD_SITE_ENV: &str = "DD_SITE";

/// Service label attached to every entry.
pub const DD_SERVICE_ENV: &str = "DD_SERVICE";

/// Environment label (`env`) attached to every entry.
pub const DD_ENV_ENV: &str = "DD_ENV";

/// Minimum severity, by name (`debug`, `info`, ...) or integer.
pub const DD_LOG_LEVEL_ENV: &str = "DD_LOG_LEVEL";

/// Any non-empty value lowers the minimum severity to debug.
pub const DD_DEBUG_ENV: &str = "DD_DEBUG";

/// Number of entries that forces an immediate flush.
pub const DD_LOGS_BATCH_SIZE_ENV: &str = "DD_LOGS_BATCH_SIZE";

/// Timer flush interval in milliseconds.
pub const DD_LOGS_FLUSH_INTERVAL_MS_ENV: &str = "DD_LOGS_FLUSH_INTERVAL_MS";

/// HTTP timeout in milliseconds.
pub const DD_LOGS_TIMEOUT_MS_ENV: &str = "DD_LOGS_TIMEOUT_MS";

/// Capacity of the ingestion queue.
pub const DD_LOGS_QUEUE_CAPACITY_ENV: &str = "DD_LOGS_QUEUE_CAPACITY";

/// Full intake URL overriding the one derived from the site.
pub const DD_LOGS_URL_ENV: &str = "DD_LOGS_URL";

/// Explicit hostname override.
pub const DD_HOSTNAME_ENV: &str = "DD_HOSTNAME";

/// Read an environment variable, treating an empty value as unset.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
