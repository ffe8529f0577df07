use crate::env::*;
use crate::error::ConfigError;
use crate::record::DEFAULT_SERVICE;
use crate::severity::Severity;
use std::time::Duration;

/// Site used to build the intake URL when none is configured.
pub const DEFAULT_SITE: &str = "datadoghq.com";

/// Configuration of a [`DatadogHandler`].
///
/// Controls where batches are delivered, the labels attached to every
/// entry, and the buffering behavior of the handler.
///
/// **Fields**
/// - `api_key`: Datadog API key. Empty disables remote delivery; records
///   still reach the fallback sink.
/// - `site`: domain suffix of the intake, e.g. `datadoghq.eu`.
/// - `endpoint`: full intake URL overriding the one derived from `site`.
/// - `min_severity`: records below this severity are ignored entirely.
/// - `batch_size`: buffered entries that force an immediate flush.
/// - `flush_interval`: maximum time between flushes of a partial batch.
/// - `timeout`: HTTP timeout for one delivery.
/// - `queue_capacity`: entries the ingestion queue holds before dropping.
///
/// [`DatadogHandler`]: crate::handler::DatadogHandler
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    pub api_key: String,
    pub site: String,
    pub endpoint: Option<String>,
    pub service: String,
    pub environment: String,
    pub min_severity: Severity,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            site: DEFAULT_SITE.to_string(),
            endpoint: None,
            service: DEFAULT_SERVICE.to_string(),
            environment: String::new(),
            min_severity: Severity::INFO,
            batch_size: 20,
            flush_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            queue_capacity: 100,
        }
    }
}

impl HandlerConfig {
    /// Build a config from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_non_empty)
    }

    /// Build a config from an arbitrary key lookup. `lookup` should return
    /// `None` for unset or empty variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(api_key) = lookup(DD_API_KEY_ENV) {
            config.api_key = api_key;
        }
        if let Some(site) = lookup(DD_SITE_ENV) {
            config.site = site;
        }
        if let Some(url) = lookup(DD_LOGS_URL_ENV) {
            config.endpoint = Some(url);
        }
        if let Some(service) = lookup(DD_SERVICE_ENV) {
            config.service = service;
        }
        if let Some(env) = lookup(DD_ENV_ENV) {
            config.environment = env;
        }
        if lookup(DD_DEBUG_ENV).is_some() {
            config.min_severity = Severity::DEBUG;
        }
        if let Some(level) = lookup(DD_LOG_LEVEL_ENV) {
            config.min_severity = level.parse().map_err(|source| ConfigError::InvalidSeverity {
                key: DD_LOG_LEVEL_ENV,
                source,
            })?;
        }
        if let Some(n) = parse_positive(&lookup, DD_LOGS_BATCH_SIZE_ENV)? {
            config.batch_size = n as usize;
        }
        if let Some(ms) = parse_positive(&lookup, DD_LOGS_FLUSH_INTERVAL_MS_ENV)? {
            config.flush_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_positive(&lookup, DD_LOGS_TIMEOUT_MS_ENV)? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_positive(&lookup, DD_LOGS_QUEUE_CAPACITY_ENV)? {
            config.queue_capacity = n as usize;
        }

        Ok(config)
    }

    /// Intake URL batches are posted to.
    pub fn intake_url(&self) -> String {
        match &self.endpoint {
            Some(url) => url.clone(),
            None => {
                let site = if self.site.is_empty() { DEFAULT_SITE } else { &self.site };
                format!("https://http-intake.logs.{}/api/v2/logs", site)
            }
        }
    }

    /// Copy of this config with degenerate values raised to safe minimums.
    pub(crate) fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.batch_size = config.batch_size.max(1);
        config.queue_capacity = config.queue_capacity.max(1);
        config.flush_interval = config.flush_interval.max(Duration::from_millis(10));
        if config.service.is_empty() {
            config.service = DEFAULT_SERVICE.to_string();
        }
        config
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { key, value }),
        },
    }
}
