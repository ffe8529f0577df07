/// Error returned when building a [`HandlerConfig`] from the environment.
///
/// [`HandlerConfig`]: crate::config::HandlerConfig
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {source}")]
    InvalidSeverity {
        key: &'static str,
        #[source]
        source: crate::severity::ParseSeverityError,
    },

    #[error("invalid value for {key}: {value:?} is not a positive integer")]
    InvalidNumber { key: &'static str, value: String },
}

/// Error returned when installing the handler as the global `tracing`
/// subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[cfg(feature = "datadog")]
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to set global subscriber: {0}")]
    GlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
