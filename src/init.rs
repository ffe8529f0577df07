use crate::error::InitError;
use crate::handler::DatadogHandler;
use crate::layer::DatadogLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Install `handler` behind a [`DatadogLayer`] as the global `tracing`
/// subscriber.
///
/// **Returns**
/// - The handler, so the caller can [`close`](DatadogHandler::close) it
///   before exiting and have the final batch flushed.
/// - `Err(InitError::GlobalDefault)` if a global subscriber is already set.
pub fn init_tracing_with_handler(handler: DatadogHandler) -> Result<DatadogHandler, InitError> {
    let subscriber = Registry::default().with(DatadogLayer::new(handler.clone()));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(handler)
}

/// Build a Datadog handler from `config` and install it globally.
///
/// Records go to standard error immediately and to the Datadog intake in
/// batches. With an empty API key only the standard error output remains.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "datadog")]
pub fn init_tracing_with_config(
    config: &crate::config::HandlerConfig,
) -> Result<DatadogHandler, InitError> {
    let handler = DatadogHandler::from_config(config)?;
    init_tracing_with_handler(handler)
}

/// Initialize tracing from `DD_*` environment variables.
///
/// Equivalent to [`init_tracing_with_config`] with
/// [`HandlerConfig::from_env`](crate::config::HandlerConfig::from_env).
#[cfg(feature = "datadog")]
pub fn init_tracing() -> Result<DatadogHandler, InitError> {
    let config = crate::config::HandlerConfig::from_env()?;
    init_tracing_with_config(&config)
}
