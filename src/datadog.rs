use crate::config::HandlerConfig;
use crate::record::LogEntry;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Error produced by a single delivery attempt to the logs intake.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("failed to serialize log batch: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to send log batch: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("logs intake rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// [`LogSink`] posting batches to the Datadog logs intake over HTTP.
///
/// Each batch is one `POST` with a JSON array body. There is a single
/// attempt per batch; a failed batch is returned as an error and never
/// retried.
#[derive(Clone)]
pub struct DatadogSink {
    client: Client,
    url: String,
    api_key: String,
}

impl DatadogSink {
    /// Construct a sink posting to `url` with the given API key.
    ///
    /// An empty `api_key` yields a disabled sink: the handler never hands
    /// it a batch, and a direct `deliver` returns `Ok` without touching
    /// the network.
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Construct a sink from the intake URL, API key and timeout of `config`.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.intake_url(), config.api_key.clone(), config.timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one batch, mapping every failure into a [`DeliveryError`].
    pub async fn deliver(&self, batch: &[LogEntry]) -> Result<(), DeliveryError> {
        if !self.is_enabled() || batch.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(batch)?;
        let resp = self
            .client
            .post(&self.url)
            .header("DD-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(DeliveryError::Rejected { status, body })
        }
    }
}

#[async_trait]
impl LogSink for DatadogSink {
    async fn send_batch(&self, batch: &[LogEntry]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.deliver(batch).await.map_err(Into::into)
    }

    /// Disabled when no API key is configured.
    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}
