use crate::record::LogEntry;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// Accepts every batch and discards it.
///
/// The load demo uses it to time queueing and batching with no transport
/// behind the handler.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send_batch(&self, _batch: &[LogEntry]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
