use crate::record::LogEntry;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of [`LogEntry`]s.
///
/// Implementations transport a whole batch to a concrete backend. The
/// handler calls `send_batch` from a detached Tokio task, never from the
/// producer's thread and never from the worker loop itself.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one batch.
    ///
    /// **Parameters**
    /// - `batch`: entries in the order they entered the buffer.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the batch.
    /// - `Err(..)` if the backend failed (serialization, network, HTTP
    ///   status). The handler reports the error to its fallback sink and
    ///   discards the batch; there is no retry.
    async fn send_batch(&self, batch: &[LogEntry]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Whether batches should be handed to this sink at all. A disabled
    /// sink is never called and its batches count as neither delivered
    /// nor failed.
    fn is_enabled(&self) -> bool {
        true
    }
}
