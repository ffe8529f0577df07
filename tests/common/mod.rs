//! Helpers shared by the integration tests

use datadog_log_sink::fallback::FallbackSink;
use datadog_log_sink::{LogEntry, Severity};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Fallback sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingFallback {
    pub written: Mutex<Vec<LogEntry>>,
    pub reports: Mutex<Vec<String>>,
}

impl RecordingFallback {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    pub fn written_count(&self) -> usize {
        self.written.lock().unwrap().len()
    }
}

impl FallbackSink for RecordingFallback {
    fn write(&self, entry: &LogEntry) {
        self.written.lock().unwrap().push(entry.clone());
    }

    fn report(&self, _severity: Severity, message: &str) {
        self.reports.lock().unwrap().push(message.to_string());
    }
}

/// Poll `check` until it returns true or `limit` elapses.
pub async fn wait_until<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
