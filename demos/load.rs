use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

use datadog_log_sink::fallback::FallbackSink;
use datadog_log_sink::noop_sink::NoopSink;
use datadog_log_sink::{Attr, DatadogHandler, HandlerConfig, LogEntry, Severity};

/// Discards everything so the measurement only covers the handler.
struct QuietFallback;

impl FallbackSink for QuietFallback {
    fn write(&self, _entry: &LogEntry) {}
    fn report(&self, _severity: Severity, _message: &str) {}
}

#[tokio::main]
async fn main() {
    let config = HandlerConfig {
        queue_capacity: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        ..HandlerConfig::default()
    };
    let handler = DatadogHandler::new(&config, Arc::new(NoopSink), Arc::new(QuietFallback));

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        handler.submit(
            Severity::ERROR,
            "load test error",
            vec![Attr::group("load", vec![Attr::new("iteration", i)])],
        );
    }

    let elapsed = start.elapsed();
    handler.close().await;

    let stats = handler.stats();
    println!(
        "submitted {} entries in {:?} (~{:.0} ev/s), enqueued {}, dropped {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        stats.enqueued,
        stats.dropped
    );
}
