use crate::attrs::{flatten_into, join_key, Attr};
use crate::buffer::BatchBuffer;
use crate::config::HandlerConfig;
use crate::fallback::{FallbackSink, QUEUE_FULL_MESSAGE};
use crate::hostname::resolve_hostname;
use crate::record::{LogEntry, SOURCE};
use crate::severity::{Severity, Status};
use crate::sink::LogSink;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;

/// Lifecycle of the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Consuming the queue and flushing on size or timer.
    Running,
    /// Stop observed; consuming what was already queued before the final flush.
    Draining,
    /// Terminal. The worker task has exited.
    Stopped,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Running,
            1 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// Point-in-time copy of the handler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Records that passed the severity filter.
    pub submitted: u64,
    /// Records accepted by the ingestion queue.
    pub enqueued: u64,
    /// Records dropped because the queue was full.
    pub dropped: u64,
    /// Batches the sink accepted. Batches flushed while the sink is
    /// disabled are discarded and not counted here.
    pub batches_delivered: u64,
    /// Batches the sink failed to deliver.
    pub batches_failed: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> HandlerStats {
        HandlerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Hands drained batches to the sink on detached tasks.
#[derive(Clone)]
struct Dispatcher {
    sink: Arc<dyn LogSink>,
    fallback: Arc<dyn FallbackSink>,
    counters: Arc<Counters>,
    runtime: Handle,
}

impl Dispatcher {
    /// Fire-and-forget: the caller never waits for network I/O.
    ///
    /// The delivery task runs with no subscriber so that events emitted
    /// by the transport never reach this handler again.
    fn dispatch(&self, batch: Vec<LogEntry>) {
        if !self.sink.is_enabled() {
            return;
        }
        let sink = Arc::clone(&self.sink);
        let fallback = Arc::clone(&self.fallback);
        let counters = Arc::clone(&self.counters);

        let delivery = async move {
            match sink.send_batch(&batch).await {
                Ok(()) => {
                    counters.batches_delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.batches_failed.fetch_add(1, Ordering::Relaxed);
                    let message =
                        format!("error sending {} log entries to Datadog: {}", batch.len(), e);
                    fallback.report(Severity::ERROR, &message);
                }
            }
        };
        self.runtime.spawn(delivery.with_subscriber(NoSubscriber::default()));
    }
}

/// State shared by a handler and every view derived from it.
struct Shared {
    sender: mpsc::Sender<LogEntry>,
    buffer: Arc<BatchBuffer>,
    dispatcher: Dispatcher,
    fallback: Arc<dyn FallbackSink>,
    counters: Arc<Counters>,
    state: Arc<AtomicU8>,
    stop: CancellationToken,
    worker: AsyncMutex<Option<JoinHandle<()>>>,
    min_severity: Severity,
    service: String,
    environment: String,
    hostname: String,
}

impl Drop for Shared {
    // Last view gone without `close`: let the worker drain and exit.
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Structured-log handler batching records to a [`LogSink`].
///
/// Producers call [`submit`](Self::submit) from any thread; each accepted
/// record is written to the fallback sink immediately and queued for a
/// background worker that batches it and hands full or timed-out batches
/// to the sink on detached tasks. Remote delivery is best effort: failures
/// are reported to the fallback sink and the batch is discarded.
///
/// Cloning, [`with_attrs`](Self::with_attrs) and
/// [`with_group`](Self::with_group) produce cheap views sharing the same
/// queue, buffer, worker and sink.
#[derive(Clone)]
pub struct DatadogHandler {
    shared: Arc<Shared>,
    preset: BTreeMap<String, Value>,
    prefix: String,
}

impl DatadogHandler {
    /// Create a handler and spawn its background worker.
    ///
    /// Degenerate values in `config` are raised to minimums (batch size and
    /// queue capacity of 1, flush interval of 10ms).
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(
        config: &HandlerConfig,
        sink: Arc<dyn LogSink>,
        fallback: Arc<dyn FallbackSink>,
    ) -> Self {
        let config = config.normalized();
        let runtime = Handle::current();

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let buffer = Arc::new(BatchBuffer::new(config.batch_size));
        let counters = Arc::new(Counters::default());
        let state = Arc::new(AtomicU8::new(WorkerState::Running as u8));
        let stop = CancellationToken::new();

        let dispatcher = Dispatcher {
            sink,
            fallback: Arc::clone(&fallback),
            counters: Arc::clone(&counters),
            runtime: runtime.clone(),
        };

        let worker = Worker {
            receiver,
            buffer: Arc::clone(&buffer),
            dispatcher: dispatcher.clone(),
            stop: stop.clone(),
            state: Arc::clone(&state),
            flush_interval: config.flush_interval,
        };
        let handle = runtime.spawn(worker.run());

        let shared = Shared {
            sender,
            buffer,
            dispatcher,
            fallback,
            counters,
            state,
            stop,
            worker: AsyncMutex::new(Some(handle)),
            min_severity: config.min_severity,
            service: config.service,
            environment: config.environment,
            hostname: resolve_hostname(),
        };

        Self {
            shared: Arc::new(shared),
            preset: BTreeMap::new(),
            prefix: String::new(),
        }
    }

    /// Create a handler posting to the Datadog intake described by
    /// `config`, falling back to standard error.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[cfg(feature = "datadog")]
    pub fn from_config(config: &HandlerConfig) -> Result<Self, reqwest::Error> {
        let sink = crate::datadog::DatadogSink::from_config(config)?;
        Ok(Self::new(
            config,
            Arc::new(sink),
            Arc::new(crate::fallback::StderrFallback),
        ))
    }

    /// Whether a record of `severity` would be accepted.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.shared.min_severity
    }

    /// Submit one record. Never blocks and never fails.
    ///
    /// Records below the minimum severity are ignored. Accepted records are
    /// written to the fallback sink, then queued; if the queue is full the
    /// record is dropped and a warning is written to the fallback sink.
    pub fn submit(&self, severity: Severity, message: impl Into<String>, attrs: Vec<Attr>) {
        if !self.enabled(severity) {
            return;
        }
        let shared = &self.shared;
        shared.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let entry = self.build_entry(severity, message.into(), &attrs);
        shared.fallback.write(&entry);

        match shared.sender.try_send(entry) {
            Ok(()) => {
                shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                shared.fallback.report(Severity::WARN, QUEUE_FULL_MESSAGE);
            }
            // Shutting down; the record already reached the fallback sink.
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Derive a view that adds `attrs` to every record it submits.
    ///
    /// The attributes are qualified by the groups opened on this view.
    pub fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut view = self.clone();
        flatten_into(&mut view.preset, &self.prefix, &attrs);
        view
    }

    /// Derive a view whose call-site attributes are nested under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        let mut view = self.clone();
        if !name.is_empty() {
            view.prefix = join_key(&self.prefix, name);
        }
        view
    }

    /// Flush whatever is buffered right now, without waiting for delivery.
    pub fn flush(&self) {
        if let Some(batch) = self.shared.buffer.drain() {
            self.shared.dispatcher.dispatch(batch);
        }
    }

    /// Stop the worker and wait until it has drained the queue and
    /// dispatched its final flush.
    ///
    /// Idempotent. Deliveries already in flight are not awaited.
    pub async fn close(&self) {
        let mut worker = self.shared.worker.lock().await;
        let Some(handle) = worker.take() else {
            return;
        };
        self.shared.stop.cancel();
        if let Err(e) = handle.await {
            self.shared
                .fallback
                .report(Severity::ERROR, &format!("datadog log worker failed: {}", e));
            self.shared.state.store(WorkerState::Stopped as u8, Ordering::Release);
        }
    }

    pub fn worker_state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Entries currently held in the batch buffer.
    pub fn buffered(&self) -> usize {
        self.shared.buffer.len()
    }

    pub fn stats(&self) -> HandlerStats {
        self.shared.counters.snapshot()
    }

    fn build_entry(&self, severity: Severity, message: String, attrs: &[Attr]) -> LogEntry {
        let shared = &self.shared;
        let mut attributes = self.preset.clone();
        flatten_into(&mut attributes, &self.prefix, attrs);

        LogEntry {
            message,
            status: Status::from(severity),
            service: shared.service.clone(),
            source: SOURCE.to_string(),
            host: shared.hostname.clone(),
            timestamp: Utc::now().timestamp_millis(),
            attributes,
            environment: shared.environment.clone(),
        }
    }
}

/// Owns the queue receiver; moves entries into the buffer and triggers
/// size and timer flushes.
struct Worker {
    receiver: mpsc::Receiver<LogEntry>,
    buffer: Arc<BatchBuffer>,
    dispatcher: Dispatcher,
    stop: CancellationToken,
    state: Arc<AtomicU8>,
    flush_interval: Duration,
}

impl Worker {
    async fn run(mut self) {
        debug!("datadog log worker started");
        let first_tick = Instant::now() + self.flush_interval;
        let mut ticker = time::interval_at(first_tick, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                Some(entry) = self.receiver.recv() => self.push(entry),
                _ = ticker.tick() => self.flush(),
            }
        }

        self.set_state(WorkerState::Draining);
        debug!("datadog log worker draining");
        self.receiver.close();
        while let Some(entry) = self.receiver.recv().await {
            self.push(entry);
        }
        self.flush();

        self.set_state(WorkerState::Stopped);
        debug!("datadog log worker stopped");
    }

    fn push(&self, entry: LogEntry) {
        if let Some(batch) = self.buffer.push(entry) {
            self.dispatcher.dispatch(batch);
        }
    }

    fn flush(&self) {
        if let Some(batch) = self.buffer.drain() {
            self.dispatcher.dispatch(batch);
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
