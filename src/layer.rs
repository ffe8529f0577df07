use crate::attrs::Attr;
use crate::handler::DatadogHandler;
use crate::severity::Severity;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Crates whose events are never forwarded: this crate and the HTTP stack
/// used for delivery. Forwarding them would turn every delivery into new
/// entries for the next batch.
const IGNORED_TARGETS: &[&str] = &[
    "datadog_log_sink",
    "hyper",
    "reqwest",
    "h2",
    "rustls",
    "want",
];

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|prefix| {
        match target.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with("::") || rest.starts_with('_'),
            None => false,
        }
    })
}

/// `tracing_subscriber` layer that turns events into submissions on a
/// [`DatadogHandler`].
///
/// The `message` field becomes the entry message and the remaining event
/// fields become top-level attributes. Fields of every span in scope are
/// attached as a group named after the span, so `request{id=7}` yields
/// `request.id`. Source location is added as `file`, `line` and
/// `logger.name`.
pub struct DatadogLayer {
    handler: DatadogHandler,
}

impl DatadogLayer {
    pub fn new(handler: DatadogHandler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &DatadogHandler {
        &self.handler
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(Vec<Attr>);

impl<S> Layer<S> for DatadogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.into_span_fields()));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            fields.extend(visitor.into_span_fields());
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_ignored_target(meta.target()) {
            return;
        }
        let severity = Severity::from(*meta.level());
        if !self.handler.enabled(severity) {
            return;
        }

        let mut attrs = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(SpanFields(fields)) = extensions.get::<SpanFields>() {
                    if !fields.is_empty() {
                        attrs.push(Attr::group(span.name(), fields.clone()));
                    }
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        attrs.extend(visitor.fields);

        if let Some(file) = meta.file() {
            attrs.push(Attr::new("file", file));
        }
        if let Some(line) = meta.line() {
            attrs.push(Attr::new("line", line));
        }
        attrs.push(Attr::group("logger", vec![Attr::new("name", meta.target())]));

        self.handler.submit(severity, visitor.message.unwrap_or_default(), attrs);
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: Vec<Attr>,
    message: Option<String>,
}

impl FieldVisitor {
    /// Spans have no message of their own; keep it as a plain field.
    fn into_span_fields(mut self) -> Vec<Attr> {
        if let Some(message) = self.message.take() {
            self.fields.push(Attr::new("message", message));
        }
        self.fields
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(Attr::new(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push(Attr::new(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push(Attr::new(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push(Attr::new(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push(Attr::new(field.name(), value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push(Attr::new(field.name(), format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::fallback::FallbackSink;
    use crate::record::LogEntry;
    use crate::severity::Status;
    use crate::sink::LogSink;
    use async_trait::async_trait;
    use serde_json::json;
    use std::error::Error;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    struct ChannelSink(mpsc::UnboundedSender<Vec<LogEntry>>);

    #[async_trait]
    impl LogSink for ChannelSink {
        async fn send_batch(
            &self,
            batch: &[LogEntry],
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            let _ = self.0.send(batch.to_vec());
            Ok(())
        }
    }

    struct Silent;

    impl FallbackSink for Silent {
        fn write(&self, _entry: &LogEntry) {}
        fn report(&self, _severity: Severity, _message: &str) {}
    }

    fn channel_handler() -> (DatadogHandler, mpsc::UnboundedReceiver<Vec<LogEntry>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = HandlerConfig {
            min_severity: Severity::DEBUG,
            batch_size: 100,
            flush_interval: Duration::from_secs(3600),
            ..HandlerConfig::default()
        };
        let handler = DatadogHandler::new(&config, Arc::new(ChannelSink(tx)), Arc::new(Silent));
        (handler, rx)
    }

    #[tokio::test]
    async fn events_become_entries_with_span_groups() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = HandlerConfig {
            batch_size: 100,
            flush_interval: Duration::from_secs(3600),
            ..HandlerConfig::default()
        };
        let handler = DatadogHandler::new(&config, Arc::new(ChannelSink(tx)), Arc::new(Silent));
        let subscriber = Registry::default().with(DatadogLayer::new(handler.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("request", id = 7, path = "/health");
            let _guard = span.enter();
            tracing::debug!(target: "auth", "filtered out by min severity");
            tracing::error!(target: "auth", user_id = 42, retry = false, "authentication failed");
            tracing::error!(target: "datadog_log_sink::handler", "internal");
        });
        handler.close().await;

        let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.len(), 1);

        let entry = &batch[0];
        assert_eq!(entry.message, "authentication failed");
        assert_eq!(entry.status, Status::Error);
        assert_eq!(entry.attributes["user_id"], json!(42));
        assert_eq!(entry.attributes["retry"], json!(false));
        assert_eq!(entry.attributes["request.id"], json!(7));
        assert_eq!(entry.attributes["request.path"], json!("/health"));
        assert!(entry.attributes.contains_key("file"));
        assert!(entry.attributes.contains_key("line"));
        assert_eq!(entry.attributes["logger.name"], json!("auth"));
    }

    #[tokio::test]
    async fn fields_recorded_after_creation_join_the_span_group() {
        let (handler, mut rx) = channel_handler();
        let subscriber = Registry::default().with(DatadogLayer::new(handler.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("job", id = 3, outcome = tracing::field::Empty);
            span.record("outcome", "retried");
            let _guard = span.enter();
            tracing::info!(target: "worker", "job finished");
        });
        handler.close().await;

        let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let entry = &batch[0];
        assert_eq!(entry.attributes["job.id"], json!(3));
        assert_eq!(entry.attributes["job.outcome"], json!("retried"));
    }

    #[tokio::test]
    async fn http_stack_events_are_not_forwarded() {
        let (handler, mut rx) = channel_handler();
        let subscriber = Registry::default().with(DatadogLayer::new(handler.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "hyper::proto::h1::io", "flushed 357 bytes");
            tracing::debug!(target: "hyper_util::client", "connecting");
            tracing::debug!(target: "reqwest::connect", "starting new connection");
            tracing::debug!(target: "hyperloop", "kept");
        });
        handler.close().await;

        let batch = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let targets: Vec<_> = batch
            .iter()
            .map(|e| e.attributes["logger.name"].clone())
            .collect();
        assert_eq!(targets, [json!("hyperloop")]);
    }

    #[test]
    fn ignored_targets_match_whole_crate_names() {
        assert!(is_ignored_target("datadog_log_sink::handler"));
        assert!(is_ignored_target("hyper"));
        assert!(is_ignored_target("hyper::client::connect::http"));
        assert!(is_ignored_target("rustls::client::hs"));
        assert!(!is_ignored_target("hyperloop"));
        assert!(!is_ignored_target("app"));
    }
}
