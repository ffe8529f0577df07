#![cfg(feature = "datadog")]

mod common;

use common::{wait_until, RecordingFallback};
use datadog_log_sink::datadog::{DatadogSink, DeliveryError};
use datadog_log_sink::{Attr, DatadogHandler, HandlerConfig, LogEntry, Severity, Status};
use mockito::{Matcher, Server};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn config_for(url: String, api_key: &str) -> HandlerConfig {
    HandlerConfig {
        api_key: api_key.to_string(),
        endpoint: Some(url),
        environment: "test".to_string(),
        batch_size: 2,
        flush_interval: Duration::from_secs(3600),
        timeout: Duration::from_secs(2),
        ..HandlerConfig::default()
    }
}

fn handler_for(config: &HandlerConfig, fallback: Arc<RecordingFallback>) -> DatadogHandler {
    let sink = DatadogSink::from_config(config).expect("build sink");
    DatadogHandler::new(config, Arc::new(sink), fallback)
}

fn entry(message: &str) -> LogEntry {
    LogEntry {
        message: message.to_string(),
        status: Status::Info,
        service: "svc".to_string(),
        source: "datadog-cli".to_string(),
        host: "host-1".to_string(),
        timestamp: 1_700_000_000_000,
        attributes: BTreeMap::new(),
        environment: String::new(),
    }
}

#[tokio::test]
async fn handler_posts_batch_to_intake() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/logs")
        .match_header("DD-API-KEY", "test-api-key")
        .match_header("Content-Type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""message":"first".*"message":"second""#.to_string()),
            Matcher::Regex(r#""env":"test""#.to_string()),
            Matcher::Regex(r#""ddsource":"datadog-cli""#.to_string()),
            Matcher::Regex(r#""order.id":17"#.to_string()),
        ]))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let fallback = Arc::new(RecordingFallback::default());
    let config = config_for(format!("{}/api/v2/logs", server.url()), "test-api-key");
    let handler = handler_for(&config, fallback.clone());

    let order = Attr::group("order", vec![Attr::new("id", 17)]);
    handler.submit(Severity::INFO, "first", vec![order]);
    handler.submit(Severity::ERROR, "second", vec![]);
    handler.close().await;

    let delivered = wait_until(Duration::from_secs(3), || {
        let handler = handler.clone();
        async move { handler.stats().batches_delivered == 1 }
    })
    .await;
    assert!(delivered);
    mock.assert_async().await;
    assert!(fallback.reports().is_empty());
    assert_eq!(fallback.written_count(), 2);
}

#[tokio::test]
async fn rejected_batch_is_reported_with_status() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/logs")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let fallback = Arc::new(RecordingFallback::default());
    let config = config_for(format!("{}/api/v2/logs", server.url()), "test-api-key");
    let handler = handler_for(&config, fallback.clone());

    handler.submit(Severity::WARN, "will be rejected", vec![]);
    handler.close().await;

    let reported = wait_until(Duration::from_secs(3), || {
        let fallback = fallback.clone();
        async move { !fallback.reports().is_empty() }
    })
    .await;
    assert!(reported);

    let reports = fallback.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("500"));
    assert_eq!(handler.stats().batches_failed, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_api_key_makes_no_network_calls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let fallback = Arc::new(RecordingFallback::default());
    let config = HandlerConfig {
        queue_capacity: 2000,
        batch_size: 20,
        ..config_for(format!("{}/api/v2/logs", server.url()), "")
    };
    let handler = handler_for(&config, fallback.clone());

    for i in 0..1000 {
        handler.submit(Severity::INFO, format!("entry {}", i), vec![]);
    }
    handler.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = handler.stats();
    assert_eq!(stats.enqueued, 1000);
    assert_eq!(stats.batches_delivered, 0);
    assert_eq!(stats.batches_failed, 0);
    assert_eq!(handler.buffered(), 0);
    mock.assert_async().await;
    assert!(fallback.reports().is_empty());
    assert_eq!(fallback.written_count(), 1000);
}

#[tokio::test]
async fn sink_maps_non_success_status_to_rejection() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v2/logs")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let sink = DatadogSink::new(
        format!("{}/api/v2/logs", server.url()),
        "bad-key",
        Duration::from_secs(2),
    )
    .unwrap();

    match sink.deliver(&[entry("denied")]).await {
        Err(DeliveryError::Rejected { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn sink_sends_exact_json_array() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/logs")
        .match_body(Matcher::Json(serde_json::json!([
            {
                "message": "one",
                "status": "info",
                "service": "svc",
                "ddsource": "datadog-cli",
                "hostname": "host-1",
                "timestamp": 1_700_000_000_000i64
            },
            {
                "message": "two",
                "status": "info",
                "service": "svc",
                "ddsource": "datadog-cli",
                "hostname": "host-1",
                "timestamp": 1_700_000_000_000i64
            }
        ])))
        .with_status(202)
        .create_async()
        .await;

    let url = format!("{}/api/v2/logs", server.url());
    let sink = DatadogSink::new(url, "k", Duration::from_secs(2)).unwrap();

    sink.deliver(&[entry("one"), entry("two")]).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_intake_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let sink = DatadogSink::new(
        format!("http://127.0.0.1:{}/api/v2/logs", port),
        "k",
        Duration::from_millis(500),
    )
    .unwrap();

    let err = sink.deliver(&[entry("nowhere")]).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Transport(_)));
}
