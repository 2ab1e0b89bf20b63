//! Integration tests for the provider transport client.

mod support;

use std::time::Duration;

use broadside_transport::{HttpTransport, OutboundMessage, RetrySchedule, Transport, TransportError};
use support::mock_provider::{MockProvider, ScriptedResponse};

fn fast_schedule(max_attempts: u32) -> RetrySchedule {
    RetrySchedule {
        max_attempts,
        base_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

fn message() -> OutboundMessage {
    OutboundMessage {
        from: "news@example.com".to_string(),
        to: "a@x.com".to_string(),
        to_name: None,
        subject: "Hello".to_string(),
        html: "<p>Hi</p>".to_string(),
        reply_to: None,
        campaign_tag: "c1".to_string(),
    }
}

#[tokio::test]
async fn accepted_on_first_attempt() {
    let provider = MockProvider::start(vec![ScriptedResponse::status(202)])
        .await
        .unwrap();
    let transport = HttpTransport::new("key", provider.url(), fast_schedule(4)).unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(202));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.history.len(), 1);
    assert!(outcome.error.is_none());
    assert_eq!(provider.hits(), 1);
}

#[tokio::test]
async fn persistent_server_error_makes_exactly_max_attempts() {
    let provider = MockProvider::start(vec![ScriptedResponse::with_body(500, "boom")])
        .await
        .unwrap();
    let transport = HttpTransport::new("key", provider.url(), fast_schedule(4)).unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(outcome.history.len(), 4);
    assert_eq!(outcome.status_code, Some(500));
    assert_eq!(outcome.error.as_deref(), Some("boom"));
    assert_eq!(provider.hits(), 4);
}

#[tokio::test]
async fn permanent_client_error_never_retries() {
    let provider = MockProvider::start(vec![ScriptedResponse::with_body(400, "bad payload")])
        .await
        .unwrap();
    let transport = HttpTransport::new("key", provider.url(), fast_schedule(4)).unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.status_code, Some(400));
    assert_eq!(outcome.error.as_deref(), Some("bad payload"));
    assert_eq!(provider.hits(), 1);
}

#[tokio::test]
async fn recovers_after_retryable_failures() {
    let provider = MockProvider::start(vec![
        ScriptedResponse::status(500),
        ScriptedResponse::status(503),
        ScriptedResponse::status(202),
    ])
    .await
    .unwrap();
    let transport = HttpTransport::new("key", provider.url(), fast_schedule(4)).unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(outcome.history[0].status_code, Some(500));
    assert_eq!(outcome.history[1].status_code, Some(503));
    assert_eq!(outcome.history[2].status_code, Some(202));
    assert_eq!(provider.hits(), 3);
}

#[tokio::test]
async fn rate_limit_retry_after_hint_is_honored() {
    let provider = MockProvider::start(vec![
        ScriptedResponse::with_retry_after(429, 0),
        ScriptedResponse::status(202),
    ])
    .await
    .unwrap();
    let transport = HttpTransport::new("key", provider.url(), fast_schedule(4)).unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(provider.hits(), 2);
}

#[tokio::test]
async fn network_errors_are_retried_and_reported_without_status() {
    // Bind then drop a listener so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(
        "key",
        format!("http://{addr}/v3/mail/send"),
        fast_schedule(3),
    )
    .unwrap();

    let outcome = transport.send(&message()).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.status_code, None);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.history.iter().all(|a| a.status_code.is_none()));
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_fault() {
    let provider = MockProvider::start(vec![ScriptedResponse::status(202)])
        .await
        .unwrap();
    let transport = HttpTransport::new("", provider.url(), fast_schedule(4)).unwrap();

    let err = transport.send(&message()).await.unwrap_err();

    assert!(matches!(err, TransportError::Configuration(_)));
    assert_eq!(provider.hits(), 0);
}
