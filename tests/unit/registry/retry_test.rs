//! Retry behavior: attempt counting, undiscriminating failure handling,
//! and recovery once a later attempt succeeds.

use std::time::{Duration, Instant};

use schemawire::{RetryPolicy, SchemaRegistryClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const FAIL: &str =
    "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\nconnection: close\r\n\r\nboom";
const OK_SUBJECTS: &str =
    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n[]";

/// Serves one canned response per accepted connection, in order. Needed
/// because the mock server cannot vary its response across requests to
/// the same path.
async fn spawn_sequence_server(responses: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub server should bind");
    let addr = listener
        .local_addr()
        .expect("stub server should expose an address");
    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_failures_exhaust_every_attempt() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects")
        .with_status(500)
        .with_body("boom")
        .expect(3)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url())
        .with_retry(RetryPolicy::default().with_retry_delay_ms(10));
    let error = client
        .get_all_subjects()
        .await
        .expect_err("all attempts should fail");

    let message = error.to_string();
    assert!(
        message.starts_with("Failed to fetch"),
        "unexpected error: {}",
        message
    );
    assert!(
        message.contains("after 3 attempts"),
        "unexpected error: {}",
        message
    );
    assert!(
        message.contains("HTTP error: 500 Internal Server Error. Body: boom"),
        "unexpected error: {}",
        message
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_retried_like_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects")
        .with_status(404)
        .with_body("not here")
        .expect(2)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url())
        .with_retry(RetryPolicy::default().with_retries(2).with_retry_delay_ms(10));
    let error = client
        .get_all_subjects()
        .await
        .expect_err("attempts should not stop early on a 404");

    let message = error.to_string();
    assert!(
        message.contains("after 2 attempts"),
        "unexpected error: {}",
        message
    );
    assert!(
        message.contains("HTTP error: 404 Not Found. Body: not here"),
        "unexpected error: {}",
        message
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects")
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url())
        .with_retry(RetryPolicy::default().with_retries(0).with_retry_delay_ms(10));
    let error = client
        .get_all_subjects()
        .await
        .expect_err("the single attempt should fail");

    assert!(
        error.to_string().contains("after 1 attempts"),
        "unexpected error: {}",
        error
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    // Nothing listens on the reserved port, so every attempt fails at
    // the connection stage.
    let client = SchemaRegistryClient::new("http://127.0.0.1:1")
        .with_retry(RetryPolicy::default().with_retries(2).with_retry_delay_ms(10));
    let error = client
        .get_all_subjects()
        .await
        .expect_err("connections should be refused");

    let message = error.to_string();
    assert!(
        message.starts_with("Failed to fetch"),
        "unexpected error: {}",
        message
    );
    assert!(
        message.contains("after 2 attempts"),
        "unexpected error: {}",
        message
    );
}

#[tokio::test]
async fn test_recovery_after_failed_attempts() {
    let url = spawn_sequence_server(vec![FAIL, FAIL, OK_SUBJECTS]).await;
    let client = SchemaRegistryClient::new(url)
        .with_retry(RetryPolicy::default().with_retries(3).with_retry_delay_ms(50));

    let started = Instant::now();
    let subjects = client
        .get_all_subjects()
        .await
        .expect("third attempt should succeed");

    assert!(subjects.is_empty());
    // Two failures mean two fixed delays before the successful attempt.
    assert!(
        started.elapsed() >= Duration::from_millis(100),
        "expected two retry delays, got {:?}",
        started.elapsed()
    );
}
