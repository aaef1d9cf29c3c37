//! Registry operations against a mock server: request shapes, response
//! parsing, and header composition.

use mockito::Matcher;
use schemawire::{RetryPolicy, SchemaRegistryClient};
use serde_json::json;

fn quick_retry() -> RetryPolicy {
    RetryPolicy::default().with_retry_delay_ms(10)
}

#[tokio::test]
async fn test_register_schema_double_stringifies_the_body() {
    let mut server = mockito::Server::new_async().await;
    let schema = json!({
        "type": "record",
        "name": "User",
        "fields": [{ "name": "name", "type": "string" }]
    });
    // The body carries the schema as a JSON string field, not as nested
    // JSON.
    let expected_body = json!({ "schema": schema.to_string() }).to_string();
    let mock = server
        .mock("POST", "/subjects/user-topic/versions")
        .match_header("content-type", "application/json")
        .match_body(Matcher::JsonString(expected_body))
        .with_status(200)
        .with_body(r#"{"id": 1}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let id = client
        .register_schema("user-topic", &schema)
        .await
        .expect("registration should succeed");

    assert_eq!(id, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_schema_by_id_fills_id_from_the_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/schemas/ids/7")
        .with_body(r#"{"schema": "{\"type\":\"string\"}"}"#)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let document = client
        .get_schema_by_id(7)
        .await
        .expect("lookup by id should succeed");

    assert_eq!(document.id, 7);
    assert_eq!(document.subject, None);
    assert_eq!(document.version, None);
    assert_eq!(document.schema, "{\"type\":\"string\"}");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_schema_by_version_and_latest() {
    let mut server = mockito::Server::new_async().await;
    let body = json!({
        "subject": "orders-value",
        "version": 3,
        "id": 42,
        "schema": "{\"type\":\"string\"}"
    })
    .to_string();
    let latest = server
        .mock("GET", "/subjects/orders-value/versions/latest")
        .with_body(&body)
        .create_async()
        .await;
    let pinned = server
        .mock("GET", "/subjects/orders-value/versions/3")
        .with_body(&body)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let document = client
        .get_latest_schema("orders-value")
        .await
        .expect("latest lookup should succeed");
    assert_eq!(document.id, 42);
    assert_eq!(document.subject.as_deref(), Some("orders-value"));
    assert_eq!(document.version, Some(3));

    let document = client
        .get_schema_by_version("orders-value", "3")
        .await
        .expect("pinned lookup should succeed");
    assert_eq!(document.id, 42);

    latest.assert_async().await;
    pinned.assert_async().await;
}

#[tokio::test]
async fn test_listing_versions_and_subjects() {
    let mut server = mockito::Server::new_async().await;
    let versions = server
        .mock("GET", "/subjects/orders-value/versions")
        .with_body("[1, 2, 3]")
        .create_async()
        .await;
    let subjects = server
        .mock("GET", "/subjects")
        .with_body(r#"["orders-value", "payments-value"]"#)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    assert_eq!(
        client
            .get_all_versions("orders-value")
            .await
            .expect("versions should parse"),
        vec![1, 2, 3]
    );
    assert_eq!(
        client
            .get_all_subjects()
            .await
            .expect("subjects should parse"),
        vec!["orders-value".to_string(), "payments-value".to_string()]
    );

    versions.assert_async().await;
    subjects.assert_async().await;
}

#[tokio::test]
async fn test_delete_subject() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/subjects/orders-value")
        .with_body("[1, 2]")
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    client
        .delete_subject("orders-value")
        .await
        .expect("delete should succeed");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_check_compatibility_sends_the_schema_as_is() {
    let mut server = mockito::Server::new_async().await;
    let schema = json!({
        "type": "record",
        "name": "User",
        "fields": [{ "name": "name", "type": "string" }]
    });
    // Single-encoded body, unlike registration.
    let mock = server
        .mock("POST", "/compatibility/subjects/user-topic/versions/latest")
        .match_body(Matcher::JsonString(schema.to_string()))
        .with_body(r#"{"is_compatible": true}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let result = client
        .check_compatibility("user-topic", "latest", &schema)
        .await
        .expect("compatibility check should succeed");

    assert!(result.is_compatible);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_global_compatibility_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/config")
        .with_body(r#"{"compatibilityLevel": "FULL"}"#)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/config")
        .match_body(Matcher::JsonString(
            json!({ "compatibility": "BACKWARD" }).to_string(),
        ))
        .with_body(r#"{"compatibility": "BACKWARD"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let config = client
        .get_global_compatibility()
        .await
        .expect("config should parse");
    assert_eq!(config.compatibility_level, "FULL");

    client
        .set_global_compatibility("BACKWARD")
        .await
        .expect("setting compatibility should succeed");

    get.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_mode_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/mode")
        .with_body(r#"{"mode": "READWRITE"}"#)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/mode")
        .match_body(Matcher::JsonString(json!({ "mode": "READONLY" }).to_string()))
        .with_body(r#"{"mode": "READONLY"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    assert_eq!(client.get_mode().await.expect("mode should parse").mode, "READWRITE");
    client
        .set_mode("READONLY")
        .await
        .expect("setting mode should succeed");

    get.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_server_info_tolerates_an_empty_object() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_body("{}")
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    let info = client
        .get_server_info()
        .await
        .expect("server info should parse");

    assert_eq!(info.version, None);
    assert_eq!(info.url, None);
    assert_eq!(info.compatibility, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let mut server = mockito::Server::new_async().await;
    // base64("user:pass")
    let mock = server
        .mock("GET", "/subjects")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .match_header("client-id", "pipeline-7")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url())
        .with_auth("user", "pass")
        .with_client_id("pipeline-7");
    client
        .get_all_subjects()
        .await
        .expect("request with full headers should succeed");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_optional_headers_are_absent_when_not_configured() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects")
        .match_header("content-type", "application/json")
        .match_header("authorization", Matcher::Missing)
        .match_header("client-id", Matcher::Missing)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url());
    client
        .get_all_subjects()
        .await
        .expect("request without optional headers should succeed");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_response_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/mode")
        .with_body("not json")
        .create_async()
        .await;

    let client = SchemaRegistryClient::new(server.url()).with_retry(quick_retry());
    let error = client.get_mode().await.expect_err("parse must fail");
    let message = error.to_string();
    assert!(
        message.starts_with("Failed to parse response from"),
        "unexpected error: {}",
        message
    );
    assert!(message.contains("/mode"), "unexpected error: {}", message);
}
