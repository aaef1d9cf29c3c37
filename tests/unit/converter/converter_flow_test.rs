//! Full converter flows against a mock registry: subject lookup on
//! encode, id lookup on decode, exact framed bytes, and the error
//! surface callers see.

use schemawire::{
    AvroConverter, ConverterError, ProtobufConverter, RetryPolicy, SchemaRegistryClient,
};
use serde_json::json;

const KEY_SCHEMA: &str =
    r#"{"type": "record", "name": "Key", "fields": [{"name": "f", "type": "string"}]}"#;

fn quick_client(url: String) -> SchemaRegistryClient {
    SchemaRegistryClient::new(url)
        .with_retry(RetryPolicy::default().with_retries(1).with_retry_delay_ms(10))
}

fn latest_body(subject: &str, id: u32, schema: &str) -> String {
    json!({
        "subject": subject,
        "version": 1,
        "id": id,
        "schema": schema
    })
    .to_string()
}

fn by_id_body(schema: &str) -> String {
    json!({ "schema": schema }).to_string()
}

#[tokio::test]
async fn test_avro_encode_frames_with_the_latest_schema_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects/user-topic/versions/latest")
        .with_body(latest_body("user-topic", 7, KEY_SCHEMA))
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let framed = converter
        .encode_message("user-topic", &json!({"f": "x"}))
        .await
        .expect("encoding should succeed");

    // Magic byte, big-endian schema id 7, then the raw Avro datum.
    assert_eq!(framed, vec![0x00, 0x00, 0x00, 0x00, 0x07, 0x02, 0x78]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_avro_decode_fetches_the_envelope_schema_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/schemas/ids/7")
        .with_body(by_id_body(KEY_SCHEMA))
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let decoded = converter
        .decode_message(&[0x00, 0x00, 0x00, 0x00, 0x07, 0x02, 0x78])
        .await
        .expect("decoding should succeed");

    assert_eq!(decoded, json!({"f": "x"}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_decode_accepts_any_magic_byte() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/schemas/ids/7")
        .with_body(by_id_body(KEY_SCHEMA))
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let decoded = converter
        .decode_message(&[0x2A, 0x00, 0x00, 0x00, 0x07, 0x02, 0x78])
        .await
        .expect("an unknown magic byte should not block decoding");
    assert_eq!(decoded, json!({"f": "x"}));
}

#[tokio::test]
async fn test_protobuf_round_trip_through_the_registry() {
    let mut server = mockito::Server::new_async().await;
    let descriptor = json!({
        "nested": {
            "TestMessage": {
                "fields": {
                    "field1": { "type": "string", "id": 1 }
                }
            }
        }
    })
    .to_string();
    let latest = server
        .mock("GET", "/subjects/proto-topic/versions/latest")
        .with_body(latest_body("proto-topic", 9, &descriptor))
        .create_async()
        .await;
    let by_id = server
        .mock("GET", "/schemas/ids/9")
        .with_body(by_id_body(&descriptor))
        .create_async()
        .await;

    let converter = ProtobufConverter::new(quick_client(server.url()));
    let framed = converter
        .encode_message("proto-topic", &json!({"field1": "x"}))
        .await
        .expect("encoding should succeed");
    assert_eq!(framed, vec![0x00, 0x00, 0x00, 0x00, 0x09, 0x0A, 0x01, 0x78]);

    let decoded = converter
        .decode_message(&framed)
        .await
        .expect("decoding should succeed");
    assert_eq!(decoded, json!({"field1": "x"}));

    latest.assert_async().await;
    by_id.assert_async().await;
}

#[tokio::test]
async fn test_protobuf_verify_failure_is_surfaced_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let descriptor = json!({
        "nested": {
            "TestMessage": {
                "fields": {
                    "field1": { "type": "string", "id": 1 }
                }
            }
        }
    })
    .to_string();
    let _mock = server
        .mock("GET", "/subjects/proto-topic/versions/latest")
        .with_body(latest_body("proto-topic", 9, &descriptor))
        .create_async()
        .await;

    let converter = ProtobufConverter::new(quick_client(server.url()));
    let error = converter
        .encode_message("proto-topic", &json!({"field1": 5}))
        .await
        .expect_err("a mistyped field must fail verification");

    assert_eq!(error.to_string(), "field \"field1\": string expected");
    assert!(matches!(error, ConverterError::Serialization(_)));
}

#[tokio::test]
async fn test_avro_mismatch_is_surfaced_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/subjects/user-topic/versions/latest")
        .with_body(latest_body("user-topic", 7, KEY_SCHEMA))
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let error = converter
        .encode_message("user-topic", &json!({"f": 12}))
        .await
        .expect_err("a mistyped field must fail conversion");

    assert_eq!(error.to_string(), "field \"f\": expected string, got number");
    assert!(matches!(error, ConverterError::Serialization(_)));
}

#[tokio::test]
async fn test_short_buffer_fails_before_any_fetch() {
    // No mock server at all: the framing error must come first.
    let converter = AvroConverter::new(quick_client("http://127.0.0.1:1".to_string()));
    let error = converter
        .decode_message(&[0x00, 0x00])
        .await
        .expect_err("a short buffer must fail");

    assert_eq!(
        error.to_string(),
        "buffer of 2 bytes is too short for the wire envelope: need at least 5"
    );
    assert!(matches!(error, ConverterError::Wire(_)));
}

#[tokio::test]
async fn test_every_decode_fetches_the_schema_again() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/schemas/ids/7")
        .with_body(by_id_body(KEY_SCHEMA))
        .expect(2)
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let frame = [0x00, 0x00, 0x00, 0x00, 0x07, 0x02, 0x78];
    converter
        .decode_message(&frame)
        .await
        .expect("first decode should succeed");
    converter
        .decode_message(&frame)
        .await
        .expect("second decode should succeed");

    // The converter holds no cache; both decodes hit the registry.
    mock.assert_async().await;
}

#[tokio::test]
async fn test_registry_failure_is_surfaced_as_a_registry_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/subjects/user-topic/versions/latest")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let converter = AvroConverter::new(quick_client(server.url()));
    let error = converter
        .encode_message("user-topic", &json!({"f": "x"}))
        .await
        .expect_err("the registry failure must surface");

    assert!(matches!(error, ConverterError::Registry(_)));
    assert!(
        error.to_string().starts_with("Failed to fetch"),
        "unexpected error: {}",
        error
    );
}
