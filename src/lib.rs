//! # schemawire
//!
//! A client library for Confluent-style schema registries: register and
//! fetch schemas over REST, frame encoded messages with the five byte
//! wire envelope, and encode/decode dynamic JSON payloads through
//! schema-bound Avro and Protobuf codecs.
//!
//! ## Features
//!
//! - **Registry Client**: subjects, versions, compatibility checks,
//!   global config, mode, and server info over `reqwest`, with a fixed
//!   linear retry policy applied to every request
//! - **Wire Framing**: the magic-byte envelope (`0x00` + big-endian
//!   schema id) shared by registry-aware producers and consumers
//! - **Dynamic Codecs**: Avro schemas and protobufjs-style JSON
//!   descriptors bound at call time; payloads are `serde_json` values,
//!   nothing is compiled in
//! - **Explicit Caching**: converters fetch on every call; a
//!   caller-owned `SchemaCache` makes memoization and invalidation
//!   visible at the call site
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schemawire::{AvroConverter, SchemaRegistryClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SchemaRegistryClient::new("http://localhost:8081")
//!         .with_auth("user", "secret");
//!
//!     let schema = json!({
//!         "type": "record",
//!         "name": "Order",
//!         "fields": [{ "name": "id", "type": "long" }]
//!     });
//!     let id = client.register_schema("orders-value", &schema).await?;
//!     println!("registered as schema {}", id);
//!
//!     let converter = AvroConverter::new(client);
//!     let framed = converter
//!         .encode_message("orders-value", &json!({ "id": 42 }))
//!         .await?;
//!     let decoded = converter.decode_message(&framed).await?;
//!     println!("{}", decoded);
//!     Ok(())
//! }
//! ```

pub mod schemawire;

// Re-export the main API at the crate root.
pub use schemawire::converter::{
    AvroBinding, AvroConverter, CodecBinding, ConverterError, MessageConverter, ProtobufBinding,
    ProtobufConverter,
};
pub use schemawire::registry::{
    BasicAuth, CompatibilityCheck, GlobalCompatibility, RegistryError, RegistryMode,
    RegistryResult, RetryPolicy, SchemaCache, SchemaDocument, SchemaRegistryClient, ServerInfo,
};
pub use schemawire::serialization::{
    AvroCodec, MessageDescriptor, ProtoDescriptor, ProtoField, ProtoType, ProtobufCodec,
    SchemaCodec, SerializationError,
};
pub use schemawire::wire::{WireEnvelope, WireError, MAGIC_BYTE, WIRE_HEADER_LEN};
