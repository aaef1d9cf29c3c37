//! Message converters: registry lookup, codec binding, and wire framing.
//!
//! A converter owns a [`SchemaRegistryClient`] and a binding that turns a
//! fetched schema document into a [`SchemaCodec`]. Encoding fetches the
//! subject's latest schema, verifies and serializes the payload, and
//! frames it with the schema id; decoding splits the frame, fetches the
//! schema by id, and deserializes the payload. Every call fetches from
//! the registry; callers that want memoization use
//! [`SchemaCache`](super::registry::SchemaCache) explicitly.

use serde_json::Value as JsonValue;

use super::registry::{RegistryError, SchemaRegistryClient};
use super::serialization::{AvroCodec, ProtobufCodec, SchemaCodec, SerializationError};
use super::wire::{self, WireError};

/// Builds a schema-bound codec from a schema document's text.
pub trait CodecBinding: Send + Sync {
    type Codec: SchemaCodec;

    fn bind(&self, schema: &str) -> Result<Self::Codec, SerializationError>;
}

/// Binding for Avro: the document text is itself the Avro schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroBinding;

impl CodecBinding for AvroBinding {
    type Codec = AvroCodec;

    fn bind(&self, schema: &str) -> Result<AvroCodec, SerializationError> {
        AvroCodec::new(schema)
    }
}

/// Binding for Protobuf: the document text is parsed as JSON first, then
/// interpreted as a protobufjs-style descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufBinding;

impl CodecBinding for ProtobufBinding {
    type Codec = ProtobufCodec;

    fn bind(&self, schema: &str) -> Result<ProtobufCodec, SerializationError> {
        let document: JsonValue = serde_json::from_str(schema).map_err(|e| {
            SerializationError::json_error("Failed to parse Protobuf schema JSON", e)
        })?;
        ProtobufCodec::from_schema_json(&document)
    }
}

/// Encoder/decoder for registry-framed messages in one format.
#[derive(Debug, Clone)]
pub struct MessageConverter<B: CodecBinding> {
    registry: SchemaRegistryClient,
    binding: B,
}

pub type AvroConverter = MessageConverter<AvroBinding>;
pub type ProtobufConverter = MessageConverter<ProtobufBinding>;

impl AvroConverter {
    pub fn new(registry: SchemaRegistryClient) -> Self {
        Self {
            registry,
            binding: AvroBinding,
        }
    }
}

impl ProtobufConverter {
    pub fn new(registry: SchemaRegistryClient) -> Self {
        Self {
            registry,
            binding: ProtobufBinding,
        }
    }
}

impl<B: CodecBinding> MessageConverter<B> {
    pub fn with_binding(registry: SchemaRegistryClient, binding: B) -> Self {
        Self { registry, binding }
    }

    pub fn registry(&self) -> &SchemaRegistryClient {
        &self.registry
    }

    /// Encodes a payload against the subject's latest schema and frames
    /// it with that schema's id.
    pub async fn encode_message(
        &self,
        subject: &str,
        payload: &JsonValue,
    ) -> Result<Vec<u8>, ConverterError> {
        let document = self.registry.get_latest_schema(subject).await?;
        let codec = self.binding.bind(&document.schema)?;
        if let Some(description) = codec.verify(payload) {
            return Err(SerializationError::SchemaMismatch(description).into());
        }
        let encoded = codec.serialize(payload)?;
        log::debug!(
            "Encoded {} payload for subject {} with schema id {}",
            codec.format_name(),
            subject,
            document.id
        );
        Ok(wire::encode(document.id, &encoded))
    }

    /// Decodes a framed message by fetching the schema its envelope names.
    /// The envelope's magic byte is not validated.
    pub async fn decode_message(&self, buffer: &[u8]) -> Result<JsonValue, ConverterError> {
        let envelope = wire::decode(buffer)?;
        let document = self.registry.get_schema_by_id(envelope.schema_id).await?;
        let codec = self.binding.bind(&document.schema)?;
        let decoded = codec.deserialize(envelope.payload)?;
        log::debug!(
            "Decoded {} payload with schema id {}",
            codec.format_name(),
            envelope.schema_id
        );
        Ok(decoded)
    }
}

/// Any failure on the encode or decode path, keeping the underlying error
/// domain visible: registry transport and HTTP failures, framing
/// failures, and schema or engine failures.
#[derive(Debug)]
pub enum ConverterError {
    Registry(RegistryError),
    Wire(WireError),
    Serialization(SerializationError),
}

impl std::fmt::Display for ConverterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterError::Registry(e) => write!(f, "{}", e),
            ConverterError::Wire(e) => write!(f, "{}", e),
            ConverterError::Serialization(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConverterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConverterError::Registry(e) => Some(e),
            ConverterError::Wire(e) => Some(e),
            ConverterError::Serialization(e) => Some(e),
        }
    }
}

impl From<RegistryError> for ConverterError {
    fn from(error: RegistryError) -> Self {
        ConverterError::Registry(error)
    }
}

impl From<WireError> for ConverterError {
    fn from(error: WireError) -> Self {
        ConverterError::Wire(error)
    }
}

impl From<SerializationError> for ConverterError {
    fn from(error: SerializationError) -> Self {
        ConverterError::Serialization(error)
    }
}
