//! Error types for schema binding and payload conversion.

use std::fmt;

/// Errors produced while binding schema documents and converting payloads.
///
/// `SchemaMismatch` carries the engine's own description of why a payload
/// does not fit its schema and displays it verbatim, so callers see exactly
/// what the verification step reported.
#[derive(Debug)]
pub enum SerializationError {
    /// Payload could not be encoded with the bound schema.
    SerializationFailed(String),
    /// Bytes could not be decoded with the bound schema.
    DeserializationFailed(String),
    /// Schema document could not be parsed or bound to an engine.
    SchemaError(String),
    /// Payload failed the engine's schema verification.
    SchemaMismatch(String),
    /// Schema form or value has no representation in this crate.
    UnsupportedType(String),
    /// Underlying Avro engine failure.
    AvroError {
        message: String,
        source: apache_avro::Error,
    },
    /// Underlying Protobuf wire decoding failure.
    ProtobufError {
        message: String,
        source: prost::DecodeError,
    },
    /// Underlying JSON parsing failure.
    JsonError {
        message: String,
        source: serde_json::Error,
    },
}

impl SerializationError {
    pub fn avro_error(message: impl Into<String>, source: apache_avro::Error) -> Self {
        SerializationError::AvroError {
            message: message.into(),
            source,
        }
    }

    pub fn protobuf_error(message: impl Into<String>, source: prost::DecodeError) -> Self {
        SerializationError::ProtobufError {
            message: message.into(),
            source,
        }
    }

    pub fn json_error(message: impl Into<String>, source: serde_json::Error) -> Self {
        SerializationError::JsonError {
            message: message.into(),
            source,
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::SerializationFailed(msg) => {
                write!(f, "Serialization failed: {}", msg)
            }
            SerializationError::DeserializationFailed(msg) => {
                write!(f, "Deserialization failed: {}", msg)
            }
            SerializationError::SchemaError(msg) => write!(f, "Schema error: {}", msg),
            SerializationError::SchemaMismatch(msg) => write!(f, "{}", msg),
            SerializationError::UnsupportedType(msg) => write!(f, "Unsupported type: {}", msg),
            SerializationError::AvroError { message, source } => {
                write!(f, "{}: {}", message, source)
            }
            SerializationError::ProtobufError { message, source } => {
                write!(f, "{}: {}", message, source)
            }
            SerializationError::JsonError { message, source } => {
                write!(f, "{}: {}", message, source)
            }
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::AvroError { source, .. } => Some(source),
            SerializationError::ProtobufError { source, .. } => Some(source),
            SerializationError::JsonError { source, .. } => Some(source),
            _ => None,
        }
    }
}
