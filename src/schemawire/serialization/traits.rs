//! Core trait implemented by the schema-bound codecs.

use serde_json::Value;

use super::error::SerializationError;

/// An encoder/decoder bound to one schema document fetched from the
/// registry. Payloads are dynamic JSON values; the codec owns the mapping
/// between JSON and its format's binary representation.
pub trait SchemaCodec: Send + Sync {
    /// Human-readable format name for logs and diagnostics.
    fn format_name(&self) -> &'static str;

    /// Pre-encode validation for engines that expose an explicit
    /// verification step. `Some` carries the engine's description of the
    /// mismatch and aborts encoding; the default accepts everything and
    /// leaves validation to `serialize`.
    fn verify(&self, value: &Value) -> Option<String> {
        let _ = value;
        None
    }

    /// Encodes a JSON payload into the format's raw bytes, without any
    /// wire-format framing.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, SerializationError>;

    /// Decodes raw payload bytes (framing already stripped) back into JSON.
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, SerializationError>;
}
