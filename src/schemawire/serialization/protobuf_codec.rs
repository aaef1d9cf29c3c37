//! Dynamic Protobuf codec driven by a JSON descriptor.
//!
//! There is no generated code here: fields are encoded and decoded one at
//! a time with the wire-format primitives from `prost::encoding`, guided
//! by the parsed descriptor. Unknown tags on the wire are skipped, absent
//! JSON fields are simply not written, and repeated scalars decode from
//! both packed and unpacked form. `verify` mirrors the explicit
//! protobufjs-style pre-encode check: its description is surfaced to the
//! caller verbatim.

use base64::{engine::general_purpose, Engine as _};
use prost::bytes::{Buf, Bytes};
use prost::encoding::{self, DecodeContext, WireType};
use prost::DecodeError;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::descriptor::{MessageDescriptor, ProtoDescriptor, ProtoField, ProtoType};
use super::error::SerializationError;
use super::traits::SchemaCodec;

/// Encoder/decoder for one descriptor's root message.
pub struct ProtobufCodec {
    descriptor: ProtoDescriptor,
}

impl ProtobufCodec {
    pub fn new(descriptor: ProtoDescriptor) -> Self {
        Self { descriptor }
    }

    /// Parses a descriptor document and binds a codec to its root message.
    pub fn from_schema_json(document: &JsonValue) -> Result<Self, SerializationError> {
        Ok(Self::new(ProtoDescriptor::from_json(document)?))
    }

    pub fn descriptor(&self) -> &ProtoDescriptor {
        &self.descriptor
    }

    fn verify_message(&self, message: &MessageDescriptor, value: &JsonValue) -> Option<String> {
        let object = match value {
            JsonValue::Object(object) => object,
            _ => return Some(format!("{}: object expected", message.name)),
        };
        for (key, field_value) in object {
            let field = match message.field_by_name(key) {
                Some(field) => field,
                None => {
                    return Some(format!(
                        "unknown field \"{}\" for message {}",
                        key, message.name
                    ))
                }
            };
            if field_value.is_null() {
                continue;
            }
            if field.repeated {
                let items = match field_value.as_array() {
                    Some(items) => items,
                    None => return Some(format!("field \"{}\": array expected", field.name)),
                };
                for item in items {
                    if let Some(description) = self.verify_field(field, item) {
                        return Some(description);
                    }
                }
            } else if let Some(description) = self.verify_field(field, field_value) {
                return Some(description);
            }
        }
        None
    }

    fn verify_field(&self, field: &ProtoField, value: &JsonValue) -> Option<String> {
        let expected = match &field.kind {
            ProtoType::Double | ProtoType::Float => {
                if value.is_number() {
                    return None;
                }
                "number"
            }
            ProtoType::Int32 | ProtoType::Sint32 | ProtoType::Sfixed32 => {
                match value.as_i64() {
                    Some(wide) if i32::try_from(wide).is_ok() => return None,
                    Some(_) => "32-bit integer",
                    None => "integer",
                }
            }
            ProtoType::Int64 | ProtoType::Sint64 | ProtoType::Sfixed64 => {
                if value.as_i64().is_some() {
                    return None;
                }
                "integer"
            }
            ProtoType::Uint32 | ProtoType::Fixed32 => match value.as_u64() {
                Some(wide) if u32::try_from(wide).is_ok() => return None,
                Some(_) => "unsigned 32-bit integer",
                None => "unsigned integer",
            },
            ProtoType::Uint64 | ProtoType::Fixed64 => {
                if value.as_u64().is_some() {
                    return None;
                }
                "unsigned integer"
            }
            ProtoType::Bool => {
                if value.is_boolean() {
                    return None;
                }
                "boolean"
            }
            ProtoType::String => {
                if value.is_string() {
                    return None;
                }
                "string"
            }
            ProtoType::Bytes => match value.as_str() {
                Some(s) if general_purpose::STANDARD.decode(s).is_ok() => return None,
                _ => "base64 string",
            },
            ProtoType::Message(type_name) => {
                let nested = match self.descriptor.message(type_name) {
                    Some(nested) => nested,
                    None => return Some(format!("unknown message type \"{}\"", type_name)),
                };
                return self.verify_message(nested, value);
            }
        };
        Some(format!("field \"{}\": {} expected", field.name, expected))
    }

    fn encode_message_fields(
        &self,
        message: &MessageDescriptor,
        object: &JsonMap<String, JsonValue>,
        buf: &mut Vec<u8>,
    ) -> Result<(), SerializationError> {
        for field in &message.fields {
            let value = match object.get(&field.name) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };
            if field.repeated {
                let items = value.as_array().ok_or_else(|| {
                    SerializationError::SerializationFailed(format!(
                        "field \"{}\": array expected",
                        field.name
                    ))
                })?;
                for item in items {
                    self.encode_single(field, item, buf)?;
                }
            } else {
                self.encode_single(field, value, buf)?;
            }
        }
        Ok(())
    }

    fn encode_single(
        &self,
        field: &ProtoField,
        value: &JsonValue,
        buf: &mut Vec<u8>,
    ) -> Result<(), SerializationError> {
        match &field.kind {
            ProtoType::Double => {
                let v = require_f64(field, value)?;
                encoding::double::encode(field.tag, &v, buf);
            }
            ProtoType::Float => {
                let v = require_f64(field, value)? as f32;
                encoding::float::encode(field.tag, &v, buf);
            }
            ProtoType::Int32 => {
                let v = require_i32(field, value)?;
                encoding::int32::encode(field.tag, &v, buf);
            }
            ProtoType::Sint32 => {
                let v = require_i32(field, value)?;
                encoding::sint32::encode(field.tag, &v, buf);
            }
            ProtoType::Sfixed32 => {
                let v = require_i32(field, value)?;
                encoding::sfixed32::encode(field.tag, &v, buf);
            }
            ProtoType::Int64 => {
                let v = require_i64(field, value)?;
                encoding::int64::encode(field.tag, &v, buf);
            }
            ProtoType::Sint64 => {
                let v = require_i64(field, value)?;
                encoding::sint64::encode(field.tag, &v, buf);
            }
            ProtoType::Sfixed64 => {
                let v = require_i64(field, value)?;
                encoding::sfixed64::encode(field.tag, &v, buf);
            }
            ProtoType::Uint32 => {
                let v = require_u32(field, value)?;
                encoding::uint32::encode(field.tag, &v, buf);
            }
            ProtoType::Fixed32 => {
                let v = require_u32(field, value)?;
                encoding::fixed32::encode(field.tag, &v, buf);
            }
            ProtoType::Uint64 => {
                let v = require_u64(field, value)?;
                encoding::uint64::encode(field.tag, &v, buf);
            }
            ProtoType::Fixed64 => {
                let v = require_u64(field, value)?;
                encoding::fixed64::encode(field.tag, &v, buf);
            }
            ProtoType::Bool => {
                let v = value
                    .as_bool()
                    .ok_or_else(|| field_error(field, "boolean expected"))?;
                encoding::bool::encode(field.tag, &v, buf);
            }
            ProtoType::String => {
                let v = value
                    .as_str()
                    .ok_or_else(|| field_error(field, "string expected"))?
                    .to_string();
                encoding::string::encode(field.tag, &v, buf);
            }
            ProtoType::Bytes => {
                let text = value
                    .as_str()
                    .ok_or_else(|| field_error(field, "base64 string expected"))?;
                let v = general_purpose::STANDARD
                    .decode(text)
                    .map_err(|_| field_error(field, "base64 string expected"))?;
                encoding::bytes::encode(field.tag, &v, buf);
            }
            ProtoType::Message(type_name) => {
                let nested = self.descriptor.message(type_name).ok_or_else(|| {
                    SerializationError::SchemaError(format!(
                        "unknown message type \"{}\"",
                        type_name
                    ))
                })?;
                let object = value
                    .as_object()
                    .ok_or_else(|| field_error(field, "object expected"))?;
                let mut body = Vec::new();
                self.encode_message_fields(nested, object, &mut body)?;
                encoding::encode_key(field.tag, WireType::LengthDelimited, buf);
                encoding::encode_varint(body.len() as u64, buf);
                buf.extend_from_slice(&body);
            }
        }
        Ok(())
    }

    fn decode_message_fields(
        &self,
        message: &MessageDescriptor,
        buf: &mut Bytes,
    ) -> Result<JsonMap<String, JsonValue>, SerializationError> {
        let mut object = JsonMap::new();
        while buf.has_remaining() {
            let (tag, wire_type) = encoding::decode_key(buf)
                .map_err(|e| SerializationError::protobuf_error("Failed to decode field key", e))?;
            match message.field_by_tag(tag) {
                Some(field) => self.decode_field_occurrence(field, wire_type, buf, &mut object)?,
                None => {
                    encoding::skip_field(wire_type, tag, buf, DecodeContext::default()).map_err(
                        |e| {
                            SerializationError::protobuf_error(
                                format!("Failed to skip unknown field {}", tag),
                                e,
                            )
                        },
                    )?;
                }
            }
        }
        Ok(object)
    }

    fn decode_field_occurrence(
        &self,
        field: &ProtoField,
        wire_type: WireType,
        buf: &mut Bytes,
        object: &mut JsonMap<String, JsonValue>,
    ) -> Result<(), SerializationError> {
        let ctx = DecodeContext::default();
        match &field.kind {
            ProtoType::Double => {
                if field.repeated {
                    let mut values: Vec<f64> = Vec::new();
                    encoding::double::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    let mut converted = Vec::with_capacity(values.len());
                    for v in values {
                        converted.push(f64_to_json(v)?);
                    }
                    push_repeated(object, &field.name, converted);
                } else {
                    let mut value = 0f64;
                    encoding::double::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), f64_to_json(value)?);
                }
            }
            ProtoType::Float => {
                if field.repeated {
                    let mut values: Vec<f32> = Vec::new();
                    encoding::float::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    let mut converted = Vec::with_capacity(values.len());
                    for v in values {
                        converted.push(f64_to_json(f64::from(v))?);
                    }
                    push_repeated(object, &field.name, converted);
                } else {
                    let mut value = 0f32;
                    encoding::float::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), f64_to_json(f64::from(value))?);
                }
            }
            ProtoType::Int32 => decode_varint32(field, wire_type, buf, object, VarintKind::Int)?,
            ProtoType::Sint32 => {
                decode_varint32(field, wire_type, buf, object, VarintKind::Signed)?
            }
            ProtoType::Sfixed32 => {
                if field.repeated {
                    let mut values: Vec<i32> = Vec::new();
                    encoding::sfixed32::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0i32;
                    encoding::sfixed32::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Int64 => decode_varint64(field, wire_type, buf, object, VarintKind::Int)?,
            ProtoType::Sint64 => {
                decode_varint64(field, wire_type, buf, object, VarintKind::Signed)?
            }
            ProtoType::Sfixed64 => {
                if field.repeated {
                    let mut values: Vec<i64> = Vec::new();
                    encoding::sfixed64::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0i64;
                    encoding::sfixed64::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Uint32 => {
                if field.repeated {
                    let mut values: Vec<u32> = Vec::new();
                    encoding::uint32::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0u32;
                    encoding::uint32::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Fixed32 => {
                if field.repeated {
                    let mut values: Vec<u32> = Vec::new();
                    encoding::fixed32::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0u32;
                    encoding::fixed32::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Uint64 => {
                if field.repeated {
                    let mut values: Vec<u64> = Vec::new();
                    encoding::uint64::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0u64;
                    encoding::uint64::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Fixed64 => {
                if field.repeated {
                    let mut values: Vec<u64> = Vec::new();
                    encoding::fixed64::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
                } else {
                    let mut value = 0u64;
                    encoding::fixed64::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::from(value));
                }
            }
            ProtoType::Bool => {
                if field.repeated {
                    let mut values: Vec<bool> = Vec::new();
                    encoding::bool::merge_repeated(wire_type, &mut values, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    push_repeated(object, &field.name, values.into_iter().map(JsonValue::Bool));
                } else {
                    let mut value = false;
                    encoding::bool::merge(wire_type, &mut value, buf, ctx)
                        .map_err(|e| decode_error(field, e))?;
                    object.insert(field.name.clone(), JsonValue::Bool(value));
                }
            }
            ProtoType::String => {
                let mut value = String::new();
                encoding::string::merge(wire_type, &mut value, buf, ctx)
                    .map_err(|e| decode_error(field, e))?;
                store(object, field, JsonValue::String(value));
            }
            ProtoType::Bytes => {
                let mut value: Vec<u8> = Vec::new();
                encoding::bytes::merge(wire_type, &mut value, buf, ctx)
                    .map_err(|e| decode_error(field, e))?;
                store(
                    object,
                    field,
                    JsonValue::String(general_purpose::STANDARD.encode(&value)),
                );
            }
            ProtoType::Message(type_name) => {
                if wire_type != WireType::LengthDelimited {
                    return Err(SerializationError::DeserializationFailed(format!(
                        "field \"{}\": invalid wire type for a message",
                        field.name
                    )));
                }
                let len = encoding::decode_varint(buf).map_err(|e| decode_error(field, e))?
                    as usize;
                if len > buf.remaining() {
                    return Err(SerializationError::DeserializationFailed(format!(
                        "field \"{}\": length runs past the end of the buffer",
                        field.name
                    )));
                }
                let mut body = buf.copy_to_bytes(len);
                let nested = self.descriptor.message(type_name).ok_or_else(|| {
                    SerializationError::SchemaError(format!(
                        "unknown message type \"{}\"",
                        type_name
                    ))
                })?;
                let decoded = JsonValue::Object(self.decode_message_fields(nested, &mut body)?);
                store(object, field, decoded);
            }
        }
        Ok(())
    }
}

impl SchemaCodec for ProtobufCodec {
    fn format_name(&self) -> &'static str {
        "Protobuf"
    }

    fn verify(&self, value: &JsonValue) -> Option<String> {
        self.verify_message(self.descriptor.root(), value)
    }

    fn serialize(&self, value: &JsonValue) -> Result<Vec<u8>, SerializationError> {
        let root = self.descriptor.root();
        let object = value.as_object().ok_or_else(|| {
            SerializationError::SerializationFailed(format!("{}: object expected", root.name))
        })?;
        let mut buffer = Vec::new();
        self.encode_message_fields(root, object, &mut buffer)?;
        Ok(buffer)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<JsonValue, SerializationError> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let fields = self.decode_message_fields(self.descriptor.root(), &mut buf)?;
        Ok(JsonValue::Object(fields))
    }
}

enum VarintKind {
    Int,
    Signed,
}

fn decode_varint32(
    field: &ProtoField,
    wire_type: WireType,
    buf: &mut Bytes,
    object: &mut JsonMap<String, JsonValue>,
    kind: VarintKind,
) -> Result<(), SerializationError> {
    let ctx = DecodeContext::default();
    if field.repeated {
        let mut values: Vec<i32> = Vec::new();
        match kind {
            VarintKind::Int => encoding::int32::merge_repeated(wire_type, &mut values, buf, ctx),
            VarintKind::Signed => {
                encoding::sint32::merge_repeated(wire_type, &mut values, buf, ctx)
            }
        }
        .map_err(|e| decode_error(field, e))?;
        push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
    } else {
        let mut value = 0i32;
        match kind {
            VarintKind::Int => encoding::int32::merge(wire_type, &mut value, buf, ctx),
            VarintKind::Signed => encoding::sint32::merge(wire_type, &mut value, buf, ctx),
        }
        .map_err(|e| decode_error(field, e))?;
        object.insert(field.name.clone(), JsonValue::from(value));
    }
    Ok(())
}

fn decode_varint64(
    field: &ProtoField,
    wire_type: WireType,
    buf: &mut Bytes,
    object: &mut JsonMap<String, JsonValue>,
    kind: VarintKind,
) -> Result<(), SerializationError> {
    let ctx = DecodeContext::default();
    if field.repeated {
        let mut values: Vec<i64> = Vec::new();
        match kind {
            VarintKind::Int => encoding::int64::merge_repeated(wire_type, &mut values, buf, ctx),
            VarintKind::Signed => {
                encoding::sint64::merge_repeated(wire_type, &mut values, buf, ctx)
            }
        }
        .map_err(|e| decode_error(field, e))?;
        push_repeated(object, &field.name, values.into_iter().map(JsonValue::from));
    } else {
        let mut value = 0i64;
        match kind {
            VarintKind::Int => encoding::int64::merge(wire_type, &mut value, buf, ctx),
            VarintKind::Signed => encoding::sint64::merge(wire_type, &mut value, buf, ctx),
        }
        .map_err(|e| decode_error(field, e))?;
        object.insert(field.name.clone(), JsonValue::from(value));
    }
    Ok(())
}

fn store(object: &mut JsonMap<String, JsonValue>, field: &ProtoField, value: JsonValue) {
    if field.repeated {
        push_repeated(object, &field.name, std::iter::once(value));
    } else {
        object.insert(field.name.clone(), value);
    }
}

fn push_repeated(
    object: &mut JsonMap<String, JsonValue>,
    name: &str,
    values: impl IntoIterator<Item = JsonValue>,
) {
    let entry = object
        .entry(name.to_string())
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if let JsonValue::Array(items) = entry {
        items.extend(values);
    }
}

fn field_error(field: &ProtoField, message: &str) -> SerializationError {
    SerializationError::SerializationFailed(format!("field \"{}\": {}", field.name, message))
}

fn decode_error(field: &ProtoField, source: DecodeError) -> SerializationError {
    SerializationError::protobuf_error(format!("Failed to decode field \"{}\"", field.name), source)
}

fn require_f64(field: &ProtoField, value: &JsonValue) -> Result<f64, SerializationError> {
    value
        .as_f64()
        .ok_or_else(|| field_error(field, "number expected"))
}

fn require_i32(field: &ProtoField, value: &JsonValue) -> Result<i32, SerializationError> {
    value
        .as_i64()
        .and_then(|wide| i32::try_from(wide).ok())
        .ok_or_else(|| field_error(field, "32-bit integer expected"))
}

fn require_i64(field: &ProtoField, value: &JsonValue) -> Result<i64, SerializationError> {
    value
        .as_i64()
        .ok_or_else(|| field_error(field, "integer expected"))
}

fn require_u32(field: &ProtoField, value: &JsonValue) -> Result<u32, SerializationError> {
    value
        .as_u64()
        .and_then(|wide| u32::try_from(wide).ok())
        .ok_or_else(|| field_error(field, "unsigned 32-bit integer expected"))
}

fn require_u64(field: &ProtoField, value: &JsonValue) -> Result<u64, SerializationError> {
    value
        .as_u64()
        .ok_or_else(|| field_error(field, "unsigned integer expected"))
}

fn f64_to_json(value: f64) -> Result<JsonValue, SerializationError> {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| {
            SerializationError::DeserializationFailed("non-finite float value".to_string())
        })
}
