//! Avro codec bound to a registry schema.
//!
//! Conversion is schema driven: the parsed Avro schema decides how each
//! JSON value is widened or narrowed (int vs long vs float vs double),
//! record fields are emitted in schema order, and unions resolve to the
//! first matching branch. Encoded output is a raw Avro datum with no
//! Object Container File header, which is what sits after the wire-format
//! envelope.
//!
//! JSON carrier conventions: `bytes` and `fixed` values travel as base64
//! strings (standard alphabet), enums as their symbol strings, and
//! date/time logical values as their underlying numbers.

use std::collections::HashMap;
use std::io::Cursor;

use apache_avro::types::Value as AvroValue;
use apache_avro::{from_avro_datum, to_avro_datum, Schema};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value as JsonValue;

use super::error::SerializationError;
use super::traits::SchemaCodec;

/// Encoder/decoder for one parsed Avro schema.
#[derive(Debug)]
pub struct AvroCodec {
    schema: Schema,
}

impl AvroCodec {
    /// Parses a schema document and binds a codec to it.
    pub fn new(schema_json: &str) -> Result<Self, SerializationError> {
        let schema = Schema::parse_str(schema_json)
            .map_err(|e| SerializationError::avro_error("Failed to parse Avro schema", e))?;
        Ok(Self { schema })
    }

    /// Binds a codec to an already-parsed schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn json_to_avro(
        &self,
        json: &JsonValue,
        schema: &Schema,
    ) -> Result<AvroValue, SerializationError> {
        match schema {
            Schema::Null => match json {
                JsonValue::Null => Ok(AvroValue::Null),
                other => Err(mismatch("null", other)),
            },
            Schema::Boolean => match json {
                JsonValue::Bool(b) => Ok(AvroValue::Boolean(*b)),
                other => Err(mismatch("boolean", other)),
            },
            Schema::Int => Ok(AvroValue::Int(json_to_i32(json, "int")?)),
            Schema::Long => Ok(AvroValue::Long(json_to_i64(json, "long")?)),
            Schema::Float => Ok(AvroValue::Float(json_to_f64(json, "float")? as f32)),
            Schema::Double => Ok(AvroValue::Double(json_to_f64(json, "double")?)),
            Schema::String => match json {
                JsonValue::String(s) => Ok(AvroValue::String(s.clone())),
                other => Err(mismatch("string", other)),
            },
            Schema::Bytes => Ok(AvroValue::Bytes(json_to_base64_bytes(json, "bytes")?)),
            Schema::Fixed(fixed) => {
                let bytes = json_to_base64_bytes(json, "fixed")?;
                if bytes.len() != fixed.size {
                    return Err(SerializationError::SchemaMismatch(format!(
                        "fixed value has {} bytes, schema requires {}",
                        bytes.len(),
                        fixed.size
                    )));
                }
                Ok(AvroValue::Fixed(fixed.size, bytes))
            }
            Schema::Enum(inner) => match json {
                JsonValue::String(symbol) => {
                    match inner.symbols.iter().position(|s| s == symbol) {
                        Some(index) => Ok(AvroValue::Enum(index as u32, symbol.clone())),
                        None => Err(SerializationError::SchemaMismatch(format!(
                            "unknown enum symbol \"{}\"",
                            symbol
                        ))),
                    }
                }
                other => Err(mismatch("enum symbol", other)),
            },
            Schema::Union(union) => {
                if json.is_null() {
                    let null_index = union
                        .variants()
                        .iter()
                        .position(|variant| matches!(variant, Schema::Null));
                    return match null_index {
                        Some(index) => {
                            Ok(AvroValue::Union(index as u32, Box::new(AvroValue::Null)))
                        }
                        None => Err(SerializationError::SchemaMismatch(
                            "union has no null branch".to_string(),
                        )),
                    };
                }
                for (index, variant) in union.variants().iter().enumerate() {
                    if matches!(variant, Schema::Null) {
                        continue;
                    }
                    if let Ok(value) = self.json_to_avro(json, variant) {
                        return Ok(AvroValue::Union(index as u32, Box::new(value)));
                    }
                }
                Err(SerializationError::SchemaMismatch(format!(
                    "no union branch matches {}",
                    json_kind(json)
                )))
            }
            Schema::Array(array) => match json {
                JsonValue::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.json_to_avro(item, &array.items)?);
                    }
                    Ok(AvroValue::Array(values))
                }
                other => Err(mismatch("array", other)),
            },
            Schema::Map(map) => match json {
                JsonValue::Object(entries) => {
                    let mut values = HashMap::with_capacity(entries.len());
                    for (key, value) in entries {
                        values.insert(key.clone(), self.json_to_avro(value, &map.types)?);
                    }
                    Ok(AvroValue::Map(values))
                }
                other => Err(mismatch("map", other)),
            },
            Schema::Record(record) => {
                let object = match json {
                    JsonValue::Object(object) => object,
                    other => return Err(mismatch("record", other)),
                };
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let value = match object.get(&field.name) {
                        Some(value) => self
                            .json_to_avro(value, &field.schema)
                            .map_err(|e| at_field(&field.name, e))?,
                        None => match &field.default {
                            Some(default) => self
                                .json_to_avro(default, &field.schema)
                                .map_err(|e| at_field(&field.name, e))?,
                            None => {
                                return Err(SerializationError::SchemaMismatch(format!(
                                    "missing field \"{}\"",
                                    field.name
                                )))
                            }
                        },
                    };
                    fields.push((field.name.clone(), value));
                }
                Ok(AvroValue::Record(fields))
            }
            Schema::Date => Ok(AvroValue::Date(json_to_i32(json, "date")?)),
            Schema::TimeMillis => Ok(AvroValue::TimeMillis(json_to_i32(json, "time-millis")?)),
            Schema::TimeMicros => Ok(AvroValue::TimeMicros(json_to_i64(json, "time-micros")?)),
            Schema::TimestampMillis => Ok(AvroValue::TimestampMillis(json_to_i64(
                json,
                "timestamp-millis",
            )?)),
            Schema::TimestampMicros => Ok(AvroValue::TimestampMicros(json_to_i64(
                json,
                "timestamp-micros",
            )?)),
            // String values resolve to the uuid logical type inside the
            // Avro engine itself.
            Schema::Uuid => match json {
                JsonValue::String(s) => Ok(AvroValue::String(s.clone())),
                other => Err(mismatch("uuid string", other)),
            },
            unsupported => Err(SerializationError::UnsupportedType(format!(
                "Avro schema form is not supported: {:?}",
                unsupported
            ))),
        }
    }

    fn avro_to_json(value: &AvroValue) -> Result<JsonValue, SerializationError> {
        match value {
            AvroValue::Null => Ok(JsonValue::Null),
            AvroValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
            AvroValue::Int(i) => Ok(JsonValue::Number((*i).into())),
            AvroValue::Long(l) => Ok(JsonValue::Number((*l).into())),
            AvroValue::Float(x) => number_to_json(f64::from(*x)),
            AvroValue::Double(x) => number_to_json(*x),
            AvroValue::Bytes(bytes) | AvroValue::Fixed(_, bytes) => {
                Ok(JsonValue::String(general_purpose::STANDARD.encode(bytes)))
            }
            AvroValue::String(s) => Ok(JsonValue::String(s.clone())),
            AvroValue::Enum(_, symbol) => Ok(JsonValue::String(symbol.clone())),
            AvroValue::Union(_, inner) => Self::avro_to_json(inner),
            AvroValue::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(Self::avro_to_json(item)?);
                }
                Ok(JsonValue::Array(values))
            }
            AvroValue::Map(entries) => {
                let mut object = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    object.insert(key.clone(), Self::avro_to_json(value)?);
                }
                Ok(JsonValue::Object(object))
            }
            AvroValue::Record(fields) => {
                let mut object = serde_json::Map::with_capacity(fields.len());
                for (name, value) in fields {
                    object.insert(name.clone(), Self::avro_to_json(value)?);
                }
                Ok(JsonValue::Object(object))
            }
            AvroValue::Date(d) => Ok(JsonValue::Number((*d).into())),
            AvroValue::TimeMillis(t) => Ok(JsonValue::Number((*t).into())),
            AvroValue::TimeMicros(t) => Ok(JsonValue::Number((*t).into())),
            AvroValue::TimestampMillis(t) => Ok(JsonValue::Number((*t).into())),
            AvroValue::TimestampMicros(t) => Ok(JsonValue::Number((*t).into())),
            AvroValue::Uuid(u) => Ok(JsonValue::String(u.to_string())),
            unsupported => Err(SerializationError::UnsupportedType(format!(
                "Avro value form is not supported: {:?}",
                unsupported
            ))),
        }
    }
}

impl SchemaCodec for AvroCodec {
    fn format_name(&self) -> &'static str {
        "Avro"
    }

    fn serialize(&self, value: &JsonValue) -> Result<Vec<u8>, SerializationError> {
        let avro_value = self.json_to_avro(value, &self.schema)?;
        // Raw Avro datum, not Object Container File format.
        to_avro_datum(&self.schema, avro_value).map_err(|e| {
            log::error!("Failed to encode Avro datum: {}", e);
            SerializationError::avro_error("Failed to encode Avro datum", e)
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<JsonValue, SerializationError> {
        let mut reader = Cursor::new(bytes);
        let value = from_avro_datum(&self.schema, &mut reader, None).map_err(|e| {
            log::error!("Failed to decode Avro datum: {}", e);
            SerializationError::avro_error("Failed to decode Avro datum", e)
        })?;
        Self::avro_to_json(&value)
    }
}

fn mismatch(expected: &str, got: &JsonValue) -> SerializationError {
    SerializationError::SchemaMismatch(format!("expected {}, got {}", expected, json_kind(got)))
}

fn at_field(name: &str, error: SerializationError) -> SerializationError {
    match error {
        SerializationError::SchemaMismatch(msg) => {
            SerializationError::SchemaMismatch(format!("field \"{}\": {}", name, msg))
        }
        other => other,
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn json_to_i64(json: &JsonValue, expected: &str) -> Result<i64, SerializationError> {
    json.as_i64()
        .ok_or_else(|| mismatch(expected, json))
}

fn json_to_i32(json: &JsonValue, expected: &str) -> Result<i32, SerializationError> {
    let wide = json_to_i64(json, expected)?;
    i32::try_from(wide).map_err(|_| {
        SerializationError::SchemaMismatch(format!("value {} is out of range for {}", wide, expected))
    })
}

fn json_to_f64(json: &JsonValue, expected: &str) -> Result<f64, SerializationError> {
    json.as_f64().ok_or_else(|| mismatch(expected, json))
}

fn json_to_base64_bytes(json: &JsonValue, expected: &str) -> Result<Vec<u8>, SerializationError> {
    match json {
        JsonValue::String(s) => general_purpose::STANDARD.decode(s).map_err(|_| {
            SerializationError::SchemaMismatch(format!("invalid base64 in {} value", expected))
        }),
        other => Err(mismatch(expected, other)),
    }
}

fn number_to_json(value: f64) -> Result<JsonValue, SerializationError> {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| {
            SerializationError::DeserializationFailed("non-finite float value".to_string())
        })
}
