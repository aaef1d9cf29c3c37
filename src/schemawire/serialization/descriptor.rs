//! Message descriptors parsed from protobufjs-style JSON schemas.
//!
//! Registries in this ecosystem store Protobuf schemas as JSON descriptor
//! documents rather than `.proto` text. Two shapes are accepted: a
//! namespace document `{"nested": {"Msg": {"fields": {...}}}}` (namespaces
//! may nest further) and an inline message `{"name": "Msg", "fields":
//! {...}}`. Each field is `{"type": "...", "id": N}` with an optional
//! `"rule": "repeated"`.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::error::SerializationError;

/// Scalar and message field kinds. Any `type` value that is not a scalar
/// keyword is treated as a message reference, resolved by simple name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(String),
}

impl ProtoType {
    fn parse(name: &str) -> ProtoType {
        match name {
            "double" => ProtoType::Double,
            "float" => ProtoType::Float,
            "int32" => ProtoType::Int32,
            "int64" => ProtoType::Int64,
            "uint32" => ProtoType::Uint32,
            "uint64" => ProtoType::Uint64,
            "sint32" => ProtoType::Sint32,
            "sint64" => ProtoType::Sint64,
            "fixed32" => ProtoType::Fixed32,
            "fixed64" => ProtoType::Fixed64,
            "sfixed32" => ProtoType::Sfixed32,
            "sfixed64" => ProtoType::Sfixed64,
            "bool" => ProtoType::Bool,
            "string" => ProtoType::String,
            "bytes" => ProtoType::Bytes,
            other => ProtoType::Message(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoField {
    pub name: String,
    pub tag: u32,
    pub kind: ProtoType,
    pub repeated: bool,
}

/// One message type: its name and fields in ascending tag order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    pub name: String,
    pub fields: Vec<ProtoField>,
}

impl MessageDescriptor {
    pub fn field_by_tag(&self, tag: u32) -> Option<&ProtoField> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&ProtoField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Every message type declared by one schema document, plus the resolved
/// root message that payloads encode as.
///
/// The root is the document's own declared type name: the inline `name`
/// when that form is used, otherwise the single top-level `nested` entry
/// (descending through single-entry namespaces). Documents declaring zero
/// or several top-level messages cannot name their root and are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoDescriptor {
    messages: HashMap<String, MessageDescriptor>,
    root: String,
}

impl ProtoDescriptor {
    /// Parses a descriptor document and resolves its root message.
    pub fn from_json(document: &JsonValue) -> Result<Self, SerializationError> {
        let mut messages = HashMap::new();
        collect_messages(document, &mut messages)?;
        if messages.is_empty() {
            return Err(SerializationError::SchemaError(
                "schema document declares no message types".to_string(),
            ));
        }
        let root = resolve_root(document)?;
        if !messages.contains_key(&root) {
            return Err(SerializationError::SchemaError(format!(
                "root message \"{}\" is not declared in the schema document",
                root
            )));
        }
        Ok(Self { messages, root })
    }

    pub fn root(&self) -> &MessageDescriptor {
        // Presence checked in from_json.
        &self.messages[&self.root]
    }

    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(name)
    }
}

fn collect_messages(
    node: &JsonValue,
    messages: &mut HashMap<String, MessageDescriptor>,
) -> Result<(), SerializationError> {
    if let Some(name) = node.get("name").and_then(JsonValue::as_str) {
        if let Some(fields) = node.get("fields") {
            messages.insert(name.to_string(), parse_message(name, fields)?);
        }
    }
    if let Some(JsonValue::Object(nested)) = node.get("nested") {
        for (name, child) in nested {
            if let Some(fields) = child.get("fields") {
                messages.insert(name.clone(), parse_message(name, fields)?);
            }
            // Namespaces and nested message declarations both live under
            // "nested".
            collect_messages(child, messages)?;
        }
    }
    Ok(())
}

fn parse_message(name: &str, fields: &JsonValue) -> Result<MessageDescriptor, SerializationError> {
    let entries = match fields {
        JsonValue::Object(entries) => entries,
        _ => {
            return Err(SerializationError::SchemaError(format!(
                "message \"{}\" has a malformed fields object",
                name
            )))
        }
    };
    let mut parsed = Vec::with_capacity(entries.len());
    for (field_name, spec) in entries {
        let type_name = spec
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                SerializationError::SchemaError(format!(
                    "field \"{}\" of message \"{}\" has no type",
                    field_name, name
                ))
            })?;
        let tag = spec
            .get("id")
            .and_then(JsonValue::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| {
                SerializationError::SchemaError(format!(
                    "field \"{}\" of message \"{}\" has no valid id",
                    field_name, name
                ))
            })?;
        let repeated = spec.get("rule").and_then(JsonValue::as_str) == Some("repeated");
        parsed.push(ProtoField {
            name: field_name.clone(),
            tag,
            kind: ProtoType::parse(type_name),
            repeated,
        });
    }
    parsed.sort_by_key(|field| field.tag);
    Ok(MessageDescriptor {
        name: name.to_string(),
        fields: parsed,
    })
}

fn resolve_root(document: &JsonValue) -> Result<String, SerializationError> {
    if let Some(name) = document.get("name").and_then(JsonValue::as_str) {
        if document.get("fields").is_some() {
            return Ok(name.to_string());
        }
    }
    let mut node = document;
    let mut name: Option<&str> = None;
    loop {
        if node.get("fields").is_some() {
            return match name {
                Some(name) => Ok(name.to_string()),
                None => Err(SerializationError::SchemaError(
                    "cannot determine the message type from the schema document".to_string(),
                )),
            };
        }
        let nested = match node.get("nested").and_then(JsonValue::as_object) {
            Some(nested) if nested.len() == 1 => nested,
            _ => {
                return Err(SerializationError::SchemaError(
                    "cannot determine the message type from the schema document".to_string(),
                ))
            }
        };
        let (child_name, child) = nested.iter().next().ok_or_else(|| {
            SerializationError::SchemaError(
                "cannot determine the message type from the schema document".to_string(),
            )
        })?;
        name = Some(child_name);
        node = child;
    }
}
