//! Schema-bound codecs for registry-framed messages.
//!
//! Two formats are supported, both driven entirely by schema documents
//! fetched from the registry at runtime:
//!
//! - **Avro** ([`AvroCodec`]): JSON payloads against a parsed Avro schema,
//!   encoded as raw datums.
//! - **Protobuf** ([`ProtobufCodec`]): JSON payloads against a
//!   protobufjs-style JSON descriptor, encoded field by field with the
//!   wire-format primitives.
//!
//! Both implement [`SchemaCodec`], which is what the converters dispatch
//! over.

pub mod avro_codec;
pub mod descriptor;
pub mod error;
pub mod protobuf_codec;
pub mod traits;

pub use avro_codec::AvroCodec;
pub use descriptor::{MessageDescriptor, ProtoDescriptor, ProtoField, ProtoType};
pub use error::SerializationError;
pub use protobuf_codec::ProtobufCodec;
pub use traits::SchemaCodec;
