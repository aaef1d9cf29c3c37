//! Core modules: wire framing, the registry client, schema-bound codecs,
//! and the message converters that tie the three together.

pub mod converter;
pub mod registry;
pub mod serialization;
pub mod wire;
