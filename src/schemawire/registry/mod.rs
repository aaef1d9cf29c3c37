//! Schema registry REST client, data models, and caller-owned caching.

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use cache::SchemaCache;
pub use client::SchemaRegistryClient;
pub use error::{RegistryError, RegistryResult};
pub use types::{
    BasicAuth, CompatibilityCheck, GlobalCompatibility, RegistryMode, RetryPolicy, SchemaDocument,
    ServerInfo,
};
