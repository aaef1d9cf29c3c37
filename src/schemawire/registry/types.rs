//! Data models for the registry REST API.

use serde::{Deserialize, Serialize};

/// Retry behavior for every registry request. `retries` is the total
/// number of attempts, and the delay is a fixed pause between attempts
/// with no backoff or jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Overrides the attempt count, keeping the configured delay.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Overrides the delay between attempts, keeping the attempt count.
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }
}

/// Credentials for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// A schema held by the registry.
///
/// Lookups by subject and version populate every field; lookups by id get
/// `subject` and `version` only when the server includes them, and the
/// client fills `id` from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub id: u32,
    pub subject: Option<String>,
    pub version: Option<u32>,
    pub schema: String,
}

/// Result of a compatibility check against a registered version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityCheck {
    pub is_compatible: bool,
}

/// The registry's global compatibility level. The GET shape uses
/// `compatibilityLevel`; updates are sent as `compatibility`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCompatibility {
    #[serde(rename = "compatibilityLevel")]
    pub compatibility_level: String,
}

/// The registry's operating mode, an opaque string such as `READWRITE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMode {
    pub mode: String,
}

/// Server metadata from the registry root endpoint. Real servers often
/// return an empty object here, so every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerInfo {
    pub version: Option<String>,
    pub url: Option<String>,
    pub compatibility: Option<String>,
}
