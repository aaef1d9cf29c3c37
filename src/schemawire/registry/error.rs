//! Error types for registry operations.

use std::fmt;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failures surfaced by the registry client.
///
/// `RequestFailed` covers an exhausted retry loop, transport errors and
/// non-success HTTP statuses alike; the recorded message preserves the
/// last attempt's diagnostics. The operation-specific variants carry the
/// response body the registry sent back.
#[derive(Debug)]
pub enum RegistryError {
    RequestFailed {
        url: String,
        attempts: u32,
        message: String,
    },
    RegisterFailed {
        body: String,
    },
    SchemaFetchFailed {
        id: u32,
        body: String,
    },
    DeleteSubjectFailed {
        subject: String,
        body: String,
    },
    SetCompatibilityFailed {
        body: String,
    },
    SetModeFailed {
        body: String,
    },
    ResponseParse {
        url: String,
        message: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::RequestFailed {
                url,
                attempts,
                message,
            } => write!(
                f,
                "Failed to fetch {} after {} attempts: {}",
                url, attempts, message
            ),
            RegistryError::RegisterFailed { body } => {
                write!(f, "Failed to register schema: {}", body)
            }
            RegistryError::SchemaFetchFailed { id, body } => {
                write!(f, "Failed to fetch schema with ID {}: {}", id, body)
            }
            RegistryError::DeleteSubjectFailed { subject, body } => {
                write!(f, "Failed to delete subject {}: {}", subject, body)
            }
            RegistryError::SetCompatibilityFailed { body } => {
                write!(f, "Failed to set global compatibility: {}", body)
            }
            RegistryError::SetModeFailed { body } => {
                write!(f, "Failed to set mode: {}", body)
            }
            RegistryError::ResponseParse { url, message } => {
                write!(f, "Failed to parse response from {}: {}", url, message)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
