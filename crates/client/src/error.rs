//! Client error types.

use std::time::Duration;
use thiserror::Error;

use certward_config::ConfigError;
use certward_policy::PolicyError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from lifecycle, authentication and transport operations.
///
/// Non-error lifecycle states (a pending retrieve, an already revoked
/// certificate) are returned as outcomes, never as errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure before a status code was received.
    #[error("{operation}: transport error: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Status outside the operation's accepted set.
    #[error("{operation}: unexpected status {status_text}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        status_text: String,
        body: String,
    },

    /// Malformed JSON, base64 or certificate data in an accepted response.
    #[error("{operation}: failed to decode response: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },

    /// The backend accepted the call but reported a failure in the body.
    #[error("{operation}: backend reported failure: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// The zone forbids the request as built.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The request breaks compiled zone rules or the zone policy is unusable.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The caller's input cannot form a valid call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The operation is rejected outright for this backend.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("TLS configuration failed: {0}")]
    Tls(String),

    #[error("CSR generation failed: {0}")]
    Csr(String),

    /// Issuance did not complete in time. The request stays submitted.
    #[error("certificate {object_path} not issued after {waited:?}")]
    Timeout { object_path: String, waited: Duration },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn decode(operation: &'static str, reason: impl ToString) -> Self {
        ClientError::Decode {
            operation,
            reason: reason.to_string(),
        }
    }

    /// HTTP status, for errors that carry one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
