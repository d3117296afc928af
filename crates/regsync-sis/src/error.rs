//! SIS client error types.
//!
//! Transport and protocol failures are always surfaced as hard errors
//! carrying the raw message; they are never silently retried. Per-line
//! registration problems are data (`ChangeError`), not errors, and do
//! not appear here.

use thiserror::Error;

/// Errors that can occur talking to the SIS.
#[derive(Debug, Error)]
pub enum SisError {
    /// Network-level failure (connection refused, DNS, TLS, ...).
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The configured read timeout elapsed.
    #[error("request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The SIS answered with a non-success HTTP status.
    #[error("SIS returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The SIS answered 200 but with a non-success status envelope.
    #[error("SIS rejected the call: {message}")]
    Envelope { message: String },

    /// The response body could not be decoded.
    #[error("malformed SIS response: {message}")]
    Decode { message: String },

    /// Client configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl SisError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create an envelope error.
    pub fn envelope(message: impl Into<String>) -> Self {
        Self::Envelope {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Map a `reqwest` failure onto the taxonomy, preserving the
    /// configured timeout for the timeout case.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout { timeout_secs };
        }
        if err.is_decode() {
            return Self::Decode {
                message: err.to_string(),
            };
        }
        Self::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Whether the failure happened before the SIS could have acted on
    /// the request. A timeout is *not* safe: the submission may have
    /// been applied even though no acknowledgement arrived.
    #[must_use]
    pub fn request_never_reached_sis(&self) -> bool {
        matches!(self, SisError::InvalidConfiguration { .. })
    }
}

/// Result type for SIS client operations.
pub type SisResult<T> = Result<T, SisError>;
