//! Engine error types.
//!
//! Per-line registration problems are data carried on changes and
//! failures, not errors. The one aggregate here is
//! [`EngineError::EnrollmentRejected`]: raised when an operation's net
//! effect was "nothing changed and at least one line failed", carrying
//! the full per-line list so the caller can render one composite
//! message.

use thiserror::Error;

use regsync_sis::SisError;

use crate::sync::EnrollmentFailure;

/// Errors that can occur in the synchronization engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Remote SIS failure (transport, protocol, envelope).
    #[error("SIS error: {0}")]
    Sis(#[from] SisError),

    /// Persistence seam failure.
    #[error("store error: {message}")]
    Store { message: String },

    /// The registration attempt left the student exactly where it
    /// found them and at least one line failed.
    #[error("enrollment rejected: {}", format_failures(failures))]
    EnrollmentRejected { failures: Vec<EnrollmentFailure> },

    /// The student is not eligible for the requested workflow.
    #[error("student not eligible: {reason}")]
    Ineligible { reason: String },

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create an ineligibility error.
    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self::Ineligible {
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The per-line failures, when this is the aggregate rejection.
    #[must_use]
    pub fn failures(&self) -> Option<&[EnrollmentFailure]> {
        match self {
            Self::EnrollmentRejected { failures } => Some(failures),
            _ => None,
        }
    }
}

fn format_failures(failures: &[EnrollmentFailure]) -> String {
    let lines: Vec<String> = failures.iter().map(ToString::to_string).collect();
    lines.join("; ")
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
