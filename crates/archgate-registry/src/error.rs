//! Resolution error types.

use thiserror::Error;

/// Result type alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Why an image's architectures could not be determined.
///
/// Resolution never retries internally; the caller decides what a failure
/// means for the decision at hand. See [`ResolveError::is_retryable`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("authentication failed for {registry}: {reason}")]
    Authentication { registry: String, reason: String },

    #[error("image {reference} is not a multi-arch image (media type {media_type})")]
    NotMultiArch {
        reference: String,
        media_type: String,
    },

    #[error("manifest unavailable for {reference}: {reason}")]
    ManifestUnavailable { reference: String, reason: String },

    #[error("registry transport error: {0}")]
    Transport(String),

    #[error("registry request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Whether the failure may clear up on a later scheduling cycle.
    ///
    /// Transport faults, timeouts and cancellations are transient. A bad
    /// reference, refused credentials, or a missing manifest will fail the
    /// same way next time until someone changes the workload or registry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::Transport(_) | ResolveError::Timeout(_) | ResolveError::Cancelled
        )
    }

    pub(crate) fn invalid(reference: &str, reason: impl Into<String>) -> Self {
        ResolveError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(reference: impl ToString, reason: impl Into<String>) -> Self {
        ResolveError::ManifestUnavailable {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}
