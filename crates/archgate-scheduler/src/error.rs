//! Lookup error types.

use archgate_registry::ResolveError;
use thiserror::Error;

/// Resolution failed for one of a workload's images.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to resolve architectures for image {image}: {source}")]
pub struct LookupError {
    /// The image whose resolution failed, as written in the workload.
    pub image: String,
    pub source: ResolveError,
}

impl LookupError {
    pub fn new(image: impl Into<String>, source: ResolveError) -> Self {
        Self {
            image: image.into(),
            source,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

pub type LookupResult<T> = Result<T, LookupError>;
