//! The resolution seam between architecture lookup and a registry.

use async_trait::async_trait;

use crate::error::ResolveResult;

/// Maps an image reference to the CPU architectures it was published for.
///
/// An empty list is a successful answer (an index with no platform
/// entries); callers treat it as "runs nowhere".
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, image: &str) -> ResolveResult<Vec<String>>;
}
