//! Architecture lookup: cache first, registry on miss.

use std::sync::Arc;

use archgate_cache::ArchCache;
use archgate_core::{ArchitectureRecord, WorkloadDescriptor};
use archgate_registry::Resolver;
use tracing::debug;

use crate::context::DecisionContext;
use crate::error::{LookupError, LookupResult};

/// Resolves every image of a workload to its architecture set.
///
/// Owns the injected cache and resolver. Concurrent misses for the same
/// image each go to the resolver; the last write wins and all writers
/// store the same answer.
#[derive(Clone)]
pub struct ArchLookup {
    cache: Arc<ArchCache>,
    resolver: Arc<dyn Resolver>,
}

impl ArchLookup {
    pub fn new(cache: Arc<ArchCache>, resolver: Arc<dyn Resolver>) -> Self {
        Self { cache, resolver }
    }

    pub fn cache(&self) -> &Arc<ArchCache> {
        &self.cache
    }

    /// One record per container image, in workload order.
    ///
    /// Fails on the first image that cannot be resolved; records already
    /// fetched for earlier images stay cached.
    pub async fn architectures_for(
        &self,
        ctx: &DecisionContext,
        workload: &WorkloadDescriptor,
    ) -> LookupResult<Vec<ArchitectureRecord>> {
        let mut records = Vec::with_capacity(workload.containers.len());
        for image in workload.images() {
            records.push(self.lookup_image(ctx, image).await?);
        }
        Ok(records)
    }

    pub async fn lookup_image(
        &self,
        ctx: &DecisionContext,
        image: &str,
    ) -> LookupResult<ArchitectureRecord> {
        if let Some(record) = self.cache.get(image) {
            return Ok(record);
        }

        debug!(image, "resolving image architectures");
        let architectures = ctx
            .run(self.resolver.resolve(image))
            .await
            .map_err(|source| LookupError::new(image, source))?;

        self.cache.put(image, architectures.clone());
        Ok(ArchitectureRecord::new(image, architectures))
    }
}
