//! The `archfilter` plugin.
//!
//! Filter admits a node only when every container image of the workload
//! was published for the node's architecture. Score ranks admitted nodes
//! by a static per-architecture weight.

use std::sync::Arc;

use archgate_core::{ArchitectureRecord, ConfigResult, WorkloadDescriptor};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::args::{RawArgs, WeightArgs, decode_into};
use crate::context::DecisionContext;
use crate::framework::{CycleState, FilterPlugin, NodeInfo, NodeLister, Plugin, ScorePlugin, Status};
use crate::lookup::ArchLookup;

pub const NAME: &str = "archfilter";

pub const REASON_RESOLVE_FAILED: &str = "failed to resolve image architectures";
pub const REASON_INCOMPATIBLE: &str = "incompatible node architecture";
pub const REASON_NO_NODE_ARCH: &str = "node reports no architecture";
pub const REASON_NODE_NOT_FOUND: &str = "failed to get node";

pub struct ArchFilter {
    weights: WeightArgs,
    nodes: Arc<dyn NodeLister>,
    lookup: ArchLookup,
}

impl ArchFilter {
    /// Build from serialized args. Malformed args fail construction.
    pub fn new(
        args: Option<&RawArgs>,
        nodes: Arc<dyn NodeLister>,
        lookup: ArchLookup,
    ) -> ConfigResult<Self> {
        let weights: WeightArgs = decode_into(args)?;
        Ok(Self::with_weights(weights, nodes, lookup))
    }

    pub fn with_weights(weights: WeightArgs, nodes: Arc<dyn NodeLister>, lookup: ArchLookup) -> Self {
        Self {
            weights,
            nodes,
            lookup,
        }
    }

    pub fn weights(&self) -> &WeightArgs {
        &self.weights
    }

    pub fn lookup(&self) -> &ArchLookup {
        &self.lookup
    }
}

impl Plugin for ArchFilter {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl FilterPlugin for ArchFilter {
    async fn filter(
        &self,
        ctx: &DecisionContext,
        _state: &CycleState,
        workload: &WorkloadDescriptor,
        node: &NodeInfo,
    ) -> Status {
        let arch = node.node().architecture.as_str();
        debug!(workload = %workload.key(), node = node.name(), arch, "filter");

        if arch.is_empty() {
            warn!(node = node.name(), "node reports no architecture");
            return Status::error(REASON_NO_NODE_ARCH).with_detail(node.name());
        }

        let records = match self.lookup.architectures_for(ctx, workload).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    workload = %workload.key(),
                    image = %e.image,
                    error = %e.source,
                    retryable = e.is_retryable(),
                    "failed to resolve image architectures"
                );
                return Status::error(REASON_RESOLVE_FAILED).with_detail(e.to_string());
            }
        };

        check_compatibility(&records, arch)
    }
}

#[async_trait]
impl ScorePlugin for ArchFilter {
    async fn score(
        &self,
        _ctx: &DecisionContext,
        _state: &CycleState,
        _workload: &WorkloadDescriptor,
        node_name: &str,
    ) -> (i64, Status) {
        let Some(node) = self.nodes.get(node_name) else {
            warn!(node = node_name, "score requested for unknown node");
            return (0, Status::error(REASON_NODE_NOT_FOUND).with_detail(node_name));
        };

        let score = score_architecture(&self.weights, &node.architecture);
        debug!(node = node_name, arch = %node.architecture, score, "score");
        (score, Status::success())
    }
}

/// Admit when every record supports `arch`; reject on the first that does
/// not. A record with no architectures supports nothing.
pub fn check_compatibility(records: &[ArchitectureRecord], arch: &str) -> Status {
    match records.iter().find(|r| !r.supports(arch)) {
        Some(record) => {
            debug!(image = %record.image, available = ?record.architectures, arch, "incompatible image");
            Status::unschedulable(REASON_INCOMPATIBLE).with_detail(arch)
        }
        None => Status::success(),
    }
}

/// The configured weight for `arch`, or 0.
pub fn score_architecture(weights: &WeightArgs, arch: &str) -> i64 {
    weights.weight_for(arch).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::Code;
    use std::collections::HashMap;

    fn record(image: &str, archs: &[&str]) -> ArchitectureRecord {
        ArchitectureRecord::new(image, archs.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn admits_when_all_images_support_arch() {
        let records = [
            record("nginx", &["amd64", "arm64"]),
            record("redis", &["arm64"]),
        ];
        assert!(check_compatibility(&records, "arm64").is_success());
    }

    #[test]
    fn rejects_citing_node_arch() {
        let records = [record("nginx", &["amd64", "arm64"])];
        let status = check_compatibility(&records, "s390x");
        assert_eq!(status.code(), Code::Unschedulable);
        assert_eq!(status.reasons(), [REASON_INCOMPATIBLE, "s390x"]);
    }

    #[test]
    fn empty_record_never_admits() {
        let records = [record("scratch", &[])];
        for arch in ["amd64", "arm64", "riscv64", ""] {
            assert_eq!(
                check_compatibility(&records, arch).code(),
                Code::Unschedulable,
                "{arch}"
            );
        }
    }

    #[test]
    fn no_images_admits() {
        assert!(check_compatibility(&[], "amd64").is_success());
    }

    #[test]
    fn score_defaults_to_zero() {
        let weights = WeightArgs::new(HashMap::from([("arm64".to_string(), 10)]));
        assert_eq!(score_architecture(&weights, "arm64"), 10);
        assert_eq!(score_architecture(&weights, "amd64"), 0);
        assert_eq!(score_architecture(&WeightArgs::default(), "arm64"), 0);
    }
}
