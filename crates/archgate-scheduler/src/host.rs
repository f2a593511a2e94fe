//! A minimal plugin host: filter every node, score the survivors, rank.
//!
//! ```text
//! evaluate(workload, nodes)
//!   ├── per node, concurrently: filter plugins in registration order
//!   │     first non-success status rejects the node
//!   └── per admitted node: Σ weight × score over score plugins
//!         → ranked by total desc, node name asc
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use archgate_core::{MachineDescriptor, WorkloadDescriptor};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::DecisionContext;
use crate::framework::{CycleState, FilterPlugin, NodeInfo, ScorePlugin, Status};

/// An admitted node and its combined score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeScore {
    pub node: String,
    pub architecture: String,
    pub score: i64,
}

/// A node taken out of consideration, with the plugin and status that did it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub node: String,
    pub plugin: String,
    pub status: Status,
}

/// Outcome of one scheduling cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    /// Best first.
    pub ranked: Vec<NodeScore>,
    pub rejected: Vec<Rejection>,
}

impl Evaluation {
    pub fn best(&self) -> Option<&NodeScore> {
        self.ranked.first()
    }
}

/// Registered filter and score plugins.
#[derive(Default)]
pub struct Framework {
    filters: Vec<Arc<dyn FilterPlugin>>,
    scorers: Vec<(Arc<dyn ScorePlugin>, i64)>,
}

impl Framework {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, plugin: Arc<dyn FilterPlugin>) -> Self {
        self.filters.push(plugin);
        self
    }

    pub fn with_score(mut self, plugin: Arc<dyn ScorePlugin>, weight: i64) -> Self {
        self.scorers.push((plugin, weight));
        self
    }

    pub async fn evaluate(
        &self,
        ctx: &DecisionContext,
        workload: &WorkloadDescriptor,
        nodes: &[MachineDescriptor],
    ) -> Evaluation {
        let state = CycleState::new();

        let filtered = join_all(
            nodes
                .iter()
                .map(|node| self.run_filters(ctx, &state, workload, node)),
        )
        .await;

        let mut evaluation = Evaluation::default();
        let mut admitted = Vec::new();
        for (node, outcome) in nodes.iter().zip(filtered) {
            match outcome {
                Ok(()) => admitted.push(node),
                Err(rejection) => evaluation.rejected.push(rejection),
            }
        }

        for node in admitted {
            match self.run_scores(ctx, &state, workload, node).await {
                Ok(score) => evaluation.ranked.push(NodeScore {
                    node: node.name.clone(),
                    architecture: node.architecture.clone(),
                    score,
                }),
                Err(rejection) => evaluation.rejected.push(rejection),
            }
        }

        rank(&mut evaluation.ranked);

        info!(
            workload = %workload.key(),
            nodes = nodes.len(),
            admitted = evaluation.ranked.len(),
            rejected = evaluation.rejected.len(),
            best = evaluation.best().map(|n| n.node.as_str()),
            "evaluated workload"
        );
        evaluation
    }

    async fn run_filters(
        &self,
        ctx: &DecisionContext,
        state: &CycleState,
        workload: &WorkloadDescriptor,
        node: &MachineDescriptor,
    ) -> Result<(), Rejection> {
        let info = NodeInfo::new(node.clone());
        for plugin in &self.filters {
            let status = plugin.filter(ctx, state, workload, &info).await;
            if !status.is_success() {
                debug!(node = %node.name, plugin = plugin.name(), %status, "node filtered out");
                return Err(Rejection {
                    node: node.name.clone(),
                    plugin: plugin.name().to_string(),
                    status,
                });
            }
        }
        Ok(())
    }

    async fn run_scores(
        &self,
        ctx: &DecisionContext,
        state: &CycleState,
        workload: &WorkloadDescriptor,
        node: &MachineDescriptor,
    ) -> Result<i64, Rejection> {
        let mut total = 0i64;
        for (plugin, weight) in &self.scorers {
            let (score, status) = plugin.score(ctx, state, workload, &node.name).await;
            if !status.is_success() {
                return Err(Rejection {
                    node: node.name.clone(),
                    plugin: plugin.name().to_string(),
                    status,
                });
            }
            total = total.saturating_add(score.saturating_mul(*weight));
        }
        Ok(total)
    }
}

/// Sort descending by score, ties by node name ascending.
pub fn rank(scores: &mut [NodeScore]) {
    scores.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.node.cmp(&b.node),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{Code, Plugin};
    use async_trait::async_trait;

    /// Rejects nodes whose name starts with "bad".
    struct NamePlugin;

    impl Plugin for NamePlugin {
        fn name(&self) -> &str {
            "name"
        }
    }

    #[async_trait]
    impl FilterPlugin for NamePlugin {
        async fn filter(
            &self,
            _ctx: &DecisionContext,
            _state: &CycleState,
            _workload: &WorkloadDescriptor,
            node: &NodeInfo,
        ) -> Status {
            if node.name().starts_with("bad") {
                Status::unschedulable("bad node")
            } else {
                Status::success()
            }
        }
    }

    /// Scores by name length; errors on "broken".
    #[async_trait]
    impl ScorePlugin for NamePlugin {
        async fn score(
            &self,
            _ctx: &DecisionContext,
            _state: &CycleState,
            _workload: &WorkloadDescriptor,
            node_name: &str,
        ) -> (i64, Status) {
            if node_name == "broken" {
                return (0, Status::error("no score"));
            }
            (node_name.len() as i64, Status::success())
        }
    }

    fn score(node: &str, score: i64) -> NodeScore {
        NodeScore {
            node: node.to_string(),
            architecture: "amd64".to_string(),
            score,
        }
    }

    #[test]
    fn rank_breaks_ties_by_name() {
        let mut scores = vec![score("c", 5), score("b", 10), score("a", 5)];
        rank(&mut scores);
        let order: Vec<_> = scores.iter().map(|s| s.node.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn filters_then_scores_with_weight() {
        let plugin = Arc::new(NamePlugin);
        let framework = Framework::new()
            .with_filter(plugin.clone())
            .with_score(plugin, 2);
        let nodes = [
            MachineDescriptor::new("bad-1", "amd64"),
            MachineDescriptor::new("node", "amd64"),
            MachineDescriptor::new("longer-node", "amd64"),
            MachineDescriptor::new("broken", "amd64"),
        ];
        let workload = WorkloadDescriptor::from_images("web", ["nginx"]);

        let evaluation = framework
            .evaluate(&DecisionContext::new(), &workload, &nodes)
            .await;

        assert_eq!(evaluation.ranked, vec![score("longer-node", 22), score("node", 8)]);
        assert_eq!(evaluation.best().unwrap().node, "longer-node");

        let rejected: Vec<_> = evaluation
            .rejected
            .iter()
            .map(|r| (r.node.as_str(), r.status.code()))
            .collect();
        assert_eq!(
            rejected,
            [("bad-1", Code::Unschedulable), ("broken", Code::Error)]
        );
    }

    #[tokio::test]
    async fn no_plugins_admits_everything_with_zero() {
        let nodes = [MachineDescriptor::new("n1", "arm64")];
        let evaluation = Framework::new()
            .evaluate(
                &DecisionContext::new(),
                &WorkloadDescriptor::from_images("w", ["x"]),
                &nodes,
            )
            .await;
        assert_eq!(evaluation.ranked.len(), 1);
        assert_eq!(evaluation.ranked[0].score, 0);
        assert!(evaluation.rejected.is_empty());
    }
}
