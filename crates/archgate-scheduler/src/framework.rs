//! Plugin capability contract between a host scheduler and decision plugins.
//!
//! A plugin implements [`Plugin`] plus any of the capability traits
//! ([`FilterPlugin`], [`ScorePlugin`]). The host owns the decision
//! context and the per-cycle state and invokes the hooks for every
//! candidate node.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use archgate_core::{MachineDescriptor, WorkloadDescriptor};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

use crate::context::DecisionContext;

// ── Status ─────────────────────────────────────────────────────────

/// Outcome class of a plugin hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Success,
    /// The node can never run the workload as things stand.
    Unschedulable,
    /// The decision could not be made; the host should retry later.
    Error,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Success => write!(f, "Success"),
            Code::Unschedulable => write!(f, "Unschedulable"),
            Code::Error => write!(f, "Error"),
        }
    }
}

/// Result of a plugin hook: a code plus human-readable reasons. The first
/// reason is the headline; the rest are details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    code: Code,
    reasons: Vec<String>,
}

impl Status {
    pub fn new<I, S>(code: Code, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code,
            reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }

    pub fn success() -> Self {
        Self {
            code: Code::Success,
            reasons: Vec::new(),
        }
    }

    pub fn unschedulable(reason: impl Into<String>) -> Self {
        Self::new(Code::Unschedulable, [reason.into()])
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(Code::Error, [reason.into()])
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.reasons.push(detail.into());
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Reasons joined into one line.
    pub fn message(&self) -> String {
        self.reasons.join(", ")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reasons.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message())
        }
    }
}

// ── Cycle state ────────────────────────────────────────────────────

/// Scratch space shared by every hook within one scheduling cycle.
#[derive(Default)]
pub struct CycleState {
    entries: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Read a value back; `None` if absent or stored under another type.
    pub fn read<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.entries.get(key)?.value().clone();
        value.downcast::<T>().ok()
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl fmt::Debug for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleState")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// ── Nodes ──────────────────────────────────────────────────────────

/// The host's view of a candidate node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    node: MachineDescriptor,
}

impl NodeInfo {
    pub fn new(node: MachineDescriptor) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &MachineDescriptor {
        &self.node
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }
}

/// Looks up nodes by name. Score hooks only receive a node name.
pub trait NodeLister: Send + Sync {
    fn get(&self, name: &str) -> Option<MachineDescriptor>;
    fn list(&self) -> Vec<MachineDescriptor>;
}

/// A fixed node inventory.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeLister {
    nodes: HashMap<String, MachineDescriptor>,
}

impl StaticNodeLister {
    pub fn new(nodes: impl IntoIterator<Item = MachineDescriptor>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.name.clone(), n)).collect(),
        }
    }
}

impl NodeLister for StaticNodeLister {
    fn get(&self, name: &str) -> Option<MachineDescriptor> {
        self.nodes.get(name).cloned()
    }

    fn list(&self) -> Vec<MachineDescriptor> {
        let mut nodes: Vec<_> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }
}

// ── Capabilities ───────────────────────────────────────────────────

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

/// Hard admit/reject of a node for a workload.
#[async_trait]
pub trait FilterPlugin: Plugin {
    async fn filter(
        &self,
        ctx: &DecisionContext,
        state: &CycleState,
        workload: &WorkloadDescriptor,
        node: &NodeInfo,
    ) -> Status;
}

/// Soft preference among admitted nodes. Higher is better.
#[async_trait]
pub trait ScorePlugin: Plugin {
    async fn score(
        &self,
        ctx: &DecisionContext,
        state: &CycleState,
        workload: &WorkloadDescriptor,
        node_name: &str,
    ) -> (i64, Status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_details() {
        let status = Status::unschedulable("incompatible node architecture").with_detail("s390x");
        assert_eq!(status.code(), Code::Unschedulable);
        assert!(!status.is_success());
        assert_eq!(status.reasons(), ["incompatible node architecture", "s390x"]);
        assert_eq!(
            status.to_string(),
            "Unschedulable: incompatible node architecture, s390x"
        );
        assert_eq!(Status::success().to_string(), "Success");
    }

    #[test]
    fn status_serializes_code_in_snake_case() {
        let json = serde_json::to_value(Status::error("boom")).unwrap();
        assert_eq!(json["code"], "error");
        assert_eq!(json["reasons"][0], "boom");
    }

    #[test]
    fn cycle_state_is_typed() {
        let state = CycleState::new();
        state.write("count", 3usize);
        assert_eq!(state.read::<usize>("count").as_deref(), Some(&3));
        assert!(state.read::<String>("count").is_none());
        state.delete("count");
        assert!(state.read::<usize>("count").is_none());
    }

    #[test]
    fn static_lister_lists_sorted() {
        let lister = StaticNodeLister::new([
            MachineDescriptor::new("node-b", "arm64"),
            MachineDescriptor::new("node-a", "amd64"),
        ]);
        assert_eq!(lister.get("node-b").unwrap().architecture, "arm64");
        assert!(lister.get("node-z").is_none());
        let names: Vec<_> = lister.list().into_iter().map(|n| n.name).collect();
        assert_eq!(names, ["node-a", "node-b"]);
    }
}
