//! Shared types used across archgate crates.

use serde::{Deserialize, Serialize};

/// An image reference exactly as written in a workload's container list.
///
/// Used verbatim as the architecture cache key.
pub type ImageRef = String;

/// CPU instruction-set family reported by a machine or declared by an image
/// platform entry ("amd64", "arm64", "s390x", ...).
pub type Architecture = String;

// ── Workload ───────────────────────────────────────────────────────

/// A single container of a workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: ImageRef,
}

/// Read-only view of a workload handed to the decision plugins per cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    pub containers: Vec<ContainerSpec>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl WorkloadDescriptor {
    /// Build a workload from bare image references, naming containers `c0`, `c1`, ...
    pub fn from_images<I, S>(name: &str, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let containers = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| ContainerSpec {
                name: format!("c{i}"),
                image: image.into(),
            })
            .collect();
        Self {
            namespace: default_namespace(),
            name: name.to_string(),
            containers,
        }
    }

    /// Container image references in declaration order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.containers.iter().map(|c| c.image.as_str())
    }

    /// `namespace/name`, the form used in log fields.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ── Machine ────────────────────────────────────────────────────────

/// Read-only view of a candidate machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineDescriptor {
    pub name: String,
    pub architecture: Architecture,
}

impl MachineDescriptor {
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
        }
    }
}

// ── Architecture record ────────────────────────────────────────────

/// The architectures an image was resolved to support.
///
/// Only ever produced by a successful resolution. Order mirrors the
/// registry's manifest list but carries no meaning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchitectureRecord {
    pub image: ImageRef,
    pub architectures: Vec<Architecture>,
}

impl ArchitectureRecord {
    pub fn new(image: impl Into<String>, architectures: Vec<Architecture>) -> Self {
        Self {
            image: image.into(),
            architectures,
        }
    }

    /// Whether the image can run on `arch`. An empty record supports nothing.
    pub fn supports(&self, arch: &str) -> bool {
        self.architectures.iter().any(|a| a == arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_supports_nothing() {
        let record = ArchitectureRecord::new("busybox", vec![]);
        assert!(!record.supports("amd64"));
        assert!(!record.supports(""));
    }

    #[test]
    fn record_membership() {
        let record = ArchitectureRecord::new(
            "nginx:1.25",
            vec!["amd64".to_string(), "arm64".to_string()],
        );
        assert!(record.supports("arm64"));
        assert!(!record.supports("s390x"));
    }

    #[test]
    fn workload_from_images_keeps_order() {
        let workload = WorkloadDescriptor::from_images("web", ["nginx", "envoy:v1"]);
        let images: Vec<&str> = workload.images().collect();
        assert_eq!(images, vec!["nginx", "envoy:v1"]);
        assert_eq!(workload.containers[1].name, "c1");
        assert_eq!(workload.key(), "default/web");
    }

    #[test]
    fn workload_namespace_defaults_when_missing() {
        let json = r#"{"name":"api","containers":[{"name":"app","image":"redis:7"}]}"#;
        let workload: WorkloadDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(workload.namespace, "default");
        assert_eq!(workload.containers[0].image, "redis:7");
    }
}
