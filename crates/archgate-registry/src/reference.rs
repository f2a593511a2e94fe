//! Image reference parsing.
//!
//! Accepts `[host[:port]/]path[:tag][@digest]` and normalizes Docker Hub
//! shorthand: `nginx` becomes `index.docker.io/library/nginx:latest`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ResolveError, ResolveResult};

/// Registry host that Docker Hub shorthand resolves to.
pub const DOCKER_HUB_REGISTRY: &str = "index.docker.io";

const DEFAULT_TAG: &str = "latest";
const MAX_NAME_LEN: usize = 255;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*|\[[0-9a-fA-F:]+\])(?::[0-9]+)?$",
    )
    .expect("domain regex")
});

static PATH_COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("path component regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").expect("tag regex"));

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[.+_-][a-z0-9]+)*:[a-zA-Z0-9=_-]{32,}$").expect("digest regex")
});

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    registry: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    pub fn parse(input: &str) -> ResolveResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::invalid(input, "empty reference"));
        }

        let (name_and_tag, digest) = match trimmed.split_once('@') {
            Some((rest, digest)) => {
                if !DIGEST_RE.is_match(digest) {
                    return Err(ResolveError::invalid(input, format!("bad digest {digest:?}")));
                }
                (rest, Some(digest.to_string()))
            }
            None => (trimmed, None),
        };

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let last_slash = name_and_tag.rfind('/');
        let (name, tag) = match name_and_tag.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                let tag = &name_and_tag[colon + 1..];
                if !TAG_RE.is_match(tag) {
                    return Err(ResolveError::invalid(input, format!("bad tag {tag:?}")));
                }
                (&name_and_tag[..colon], Some(tag.to_string()))
            }
            _ => (name_and_tag, None),
        };

        if name.is_empty() {
            return Err(ResolveError::invalid(input, "missing repository"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ResolveError::invalid(input, "repository name too long"));
        }

        let (registry, path) = match name.split_once('/') {
            Some((first, rest)) if looks_like_domain(first) => (first.to_string(), rest),
            _ => (DOCKER_HUB_REGISTRY.to_string(), name),
        };

        if !DOMAIN_RE.is_match(&registry) {
            return Err(ResolveError::invalid(input, format!("bad registry {registry:?}")));
        }
        for component in path.split('/') {
            if !PATH_COMPONENT_RE.is_match(component) {
                return Err(ResolveError::invalid(
                    input,
                    format!("bad repository component {component:?}"),
                ));
            }
        }

        let registry = if registry == "docker.io" {
            DOCKER_HUB_REGISTRY.to_string()
        } else {
            registry
        };
        let repository = if registry == DOCKER_HUB_REGISTRY && !path.contains('/') {
            format!("library/{path}")
        } else {
            path.to_string()
        };

        let tag = if tag.is_none() && digest.is_none() {
            Some(DEFAULT_TAG.to_string())
        } else {
            tag
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Registry host, with port if one was given.
    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// What goes after `/manifests/`: the digest when pinned, else the tag.
    pub fn identifier(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }

    /// Registry host without the port (brackets kept for IPv6).
    pub fn host(&self) -> &str {
        if self.registry.starts_with('[') {
            match self.registry.find(']') {
                Some(end) => &self.registry[..=end],
                None => &self.registry,
            }
        } else {
            self.registry
                .split_once(':')
                .map_or(self.registry.as_str(), |(host, _)| host)
        }
    }

    /// Whether the registry is on this machine or a local-only name.
    pub fn is_local(&self) -> bool {
        let host = self.host();
        host == "localhost"
            || host == "127.0.0.1"
            || host == "[::1]"
            || host.ends_with(".localhost")
            || host.ends_with(".local")
    }

    /// `http` for local or explicitly insecure registries, `https` otherwise.
    pub fn scheme(&self, insecure_registries: &[String]) -> &'static str {
        let insecure = insecure_registries
            .iter()
            .any(|r| r == &self.registry || r == self.host());
        if insecure || self.is_local() {
            "http"
        } else {
            "https"
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Reference {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn looks_like_domain(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
