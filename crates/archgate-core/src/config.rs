//! archgate.toml configuration parser.
//!
//! Every section is optional; missing values fall back to the defaults
//! documented on each accessor.
//!
//! ```toml
//! [cache]
//! ttl = "10m"
//! sweep_interval = "1m"
//!
//! [registry]
//! request_timeout = "30s"
//! tls_verify = true
//! insecure_registries = ["registry.lab.internal:5000"]
//! single_arch_policy = "inspect-config"
//!
//! [filter]
//! resolve_timeout = "10s"
//!
//! [weights]
//! arm64 = 10
//! amd64 = 2
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Default lifetime of a cached architecture record.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default per-request timeout for registry calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for resolving a workload's images inside one decision.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchgateConfig {
    pub cache: CacheSection,
    pub registry: RegistrySection,
    pub filter: FilterSection,
    /// Architecture → score weight. Absent architectures score 0.
    pub weights: HashMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl: Option<String>,
    /// Interval of the optional background sweep. Unset disables sweeping.
    pub sweep_interval: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub request_timeout: Option<String>,
    pub tls_verify: bool,
    /// Registries reached over plain HTTP (host or host:port).
    pub insecure_registries: Vec<String>,
    pub single_arch_policy: SingleArchPolicy,
    /// Docker config file used for ambient credentials.
    /// Defaults to `$DOCKER_CONFIG/config.json` or `~/.docker/config.json`.
    pub docker_config: Option<PathBuf>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            request_timeout: None,
            tls_verify: true,
            insecure_registries: Vec::new(),
            single_arch_policy: SingleArchPolicy::default(),
            docker_config: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub resolve_timeout: Option<String>,
}

/// What to do when an image has a plain manifest instead of a manifest list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleArchPolicy {
    /// Fail resolution with a not-multi-arch error.
    Reject,
    /// Read the architecture declared in the image config blob.
    #[default]
    InspectConfig,
}

impl ArchgateConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ArchgateConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every duration string parses so a bad value fails at startup.
    pub fn validate(&self) -> ConfigResult<()> {
        self.cache_ttl()?;
        self.sweep_interval()?;
        self.request_timeout()?;
        self.resolve_timeout()?;
        Ok(())
    }

    /// Cache TTL (default 10 minutes). Must be non-zero.
    pub fn cache_ttl(&self) -> ConfigResult<Duration> {
        let ttl = duration_field("cache.ttl", self.cache.ttl.as_deref())?
            .unwrap_or(DEFAULT_CACHE_TTL);
        if ttl.is_zero() {
            return Err(ConfigError::Invalid {
                field: "cache.ttl",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(ttl)
    }

    pub fn sweep_interval(&self) -> ConfigResult<Option<Duration>> {
        duration_field("cache.sweep_interval", self.cache.sweep_interval.as_deref())
    }

    pub fn request_timeout(&self) -> ConfigResult<Duration> {
        Ok(
            duration_field("registry.request_timeout", self.registry.request_timeout.as_deref())?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        )
    }

    pub fn resolve_timeout(&self) -> ConfigResult<Duration> {
        Ok(
            duration_field("filter.resolve_timeout", self.filter.resolve_timeout.as_deref())?
                .unwrap_or(DEFAULT_RESOLVE_TIMEOUT),
        )
    }

    /// Example configuration printed by `archgate config`.
    pub fn example() -> Self {
        let mut weights = HashMap::new();
        weights.insert("arm64".to_string(), 10);
        weights.insert("amd64".to_string(), 2);
        Self {
            cache: CacheSection {
                ttl: Some("10m".to_string()),
                sweep_interval: Some("1m".to_string()),
            },
            registry: RegistrySection {
                request_timeout: Some("30s".to_string()),
                ..RegistrySection::default()
            },
            filter: FilterSection {
                resolve_timeout: Some("10s".to_string()),
            },
            weights,
        }
    }
}

fn duration_field(field: &'static str, value: Option<&str>) -> ConfigResult<Option<Duration>> {
    match value {
        None => Ok(None),
        Some(raw) => parse_duration(raw)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidDuration {
                field,
                value: raw.to_string(),
            }),
    }
}

/// Parse a duration string like "500ms", "5s", "10m", "1h", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
