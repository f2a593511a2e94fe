//! Plugin argument decoding.

use std::collections::HashMap;

use archgate_core::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_YAML: &str = "application/yaml";

/// Architecture → score weight. Architectures not listed weigh 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightArgs {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub weight: HashMap<String, i64>,
}

impl WeightArgs {
    pub fn new(weight: HashMap<String, i64>) -> Self {
        Self { weight }
    }

    pub fn weight_for(&self, architecture: &str) -> Option<i64> {
        self.weight.get(architecture).copied()
    }
}

/// Serialized plugin arguments as handed over by the host.
#[derive(Debug, Clone, Default)]
pub struct RawArgs {
    /// Empty means JSON.
    pub content_type: String,
    pub raw: Option<Vec<u8>>,
}

impl RawArgs {
    pub fn json(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: CONTENT_TYPE_JSON.to_string(),
            raw: Some(raw.into()),
        }
    }

    pub fn yaml(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: CONTENT_TYPE_YAML.to_string(),
            raw: Some(raw.into()),
        }
    }
}

/// Decode plugin args. Absent args or an absent payload yield `T::default()`.
pub fn decode_into<T>(args: Option<&RawArgs>) -> ConfigResult<T>
where
    T: DeserializeOwned + Default,
{
    let Some(args) = args else {
        return Ok(T::default());
    };
    let Some(raw) = args.raw.as_deref() else {
        return Ok(T::default());
    };

    match args.content_type.as_str() {
        CONTENT_TYPE_JSON | "" => {
            serde_json::from_slice(raw).map_err(|e| ConfigError::Parse(format!("json args: {e}")))
        }
        CONTENT_TYPE_YAML => {
            serde_yaml::from_slice(raw).map_err(|e| ConfigError::Parse(format!("yaml args: {e}")))
        }
        other => Err(ConfigError::UnsupportedContentType(other.to_string())),
    }
}
