//! archgate-core: shared types, configuration, and errors.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ArchgateConfig, CacheSection, DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT,
    FilterSection, RegistrySection, SingleArchPolicy, parse_duration,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
