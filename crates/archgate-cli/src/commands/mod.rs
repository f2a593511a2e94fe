pub mod evaluate;
pub mod resolve;

use archgate_core::ArchgateConfig;
use archgate_registry::{Keychain, RegistryConfig, RegistryResolver};

/// Registry resolver with ambient credentials, configured from `[registry]`.
pub fn build_resolver(config: &ArchgateConfig) -> anyhow::Result<RegistryResolver> {
    let registry = RegistryConfig::from_section(&config.registry, config.request_timeout()?);
    let keychain = Keychain::ambient(config.registry.docker_config.clone());
    Ok(RegistryResolver::new(registry, keychain)?)
}
