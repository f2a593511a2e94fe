//! archgate-registry: image reference to architecture resolution.
//!
//! # Components
//!
//! - **`reference`**: parse and normalize `[host[:port]/]path[:tag][@digest]`
//! - **`keychain`**: credential lookup (docker config, credential helpers, ECR)
//! - **`auth`**: `WWW-Authenticate` challenges and bearer token responses
//! - **`manifest`**: OCI index / Docker manifest list documents
//! - **`transport`**: one-shot HTTP/1.1 GET over TCP or TLS
//! - **`client`**: [`RegistryResolver`], the registry-backed [`Resolver`]
//!
//! # Resolution
//!
//! ```text
//! resolve("nginx:1.25")
//!   → Reference::parse        index.docker.io/library/nginx:1.25
//!   → GET /v2/<repo>/manifests/<tag|digest>
//!       401 → keychain → Basic | Bearer token → retry once
//!   → index?  platform architectures in document order
//!   → image?  reject, or read `architecture` from the config blob
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod keychain;
pub mod manifest;
pub mod reference;
pub mod resolver;
pub mod transport;

pub use client::{FetchedManifest, RegistryConfig, RegistryResolver};
pub use error::{ResolveError, ResolveResult};
pub use keychain::{
    AnonymousProvider, Credential, CredentialProvider, DockerConfigProvider, HelperProvider,
    HostPredicate, Keychain,
};
pub use reference::Reference;
pub use resolver::Resolver;
