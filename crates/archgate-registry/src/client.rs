//! Registry client: manifest retrieval, the token handshake, and mapping
//! a manifest to the architectures it covers.

use std::time::Duration;

use archgate_core::{DEFAULT_REQUEST_TIMEOUT, RegistrySection, SingleArchPolicy};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, WWW_AUTHENTICATE};
use http::{StatusCode, Uri};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::{Challenge, TokenResponse};
use crate::error::{ResolveError, ResolveResult};
use crate::keychain::{Credential, Keychain};
use crate::manifest::{ImageConfig, ImageIndex, ImageManifest, MANIFEST_ACCEPT, ManifestKind};
use crate::reference::Reference;
use crate::resolver::Resolver;
use crate::transport::{HttpResponse, HttpTransport, TlsConfig};

const MAX_REDIRECTS: usize = 5;

/// Registry client settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub request_timeout: Duration,
    pub tls_verify: bool,
    /// Registries reached over plain HTTP.
    pub insecure_registries: Vec<String>,
    pub single_arch_policy: SingleArchPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tls_verify: true,
            insecure_registries: Vec::new(),
            single_arch_policy: SingleArchPolicy::default(),
        }
    }
}

impl RegistryConfig {
    pub fn from_section(section: &RegistrySection, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            tls_verify: section.tls_verify,
            insecure_registries: section.insecure_registries.clone(),
            single_arch_policy: section.single_arch_policy,
        }
    }
}

/// A manifest body together with how it was classified.
#[derive(Debug, Clone)]
pub struct FetchedManifest {
    pub kind: ManifestKind,
    pub media_type: String,
    pub body: Bytes,
}

/// Resolves image references against OCI distribution registries.
pub struct RegistryResolver {
    config: RegistryConfig,
    transport: HttpTransport,
    keychain: Keychain,
}

impl RegistryResolver {
    pub fn new(config: RegistryConfig, keychain: Keychain) -> ResolveResult<Self> {
        let tls = TlsConfig::for_registry(config.tls_verify)?;
        let transport = HttpTransport::new(tls, config.request_timeout);
        Ok(Self {
            config,
            transport,
            keychain,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Resolve a parsed reference to its architecture list.
    pub async fn resolve_reference(&self, reference: &Reference) -> ResolveResult<Vec<String>> {
        let manifest = self.fetch_manifest(reference).await?;

        match manifest.kind {
            ManifestKind::Index => {
                let index: ImageIndex = serde_json::from_slice(&manifest.body).map_err(|e| {
                    ResolveError::unavailable(reference, format!("malformed image index: {e}"))
                })?;
                let architectures = index.architectures();
                debug!(
                    registry = reference.registry(),
                    repository = reference.repository(),
                    media_type = %manifest.media_type,
                    ?architectures,
                    "resolved image index"
                );
                Ok(architectures)
            }
            ManifestKind::Image => match self.config.single_arch_policy {
                SingleArchPolicy::Reject => Err(ResolveError::NotMultiArch {
                    reference: reference.to_string(),
                    media_type: manifest.media_type,
                }),
                SingleArchPolicy::InspectConfig => {
                    let architecture = self.config_architecture(reference, &manifest).await?;
                    debug!(
                        registry = reference.registry(),
                        repository = reference.repository(),
                        media_type = %manifest.media_type,
                        %architecture,
                        "resolved single-platform image from config"
                    );
                    Ok(vec![architecture])
                }
            },
        }
    }

    /// Fetch and classify the manifest `reference` points at.
    pub async fn fetch_manifest(&self, reference: &Reference) -> ResolveResult<FetchedManifest> {
        let uri = self.endpoint(
            reference,
            &format!("manifests/{}", reference.identifier()),
        )?;
        let response = self
            .authorized_get(reference, uri, HeaderValue::from_static(MANIFEST_ACCEPT))
            .await?;
        check_status(reference, &response, "manifest")?;

        if let Some(digest) = reference.digest() {
            verify_digest(reference, digest, &response.body)?;
        }

        let content_type = response.header(CONTENT_TYPE).unwrap_or_default().to_string();
        let kind = ManifestKind::from_media_type(&content_type)
            .or_else(|| ManifestKind::sniff(&response.body))
            .ok_or_else(|| {
                ResolveError::unavailable(
                    reference,
                    format!("unrecognized manifest media type {content_type:?}"),
                )
            })?;

        Ok(FetchedManifest {
            kind,
            media_type: content_type,
            body: response.body,
        })
    }

    async fn config_architecture(
        &self,
        reference: &Reference,
        manifest: &FetchedManifest,
    ) -> ResolveResult<String> {
        let image: ImageManifest = serde_json::from_slice(&manifest.body).map_err(|e| {
            ResolveError::unavailable(reference, format!("malformed image manifest: {e}"))
        })?;
        let digest = image.config.digest;

        let uri = self.endpoint(reference, &format!("blobs/{digest}"))?;
        let response = self
            .authorized_get(reference, uri, HeaderValue::from_static("*/*"))
            .await?;
        check_status(reference, &response, "config blob")?;
        verify_digest(reference, &digest, &response.body)?;

        let config: ImageConfig = serde_json::from_slice(&response.body).map_err(|e| {
            ResolveError::unavailable(reference, format!("malformed image config: {e}"))
        })?;
        config
            .architecture
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ResolveError::unavailable(reference, "image config has no architecture"))
    }

    fn endpoint(&self, reference: &Reference, suffix: &str) -> ResolveResult<Uri> {
        let scheme = reference.scheme(&self.config.insecure_registries);
        let url = format!(
            "{scheme}://{}/v2/{}/{suffix}",
            reference.registry(),
            reference.repository()
        );
        url.parse()
            .map_err(|e| ResolveError::invalid(&reference.to_string(), format!("bad url {url}: {e}")))
    }

    /// GET with the anonymous-first auth flow.
    ///
    /// A 401 carries a challenge; the keychain supplies a credential and the
    /// request is retried once with Basic auth or a bearer token. A second
    /// 401 or a 403 means the registry refused access.
    async fn authorized_get(
        &self,
        reference: &Reference,
        uri: Uri,
        accept: HeaderValue,
    ) -> ResolveResult<HttpResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, accept);

        let response = self.follow(uri.clone(), headers.clone()).await?;
        if response.status == StatusCode::FORBIDDEN {
            return Err(auth_error(reference, "access forbidden"));
        }
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .header(WWW_AUTHENTICATE)
            .and_then(Challenge::parse)
            .ok_or_else(|| auth_error(reference, "401 without a usable WWW-Authenticate challenge"))?;
        let credential = self.keychain.resolve(reference.registry()).await?;

        let authorization = match challenge {
            Challenge::Basic { .. } => credential
                .basic_header()
                .ok_or_else(|| auth_error(reference, "registry requires credentials"))?,
            Challenge::Bearer {
                realm,
                service,
                scope,
            } => {
                let scope =
                    scope.unwrap_or_else(|| format!("repository:{}:pull", reference.repository()));
                let token = self
                    .fetch_token(reference, &realm, service.as_deref(), &scope, &credential)
                    .await?;
                format!("Bearer {token}")
            }
        };
        let value = HeaderValue::from_str(&authorization)
            .map_err(|_| auth_error(reference, "credential is not a valid header value"))?;
        headers.insert(AUTHORIZATION, value);

        let response = self.follow(uri, headers).await?;
        match response.status {
            StatusCode::UNAUTHORIZED => Err(auth_error(reference, "credentials rejected")),
            StatusCode::FORBIDDEN => Err(auth_error(reference, "access forbidden")),
            _ => Ok(response),
        }
    }

    async fn fetch_token(
        &self,
        reference: &Reference,
        realm: &str,
        service: Option<&str>,
        scope: &str,
        credential: &Credential,
    ) -> ResolveResult<String> {
        let mut url = realm.to_string();
        let mut separator = if realm.contains('?') { '&' } else { '?' };
        if let Some(service) = service {
            url.push(separator);
            url.push_str("service=");
            url.push_str(&encode_query_value(service));
            separator = '&';
        }
        url.push(separator);
        url.push_str("scope=");
        url.push_str(&encode_query_value(scope));

        let uri: Uri = url
            .parse()
            .map_err(|e| auth_error(reference, &format!("bad token realm {realm:?}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(basic) = credential.basic_header() {
            let value = HeaderValue::from_str(&basic)
                .map_err(|_| auth_error(reference, "credential is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        debug!(registry = reference.registry(), %scope, "requesting bearer token");
        let response = self.follow(uri, headers).await?;
        if !response.status.is_success() {
            return Err(auth_error(
                reference,
                &format!("token endpoint returned {}", response.status),
            ));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| auth_error(reference, &format!("malformed token response: {e}")))?;
        token
            .into_token()
            .ok_or_else(|| auth_error(reference, "token response carried no token"))
    }

    /// GET following up to `MAX_REDIRECTS` redirects. Authorization is only
    /// sent to the host it was issued for.
    async fn follow(&self, mut uri: Uri, mut headers: HeaderMap) -> ResolveResult<HttpResponse> {
        for _ in 0..=MAX_REDIRECTS {
            let response = self.transport.get(&uri, &headers).await?;
            if !response.status.is_redirection() {
                return Ok(response);
            }
            let location = response.header(LOCATION).ok_or_else(|| {
                ResolveError::Transport(format!("{} redirect without Location from {uri}", response.status))
            })?;
            let next = resolve_location(&uri, location)?;
            if next.authority() != uri.authority() {
                headers.remove(AUTHORIZATION);
            }
            debug!(from = %uri, to = %next, "following registry redirect");
            uri = next;
        }
        Err(ResolveError::Transport(format!(
            "too many redirects (more than {MAX_REDIRECTS})"
        )))
    }
}

#[async_trait]
impl Resolver for RegistryResolver {
    async fn resolve(&self, image: &str) -> ResolveResult<Vec<String>> {
        let reference = Reference::parse(image)?;
        self.resolve_reference(&reference).await
    }
}

fn auth_error(reference: &Reference, reason: &str) -> ResolveError {
    ResolveError::Authentication {
        registry: reference.registry().to_string(),
        reason: reason.to_string(),
    }
}

fn check_status(reference: &Reference, response: &HttpResponse, what: &str) -> ResolveResult<()> {
    let status = response.status;
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ResolveError::unavailable(reference, format!("{what} not found")));
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ResolveError::Transport(format!(
            "registry {} returned {status} for {what}",
            reference.registry()
        )));
    }
    Err(ResolveError::unavailable(
        reference,
        format!("registry returned {status} for {what}"),
    ))
}

/// Check a body against a `sha256:<hex>` digest. Other algorithms pass.
fn verify_digest(reference: &Reference, digest: &str, body: &[u8]) -> ResolveResult<()> {
    let Some(expected) = digest.strip_prefix("sha256:") else {
        return Ok(());
    };
    let actual = hex::encode(Sha256::digest(body));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ResolveError::unavailable(
            reference,
            format!("digest mismatch: expected sha256:{expected}, got sha256:{actual}"),
        ))
    }
}

fn resolve_location(base: &Uri, location: &str) -> ResolveResult<Uri> {
    let bad = |e: http::uri::InvalidUri| {
        ResolveError::Transport(format!("bad redirect location {location:?}: {e}"))
    };
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.parse().map_err(bad);
    }
    let scheme = base.scheme_str().unwrap_or("https");
    let authority = base.authority().map_or("", |a| a.as_str());
    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        let dir = base.path().rsplit_once('/').map_or("", |(dir, _)| dir);
        format!("{dir}/{location}")
    };
    format!("{scheme}://{authority}{path}").parse().map_err(bad)
}

fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Reference {
        Reference::parse("registry.lab/app:v1").unwrap()
    }

    #[test]
    fn digest_verification() {
        let body = b"{}";
        let good = format!("sha256:{}", hex::encode(Sha256::digest(body)));
        assert!(verify_digest(&reference(), &good, body).is_ok());

        let bad = format!("sha256:{}", "0".repeat(64));
        let err = verify_digest(&reference(), &bad, body).unwrap_err();
        assert!(matches!(err, ResolveError::ManifestUnavailable { .. }));

        assert!(verify_digest(&reference(), "sha512:abc", body).is_ok());
    }

    #[test]
    fn status_mapping() {
        let response = |status: u16| HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert!(check_status(&reference(), &response(200), "manifest").is_ok());
        assert!(matches!(
            check_status(&reference(), &response(404), "manifest"),
            Err(ResolveError::ManifestUnavailable { .. })
        ));
        assert!(matches!(
            check_status(&reference(), &response(503), "manifest"),
            Err(ResolveError::Transport(_))
        ));
        assert!(matches!(
            check_status(&reference(), &response(429), "manifest"),
            Err(ResolveError::Transport(_))
        ));
        assert!(matches!(
            check_status(&reference(), &response(400), "manifest"),
            Err(ResolveError::ManifestUnavailable { .. })
        ));
    }

    #[test]
    fn redirect_locations() {
        let base: Uri = "https://registry.lab/v2/app/blobs/sha256:abc".parse().unwrap();
        assert_eq!(
            resolve_location(&base, "https://cdn.example/blob?sig=1").unwrap().to_string(),
            "https://cdn.example/blob?sig=1"
        );
        assert_eq!(
            resolve_location(&base, "/storage/abc").unwrap().to_string(),
            "https://registry.lab/storage/abc"
        );
        assert_eq!(
            resolve_location(&base, "other").unwrap().to_string(),
            "https://registry.lab/v2/app/blobs/other"
        );
    }

    #[test]
    fn query_values_are_percent_encoded() {
        assert_eq!(
            encode_query_value("repository:library/nginx:pull"),
            "repository:library/nginx:pull"
        );
        assert_eq!(encode_query_value("a b&c=d"), "a%20b%26c%3Dd");
    }

    #[test]
    fn config_from_section() {
        let section = RegistrySection {
            insecure_registries: vec!["registry.lab:5000".into()],
            single_arch_policy: SingleArchPolicy::Reject,
            ..RegistrySection::default()
        };
        let config = RegistryConfig::from_section(&section, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert!(config.tls_verify);
        assert_eq!(config.single_arch_policy, SingleArchPolicy::Reject);
        assert_eq!(config.insecure_registries, vec!["registry.lab:5000"]);
    }
}
