//! Credential selection per registry host.
//!
//! A [`Keychain`] is an ordered list of (host predicate, provider) rules
//! evaluated first-match, with a fallback provider for every other host.
//! [`Keychain::ambient`] builds the default chain:
//!
//! ```text
//! <acct>.dkr.ecr.<region>.amazonaws.com  → docker-credential-ecr-login
//! anything else                          → Docker config file → anonymous
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::reference::DOCKER_HUB_REGISTRY;

/// Hostnames of AWS Elastic Container Registry endpoints.
pub static ECR_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{12}\.dkr\.ecr(?:-fips)?\.[a-z0-9-]+\.amazonaws\.com(?:\.cn)?$")
        .expect("ecr host regex")
});

/// Executable name prefix of Docker credential helpers.
const HELPER_PROGRAM_PREFIX: &str = "docker-credential-";

/// Key Docker uses for Docker Hub in `config.json`.
const DOCKER_HUB_CONFIG_KEY: &str = "https://index.docker.io/v1/";

/// Credentials presented to a registry.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Anonymous,
    Basic { username: String, password: String },
}

impl Credential {
    /// `Authorization` header value for basic auth, if any.
    pub fn basic_header(&self) -> Option<String> {
        match self {
            Credential::Anonymous => None,
            Credential::Basic { username, password } => Some(format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{username}:{password}"))
            )),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Anonymous => f.write_str("Anonymous"),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Something that can produce credentials for a registry host.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Credentials for `registry` (host, with port if any).
    async fn credential(&self, registry: &str) -> ResolveResult<Credential>;
}

/// Selects which registries a keychain rule applies to.
#[derive(Debug, Clone)]
pub enum HostPredicate {
    /// Host (without port) matches the regex.
    Pattern(Regex),
    /// Host (without port) ends with the suffix.
    Suffix(String),
}

impl HostPredicate {
    pub fn matches(&self, registry: &str) -> bool {
        let host = strip_port(registry);
        match self {
            HostPredicate::Pattern(re) => re.is_match(host),
            HostPredicate::Suffix(suffix) => host.ends_with(suffix.as_str()),
        }
    }
}

/// Ordered credential rules with a fallback.
#[derive(Clone)]
pub struct Keychain {
    rules: Vec<(HostPredicate, Arc<dyn CredentialProvider>)>,
    fallback: Arc<dyn CredentialProvider>,
}

impl Keychain {
    pub fn new(fallback: Arc<dyn CredentialProvider>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// A keychain that never authenticates.
    pub fn anonymous() -> Self {
        Self::new(Arc::new(AnonymousProvider))
    }

    /// ECR hosts go through the `ecr-login` helper; everything else reads
    /// the Docker config file at `docker_config` (or its default location).
    pub fn ambient(docker_config: Option<PathBuf>) -> Self {
        let docker = DockerConfigProvider::new(docker_config.or_else(default_docker_config_path));
        Self::new(Arc::new(docker)).with_rule(
            HostPredicate::Pattern(ECR_HOST_RE.clone()),
            Arc::new(HelperProvider::new("ecr-login")),
        )
    }

    /// Append a rule. Rules are tried in insertion order.
    pub fn with_rule(mut self, predicate: HostPredicate, provider: Arc<dyn CredentialProvider>) -> Self {
        self.rules.push((predicate, provider));
        self
    }

    /// The provider responsible for `registry`.
    pub fn provider_for(&self, registry: &str) -> &Arc<dyn CredentialProvider> {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate.matches(registry))
            .map(|(_, provider)| provider)
            .unwrap_or(&self.fallback)
    }

    pub async fn resolve(&self, registry: &str) -> ResolveResult<Credential> {
        let provider = self.provider_for(registry);
        let credential = provider.credential(registry).await?;
        debug!(
            %registry,
            provider = provider.name(),
            anonymous = matches!(credential, Credential::Anonymous),
            "resolved registry credentials"
        );
        Ok(credential)
    }
}

// ── Anonymous ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousProvider;

#[async_trait]
impl CredentialProvider for AnonymousProvider {
    fn name(&self) -> &str {
        "anonymous"
    }

    async fn credential(&self, _registry: &str) -> ResolveResult<Credential> {
        Ok(Credential::Anonymous)
    }
}

// ── Docker config file ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
    #[serde(default)]
    cred_helpers: HashMap<String, String>,
    #[serde(default)]
    creds_store: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Reads `config.json` the way the Docker CLI does.
///
/// Lookup order for a host: `credHelpers[host]`, then an `auths` entry,
/// then `credsStore`, then anonymous. A missing file means anonymous.
/// The file is re-read on every call so rotated credentials are picked up.
#[derive(Debug, Clone)]
pub struct DockerConfigProvider {
    path: Option<PathBuf>,
    helper_prefix: String,
}

impl DockerConfigProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            helper_prefix: HELPER_PROGRAM_PREFIX.to_string(),
        }
    }

    /// Look helpers up as `<prefix><name>` instead of `docker-credential-<name>`.
    pub fn with_helper_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.helper_prefix = prefix.into();
        self
    }

    fn helper(&self, name: &str) -> HelperProvider {
        HelperProvider::with_program(name, format!("{}{name}", self.helper_prefix))
    }

    async fn load(&self) -> ResolveResult<Option<DockerConfigFile>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ResolveError::Authentication {
                    registry: String::new(),
                    reason: format!("reading {}: {e}", path.display()),
                });
            }
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| ResolveError::Authentication {
                registry: String::new(),
                reason: format!("parsing {}: {e}", path.display()),
            })
    }
}

#[async_trait]
impl CredentialProvider for DockerConfigProvider {
    fn name(&self) -> &str {
        "docker-config"
    }

    async fn credential(&self, registry: &str) -> ResolveResult<Credential> {
        let Some(config) = self.load().await.map_err(|e| with_registry(e, registry))? else {
            return Ok(Credential::Anonymous);
        };
        if let Some(helper) = find_for_registry(&config.cred_helpers, registry) {
            return self.helper(helper).credential(registry).await;
        }

        if let Some(entry) = find_for_registry(&config.auths, registry) {
            if let Some(credential) = decode_auth_entry(entry, registry)? {
                return Ok(credential);
            }
        }

        if let Some(store) = &config.creds_store {
            return self.helper(store).credential(registry).await;
        }

        Ok(Credential::Anonymous)
    }
}

/// The config entry for `registry`: an exact key wins, then the key the
/// Docker CLI itself writes for that host, then the lexically first key
/// naming the same host.
fn find_for_registry<'a, V>(entries: &'a HashMap<String, V>, registry: &str) -> Option<&'a V> {
    if let Some(value) = entries.get(registry) {
        return Some(value);
    }
    if let Some(value) = entries.get(&helper_server_url(registry)) {
        return Some(value);
    }
    let wanted = canonical_registry(registry);
    entries
        .iter()
        .filter(|(key, _)| canonical_registry(key) == wanted)
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, value)| value)
}

fn decode_auth_entry(entry: &DockerAuthEntry, registry: &str) -> ResolveResult<Option<Credential>> {
    if let Some(auth) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
        let decoded = general_purpose::STANDARD
            .decode(auth)
            .map_err(|e| ResolveError::Authentication {
                registry: registry.to_string(),
                reason: format!("bad base64 in docker config auth: {e}"),
            })?;
        let decoded = String::from_utf8(decoded).map_err(|_| ResolveError::Authentication {
            registry: registry.to_string(),
            reason: "docker config auth is not utf-8".to_string(),
        })?;
        let (username, password) =
            decoded
                .split_once(':')
                .ok_or_else(|| ResolveError::Authentication {
                    registry: registry.to_string(),
                    reason: "docker config auth is not user:password".to_string(),
                })?;
        return Ok(Some(Credential::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }));
    }
    match (&entry.username, &entry.password) {
        (Some(username), Some(password)) => Ok(Some(Credential::Basic {
            username: username.clone(),
            password: password.clone(),
        })),
        _ => Ok(None),
    }
}

// ── Credential helper ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperOutput {
    username: String,
    secret: String,
}

/// Runs `docker-credential-<helper> get` per the Docker credential helper
/// protocol: server URL on stdin, `{"Username": .., "Secret": ..}` on stdout.
#[derive(Debug, Clone)]
pub struct HelperProvider {
    helper: String,
    program: String,
}

impl HelperProvider {
    pub fn new(helper: &str) -> Self {
        Self {
            helper: helper.to_string(),
            program: format!("{HELPER_PROGRAM_PREFIX}{helper}"),
        }
    }

    /// Use an explicit executable instead of `docker-credential-<helper>`.
    pub fn with_program(helper: &str, program: impl Into<String>) -> Self {
        Self {
            helper: helper.to_string(),
            program: program.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for HelperProvider {
    fn name(&self) -> &str {
        &self.helper
    }

    async fn credential(&self, registry: &str) -> ResolveResult<Credential> {
        let auth_error = |reason: String| ResolveError::Authentication {
            registry: registry.to_string(),
            reason,
        };

        let mut child = tokio::process::Command::new(&self.program)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| auth_error(format!("running {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A helper may exit without reading its input.
            match stdin.write_all(helper_server_url(registry).as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(auth_error(format!("writing to {}: {e}", self.program))),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| auth_error(format!("waiting for {}: {e}", self.program)))?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains("credentials not found") {
                return Ok(Credential::Anonymous);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(auth_error(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let parsed: HelperOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| auth_error(format!("bad output from {}: {e}", self.program)))?;
        Ok(Credential::Basic {
            username: parsed.username,
            password: parsed.secret,
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn with_registry(err: ResolveError, registry: &str) -> ResolveError {
    match err {
        ResolveError::Authentication { reason, .. } => ResolveError::Authentication {
            registry: registry.to_string(),
            reason,
        },
        other => other,
    }
}

fn strip_port(registry: &str) -> &str {
    if registry.starts_with('[') {
        return registry
            .find(']')
            .map_or(registry, |end| &registry[..=end]);
    }
    registry.split_once(':').map_or(registry, |(host, _)| host)
}

/// Normalize a config key or registry host for comparison: drop the scheme
/// and any path, and fold the Docker Hub aliases together.
fn canonical_registry(key: &str) -> String {
    let without_scheme = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    let host = without_scheme
        .split_once('/')
        .map_or(without_scheme, |(host, _)| host);
    match host {
        "docker.io" | "index.docker.io" | "registry-1.docker.io" => DOCKER_HUB_REGISTRY.to_string(),
        other => other.to_string(),
    }
}

fn helper_server_url(registry: &str) -> String {
    if canonical_registry(registry) == DOCKER_HUB_REGISTRY {
        DOCKER_HUB_CONFIG_KEY.to_string()
    } else {
        registry.to_string()
    }
}

fn default_docker_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".docker").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn ecr_predicate_matches_only_ecr_hosts() {
        let predicate = HostPredicate::Pattern(ECR_HOST_RE.clone());
        assert!(predicate.matches("123456789012.dkr.ecr.us-east-1.amazonaws.com"));
        assert!(predicate.matches("123456789012.dkr.ecr-fips.us-gov-west-1.amazonaws.com"));
        assert!(predicate.matches("123456789012.dkr.ecr.cn-north-1.amazonaws.com.cn"));
        assert!(!predicate.matches("public.ecr.aws"));
        assert!(!predicate.matches("index.docker.io"));
    }

    #[test]
    fn keychain_rules_are_first_match() {
        let keychain = Keychain::anonymous()
            .with_rule(
                HostPredicate::Suffix(".corp.example".to_string()),
                Arc::new(HelperProvider::new("corp")),
            )
            .with_rule(
                HostPredicate::Suffix(".example".to_string()),
                Arc::new(HelperProvider::new("generic")),
            );

        assert_eq!(keychain.provider_for("registry.corp.example:5000").name(), "corp");
        assert_eq!(keychain.provider_for("other.example").name(), "generic");
        assert_eq!(keychain.provider_for("ghcr.io").name(), "anonymous");
    }

    #[test]
    fn ambient_keychain_routes_ecr_to_helper() {
        let keychain = Keychain::ambient(None);
        assert_eq!(
            keychain
                .provider_for("123456789012.dkr.ecr.eu-west-1.amazonaws.com")
                .name(),
            "ecr-login"
        );
        assert_eq!(keychain.provider_for("ghcr.io").name(), "docker-config");
    }

    #[tokio::test]
    async fn docker_config_auth_field_is_decoded() {
        // "alice:s3cret"
        let file = write_config(r#"{"auths":{"ghcr.io":{"auth":"YWxpY2U6czNjcmV0"}}}"#);
        let provider = DockerConfigProvider::new(Some(file.path().to_path_buf()));

        let credential = provider.credential("ghcr.io").await.unwrap();
        assert_eq!(
            credential,
            Credential::Basic {
                username: "alice".to_string(),
                password: "s3cret".to_string()
            }
        );
    }

    #[tokio::test]
    async fn docker_hub_key_matches_normalized_registry() {
        let file = write_config(
            r#"{"auths":{"https://index.docker.io/v1/":{"username":"bob","password":"pw"}}}"#,
        );
        let provider = DockerConfigProvider::new(Some(file.path().to_path_buf()));

        let credential = provider.credential("index.docker.io").await.unwrap();
        assert!(matches!(credential, Credential::Basic { ref username, .. } if username == "bob"));
    }

    #[tokio::test]
    async fn unknown_registry_is_anonymous() {
        let file = write_config(r#"{"auths":{"ghcr.io":{"auth":"YWxpY2U6czNjcmV0"}}}"#);
        let provider = DockerConfigProvider::new(Some(file.path().to_path_buf()));
        assert_eq!(provider.credential("quay.io").await.unwrap(), Credential::Anonymous);
    }

    #[tokio::test]
    async fn missing_config_file_is_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DockerConfigProvider::new(Some(dir.path().join("absent.json")));
        assert_eq!(provider.credential("ghcr.io").await.unwrap(), Credential::Anonymous);
    }

    #[tokio::test]
    async fn malformed_config_is_authentication_error() {
        let file = write_config("{not json");
        let provider = DockerConfigProvider::new(Some(file.path().to_path_buf()));
        let err = provider.credential("ghcr.io").await.unwrap_err();
        assert!(matches!(err, ResolveError::Authentication { ref registry, .. } if registry == "ghcr.io"));
    }

    #[tokio::test]
    async fn missing_helper_binary_is_authentication_error() {
        let provider = HelperProvider::with_program("nope", "/nonexistent/docker-credential-nope");
        let err = provider.credential("ghcr.io").await.unwrap_err();
        assert!(matches!(err, ResolveError::Authentication { .. }));
    }

    #[tokio::test]
    async fn exact_config_key_wins_over_alias() {
        let file = write_config(
            r#"{"auths":{
                "docker.io":{"username":"carol","password":"pw1"},
                "https://index.docker.io/v1/":{"username":"bob","password":"pw2"}
            }}"#,
        );
        let provider = DockerConfigProvider::new(Some(file.path().to_path_buf()));

        let username = |credential: Credential| match credential {
            Credential::Basic { username, .. } => username,
            Credential::Anonymous => String::new(),
        };
        assert_eq!(username(provider.credential("docker.io").await.unwrap()), "carol");
        assert_eq!(username(provider.credential("index.docker.io").await.unwrap()), "bob");
    }

    // ── Credential helpers ───────────────────────────────────────────

    /// Echoes the server URL read from stdin back as the username.
    #[cfg(unix)]
    const ECHO_HELPER: &str = r#"#!/bin/sh
[ "$1" = "get" ] || exit 2
read -r url
printf '{"ServerURL":"%s","Username":"%s","Secret":"from-helper"}' "$url" "$url"
"#;

    #[cfg(unix)]
    const NOT_FOUND_HELPER: &str = "#!/bin/sh\nread -r url\necho 'credentials not found in native keychain'\nexit 1\n";

    #[cfg(unix)]
    const BROKEN_HELPER: &str = "#!/bin/sh\nread -r url\necho 'keychain locked' >&2\nexit 3\n";

    /// A directory of `docker-credential-<name>` scripts.
    #[cfg(unix)]
    fn helper_dir(helpers: &[(&str, &str)]) -> tempfile::TempDir {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        for (name, script) in helpers {
            let path = dir.path().join(format!("docker-credential-{name}"));
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    }

    #[cfg(unix)]
    fn provider_with_helpers(config: &tempfile::NamedTempFile, helpers: &tempfile::TempDir) -> DockerConfigProvider {
        let prefix = format!("{}/docker-credential-", helpers.path().display());
        DockerConfigProvider::new(Some(config.path().to_path_buf())).with_helper_prefix(prefix)
    }

    #[cfg(unix)]
    fn basic(username: &str, password: &str) -> Credential {
        Credential::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn helper_speaks_credential_protocol() {
        let helpers = helper_dir(&[("echo", ECHO_HELPER)]);
        let program = helpers.path().join("docker-credential-echo");
        let provider = HelperProvider::with_program("echo", program.display().to_string());

        assert_eq!(
            provider.credential("ghcr.io").await.unwrap(),
            basic("ghcr.io", "from-helper")
        );
        assert_eq!(
            provider.credential("docker.io").await.unwrap(),
            basic("https://index.docker.io/v1/", "from-helper")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn helper_not_found_is_anonymous() {
        let helpers = helper_dir(&[("empty", NOT_FOUND_HELPER)]);
        let program = helpers.path().join("docker-credential-empty");
        let provider = HelperProvider::with_program("empty", program.display().to_string());

        assert_eq!(provider.credential("ghcr.io").await.unwrap(), Credential::Anonymous);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_helper_is_authentication_error() {
        let helpers = helper_dir(&[("locked", BROKEN_HELPER)]);
        let program = helpers.path().join("docker-credential-locked");
        let provider = HelperProvider::with_program("locked", program.display().to_string());

        let err = provider.credential("ghcr.io").await.unwrap_err();
        assert!(
            matches!(err, ResolveError::Authentication { ref reason, .. } if reason.contains("keychain locked")),
            "{err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cred_helpers_take_precedence_over_auths_and_store() {
        let helpers = helper_dir(&[("echo", ECHO_HELPER), ("empty", NOT_FOUND_HELPER)]);
        let config = write_config(
            r#"{
                "credHelpers":{"ghcr.io":"echo"},
                "auths":{"ghcr.io":{"auth":"YWxpY2U6czNjcmV0"}},
                "credsStore":"empty"
            }"#,
        );
        let provider = provider_with_helpers(&config, &helpers);

        assert_eq!(
            provider.credential("ghcr.io").await.unwrap(),
            basic("ghcr.io", "from-helper")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn auths_take_precedence_over_store() {
        let helpers = helper_dir(&[("echo", ECHO_HELPER)]);
        let config = write_config(
            r#"{"auths":{"ghcr.io":{"auth":"YWxpY2U6czNjcmV0"}},"credsStore":"echo"}"#,
        );
        let provider = provider_with_helpers(&config, &helpers);

        assert_eq!(provider.credential("ghcr.io").await.unwrap(), basic("alice", "s3cret"));
        assert_eq!(
            provider.credential("quay.io").await.unwrap(),
            basic("quay.io", "from-helper")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_without_credentials_falls_back_to_anonymous() {
        let helpers = helper_dir(&[("empty", NOT_FOUND_HELPER)]);
        let config = write_config(r#"{"credsStore":"empty"}"#);
        let provider = provider_with_helpers(&config, &helpers);

        assert_eq!(provider.credential("quay.io").await.unwrap(), Credential::Anonymous);
    }

    #[test]
    fn basic_header_encoding() {
        let credential = Credential::Basic {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        };
        assert_eq!(credential.basic_header().as_deref(), Some("Basic YWxpY2U6czNjcmV0"));
        assert_eq!(Credential::Anonymous.basic_header(), None);
    }

    #[test]
    fn debug_redacts_password() {
        let credential = Credential::Basic {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        };
        assert!(!format!("{credential:?}").contains("s3cret"));
    }
}
