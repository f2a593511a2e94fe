//! HTTP/1.1 transport for registry calls.
//!
//! One connection per request: TCP, optionally wrapped in TLS via
//! `tokio-rustls`, then a hyper HTTP/1 handshake. Registry traffic on the
//! filter path is rare once the cache is warm, so there is no pooling.
//!
//! ```text
//! get(uri)
//!   → TcpStream::connect(host:port)
//!     → [TLS handshake (https)]
//!       → hyper http1 handshake → GET path → collect body (bounded)
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty, Limited};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{ResolveError, ResolveResult};

/// Largest response body accepted (manifests and config blobs are small).
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

const USER_AGENT_VALUE: &str = concat!("archgate/", env!("CARGO_PKG_VERSION"));

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// TLS client configuration for registry connections.
#[derive(Clone)]
pub struct TlsConfig {
    pub client_config: Arc<rustls::ClientConfig>,
    /// Whether server certificates are checked (`registry.tls_verify`).
    pub verify: bool,
}

impl TlsConfig {
    /// The configuration selected by `registry.tls_verify`.
    pub fn for_registry(tls_verify: bool) -> ResolveResult<Self> {
        if tls_verify {
            Self::with_webpki_roots()
        } else {
            warn!("registry TLS certificate verification is disabled");
            Self::no_verify()
        }
    }

    /// Verify server certificates against the Mozilla root store.
    pub fn with_webpki_roots() -> ResolveResult<Self> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .map_err(|e| ResolveError::Transport(format!("tls protocol version error: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self {
            client_config: Arc::new(config),
            verify: true,
        })
    }

    /// Accept any server certificate. Selected by `tls_verify = false`
    /// under `[registry]`; applies to every registry the resolver contacts.
    pub fn no_verify() -> ResolveResult<Self> {
        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .map_err(|e| ResolveError::Transport(format!("tls protocol version error: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(danger::NoVerifier))
        .with_no_client_auth();

        Ok(Self {
            client_config: Arc::new(config),
            verify: false,
        })
    }
}

mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};

    #[derive(Debug)]
    pub struct NoVerifier;

    impl ServerCertVerifier for NoVerifier {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}

/// Issues single GET requests with a per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    tls: TlsConfig,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(tls: TlsConfig, timeout: Duration) -> Self {
        Self { tls, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `uri` with extra headers. Does not follow redirects.
    pub async fn get(&self, uri: &Uri, headers: &HeaderMap) -> ResolveResult<HttpResponse> {
        match tokio::time::timeout(self.timeout, self.send(uri, headers)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%uri, timeout = ?self.timeout, "registry request timed out");
                Err(ResolveError::Timeout(self.timeout))
            }
        }
    }

    async fn send(&self, uri: &Uri, headers: &HeaderMap) -> ResolveResult<HttpResponse> {
        let https = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            other => {
                return Err(ResolveError::Transport(format!(
                    "unsupported scheme {other:?} in {uri}"
                )));
            }
        };
        let authority = uri
            .authority()
            .ok_or_else(|| ResolveError::Transport(format!("missing host in {uri}")))?
            .clone();
        let host = authority.host().trim_start_matches('[').trim_end_matches(']');
        let port = authority.port_u16().unwrap_or(if https { 443 } else { 80 });

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| ResolveError::Transport(format!("connect to {authority}: {e}")))?;
        let _ = stream.set_nodelay(true);

        let path = uri.path_and_query().map_or("/", |p| p.as_str());
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(HOST, authority.as_str())
            .header(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(Empty::<Bytes>::new())
            .map_err(|e| ResolveError::Transport(format!("building request for {uri}: {e}")))?;

        debug!(%uri, tls = https, "registry request");

        if https {
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| ResolveError::Transport(format!("invalid tls server name {host:?}: {e}")))?;
            let connector = tokio_rustls::TlsConnector::from(self.tls.client_config.clone());
            let tls_stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| ResolveError::Transport(format!("tls handshake with {authority}: {e}")))?;
            send_request(tls_stream, request).await
        } else {
            send_request(stream, request).await
        }
    }
}

async fn send_request<S>(io: S, request: Request<Empty<Bytes>>) -> ResolveResult<HttpResponse>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = hyper_util::rt::TokioIo::new(io);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ResolveError::Transport(format!("http handshake: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "registry connection closed with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ResolveError::Transport(format!("http request: {e}")))?;

    let (parts, body) = response.into_parts();
    let body = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| ResolveError::Transport(format!("reading response body: {e}")))?
        .to_bytes();

    Ok(HttpResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn registry_tls_follows_verify_flag() {
        assert!(TlsConfig::for_registry(true).unwrap().verify);
        assert!(!TlsConfig::for_registry(false).unwrap().verify);
    }

    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn transport(timeout: Duration) -> HttpTransport {
        HttpTransport::new(TlsConfig::with_webpki_roots().unwrap(), timeout)
    }

    #[tokio::test]
    async fn plain_http_get_returns_status_headers_and_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello",
        )
        .await;
        let uri: Uri = format!("{base}/v2/").parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let response = transport(Duration::from_secs(5)).get(&uri, &headers).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header(http::header::CONTENT_TYPE), Some("text/plain"));
        assert_eq!(&response.body[..], b"hello");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v2/ HTTP/1.1\r\n"));
        assert!(request.to_ascii_lowercase().contains("accept: application/json"));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri: Uri = format!("http://{addr}/v2/").parse().unwrap();
        let err = transport(Duration::from_secs(5))
            .get(&uri, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Transport(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let uri: Uri = format!("http://{addr}/v2/").parse().unwrap();
        let err = transport(Duration::from_millis(100))
            .get(&uri, &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Timeout(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let uri: Uri = "ftp://example.com/x".parse().unwrap();
        let err = transport(Duration::from_secs(1))
            .get(&uri, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Transport(_)));
    }

    #[test]
    fn no_verify_config_builds() {
        assert!(TlsConfig::no_verify().is_ok());
    }
}
