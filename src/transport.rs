use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "tls-rustls-ring")]
use hyper_rustls::HttpsConnectorBuilder;

use crate::Result;
use crate::error::{BoxError, Error, TransportErrorKind};
use crate::request::RequestSpec;
use crate::response::RawResponse;
use crate::util::{
    classify_transport_error, is_redirect_status, redact_uri_for_logs, redirect_location,
    redirect_method, resolve_redirect_uri, same_origin, sanitize_headers_for_redirect,
};

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<RawResponse, TransportError>> + Send + 'a>>;

/// Sends one attempt of a request and buffers the whole response.
///
/// Implementations resolve redirects and other 1xx/3xx statuses themselves; the
/// executor enforces the per-attempt deadline by dropping the returned future.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> TransportFuture<'a>;
}

/// A failure before any status line was received.
#[derive(Debug, Error)]
#[error("{kind} transport error: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedirectPolicy {
    enabled: bool,
    max_redirects: usize,
}

impl RedirectPolicy {
    pub const fn none() -> Self {
        Self {
            enabled: false,
            max_redirects: 0,
        }
    }

    pub const fn limited(max_redirects: usize) -> Self {
        Self {
            enabled: true,
            max_redirects,
        }
    }

    pub const fn follow() -> Self {
        Self::limited(10)
    }

    pub const fn enabled(self) -> bool {
        self.enabled
    }

    pub const fn max_redirects(self) -> usize {
        if self.enabled { self.max_redirects } else { 0 }
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::follow()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsBackend {
    RustlsRing,
    NativeTls,
}

impl TlsBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RustlsRing => "tls-rustls-ring",
            Self::NativeTls => "tls-native",
        }
    }
}

const fn default_tls_backend() -> Option<TlsBackend> {
    #[cfg(feature = "tls-rustls-ring")]
    {
        return Some(TlsBackend::RustlsRing);
    }
    #[cfg(all(not(feature = "tls-rustls-ring"), feature = "tls-native"))]
    {
        return Some(TlsBackend::NativeTls);
    }
    #[allow(unreachable_code)]
    None
}

/// Connection settings for [`HyperTransport`].
#[derive(Clone, Debug)]
pub struct TransportOptions {
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
    redirect_policy: RedirectPolicy,
    tls_backend: Option<TlsBackend>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            redirect_policy: RedirectPolicy::default(),
            tls_backend: default_tls_backend(),
        }
    }
}

impl TransportOptions {
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout.max(Duration::from_millis(1)));
        self
    }

    pub fn pool_idle_timeout(mut self, pool_idle_timeout: Duration) -> Self {
        self.pool_idle_timeout = pool_idle_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn pool_max_idle_per_host(mut self, pool_max_idle_per_host: usize) -> Self {
        self.pool_max_idle_per_host = pool_max_idle_per_host.max(1);
        self
    }

    pub fn redirect_policy(mut self, redirect_policy: RedirectPolicy) -> Self {
        self.redirect_policy = redirect_policy;
        self
    }

    /// `None` restricts the transport to plain `http`.
    pub fn tls_backend(mut self, tls_backend: Option<TlsBackend>) -> Self {
        self.tls_backend = tls_backend;
        self
    }
}

type ReqBody = Full<Bytes>;

#[cfg(feature = "tls-rustls-ring")]
type RustlsHyperClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, ReqBody>;
#[cfg(feature = "tls-native")]
type NativeHyperClient = Client<hyper_tls::HttpsConnector<HttpConnector>, ReqBody>;

#[derive(Clone)]
enum HyperClient {
    Plain(Client<HttpConnector, ReqBody>),
    #[cfg(feature = "tls-rustls-ring")]
    Rustls(RustlsHyperClient),
    #[cfg(feature = "tls-native")]
    Native(NativeHyperClient),
}

impl HyperClient {
    async fn request(
        &self,
        request: Request<ReqBody>,
    ) -> std::result::Result<Response<Incoming>, hyper_util::client::legacy::Error> {
        match self {
            Self::Plain(client) => client.request(request).await,
            #[cfg(feature = "tls-rustls-ring")]
            Self::Rustls(client) => client.request(request).await,
            #[cfg(feature = "tls-native")]
            Self::Native(client) => client.request(request).await,
        }
    }
}

fn http_connector(options: &TransportOptions) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(options.connect_timeout);
    connector.enforce_http(options.tls_backend.is_none());
    connector
}

fn pooled_client_builder(options: &TransportOptions) -> hyper_util::client::legacy::Builder {
    let mut builder = Client::builder(TokioExecutor::new());
    builder
        .pool_idle_timeout(options.pool_idle_timeout)
        .pool_max_idle_per_host(options.pool_max_idle_per_host);
    builder
}

#[cfg(feature = "tls-rustls-ring")]
fn build_rustls_ring_client(options: &TransportOptions) -> Result<HyperClient> {
    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
        .map_err(|source| Error::TlsBackendInit {
            backend: TlsBackend::RustlsRing.as_str(),
            message: source.to_string(),
        })?
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http_connector(options));
    Ok(HyperClient::Rustls(
        pooled_client_builder(options).build(https),
    ))
}

#[cfg(not(feature = "tls-rustls-ring"))]
fn build_rustls_ring_client(_options: &TransportOptions) -> Result<HyperClient> {
    Err(Error::TlsBackendUnavailable {
        backend: TlsBackend::RustlsRing.as_str(),
    })
}

#[cfg(feature = "tls-native")]
fn build_native_tls_client(options: &TransportOptions) -> Result<HyperClient> {
    let https = hyper_tls::HttpsConnector::new_with_connector(http_connector(options));
    Ok(HyperClient::Native(
        pooled_client_builder(options).build(https),
    ))
}

#[cfg(not(feature = "tls-native"))]
fn build_native_tls_client(_options: &TransportOptions) -> Result<HyperClient> {
    Err(Error::TlsBackendUnavailable {
        backend: TlsBackend::NativeTls.as_str(),
    })
}

fn build_hyper_client(options: &TransportOptions) -> Result<HyperClient> {
    match options.tls_backend {
        None => Ok(HyperClient::Plain(
            pooled_client_builder(options).build(http_connector(options)),
        )),
        Some(TlsBackend::RustlsRing) => build_rustls_ring_client(options),
        Some(TlsBackend::NativeTls) => build_native_tls_client(options),
    }
}

/// Default [`Transport`]: a pooled hyper client that follows redirects
/// according to its [`RedirectPolicy`].
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    redirect_policy: RedirectPolicy,
    tls_backend: Option<TlsBackend>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HyperTransport")
            .field("redirect_policy", &self.redirect_policy)
            .field("tls_backend", &self.tls_backend)
            .finish()
    }
}

impl HyperTransport {
    pub fn new(options: TransportOptions) -> Result<Self> {
        Ok(Self {
            client: build_hyper_client(&options)?,
            redirect_policy: options.redirect_policy,
            tls_backend: options.tls_backend,
        })
    }

    pub fn tls_backend(&self) -> Option<TlsBackend> {
        self.tls_backend
    }

    async fn send_following_redirects(
        &self,
        request: &RequestSpec,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut method = request.method().clone();
        let mut uri = request.uri().clone();
        let mut headers = request.headers().clone();
        let mut body = request.body().cloned();
        let mut redirect_count = 0_usize;

        loop {
            let http_request = build_http_request(&method, &uri, &headers, body.clone())?;
            let response = self.client.request(http_request).await.map_err(|source| {
                TransportError::new(classify_transport_error(&source), source)
            })?;

            let status = response.status();
            let next_uri = if self.redirect_policy.enabled()
                && is_redirect_status(status)
                && redirect_count < self.redirect_policy.max_redirects()
            {
                redirect_location(response.headers())
                    .and_then(|location| resolve_redirect_uri(&uri, &location))
            } else {
                None
            };
            let Some(next_uri) = next_uri else {
                return read_response(response).await;
            };

            let next_method = redirect_method(&method, status);
            let method_changed_to_get = next_method == Method::GET && method != Method::GET;
            sanitize_headers_for_redirect(
                &mut headers,
                method_changed_to_get,
                same_origin(&uri, &next_uri),
            );
            if method_changed_to_get {
                body = None;
            }
            debug!(
                status = status.as_u16(),
                location = %redact_uri_for_logs(&next_uri.to_string()),
                "following redirect"
            );
            method = next_method;
            uri = next_uri;
            redirect_count += 1;
        }
    }
}

impl Transport for HyperTransport {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> TransportFuture<'a> {
        Box::pin(self.send_following_redirects(request))
    }
}

fn build_http_request(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> std::result::Result<Request<ReqBody>, TransportError> {
    let mut request_builder = Request::builder().method(method.clone()).uri(uri.clone());
    for (name, value) in headers {
        request_builder = request_builder.header(name, value);
    }
    request_builder
        .body(Full::new(body.unwrap_or_default()))
        .map_err(|source| TransportError::new(TransportErrorKind::Other, source))
}

async fn read_response(
    response: Response<Incoming>,
) -> std::result::Result<RawResponse, TransportError> {
    let (parts, body) = response.into_parts();
    let reason = parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned());
    let body = body
        .collect()
        .await
        .map_err(|source| TransportError::new(TransportErrorKind::Read, source))?
        .to_bytes();

    let response = RawResponse::new(parts.status, parts.headers, body);
    Ok(match reason {
        Some(reason) => response.with_reason(reason),
        None => response,
    })
}

#[cfg(test)]
mod tests {
    use super::{RedirectPolicy, TransportError, TransportOptions};
    use crate::error::TransportErrorKind;

    #[test]
    fn redirects_are_followed_by_default() {
        let policy = RedirectPolicy::default();
        assert!(policy.enabled());
        assert_eq!(policy.max_redirects(), 10);
        assert_eq!(RedirectPolicy::none().max_redirects(), 0);
    }

    #[test]
    fn transport_error_keeps_kind_and_source() {
        let error = TransportError::new(TransportErrorKind::Read, "connection reset");
        assert_eq!(error.kind(), TransportErrorKind::Read);
        assert_eq!(error.to_string(), "read transport error: connection reset");
        assert_eq!(error.into_source().to_string(), "connection reset");
    }

    #[test]
    fn plain_transport_builds_without_tls() {
        let transport = super::HyperTransport::new(TransportOptions::default().tls_backend(None))
            .expect("plain transport should build");
        assert!(transport.tls_backend().is_none());
    }
}
