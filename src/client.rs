use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

use crate::Result;
use crate::builder::RequestBuilder;
use crate::codec::{Codec, JsonCodec};
use crate::config::{ClientProfile, ExecutionDefaults};
use crate::execute::Executor;
use crate::observe::Observer;
use crate::transport::{HyperTransport, RedirectPolicy, TlsBackend, Transport, TransportOptions};
use crate::util::{parse_header_name, parse_header_value, resolve_uri};

const DEFAULT_CLIENT_NAME: &str = "restexec";

pub struct RestClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    defaults: ExecutionDefaults,
    client_name: String,
    transport_options: TransportOptions,
    transport: Option<Arc<dyn Transport>>,
    codec: Arc<dyn Codec>,
    observer: Option<Arc<dyn Observer>>,
}

impl RestClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            defaults: ExecutionDefaults::default(),
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            transport_options: TransportOptions::default(),
            transport: None,
            codec: Arc::new(JsonCodec),
            observer: None,
        }
    }

    /// Prefix for relative request urls. Absolute urls bypass it.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Header sent with every request unless the call sets the same name.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn try_default_header(self, name: &str, value: &str) -> Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.default_header(name, value))
    }

    pub fn profile(mut self, profile: ClientProfile) -> Self {
        self.defaults = profile.defaults();
        self
    }

    pub fn defaults(mut self, defaults: ExecutionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.transport_options = self.transport_options.connect_timeout(connect_timeout);
        self
    }

    pub fn pool_idle_timeout(mut self, pool_idle_timeout: Duration) -> Self {
        self.transport_options = self.transport_options.pool_idle_timeout(pool_idle_timeout);
        self
    }

    pub fn pool_max_idle_per_host(mut self, pool_max_idle_per_host: usize) -> Self {
        self.transport_options = self
            .transport_options
            .pool_max_idle_per_host(pool_max_idle_per_host);
        self
    }

    pub fn redirect_policy(mut self, redirect_policy: RedirectPolicy) -> Self {
        self.transport_options = self.transport_options.redirect_policy(redirect_policy);
        self
    }

    pub fn tls_backend(mut self, tls_backend: TlsBackend) -> Self {
        self.transport_options = self.transport_options.tls_backend(Some(tls_backend));
        self
    }

    /// Replaces the default hyper transport; connection settings above are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn try_build(self) -> Result<RestClient> {
        if let Some(base_url) = &self.base_url {
            resolve_uri(None, base_url)?;
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new(self.transport_options)?),
        };

        Ok(RestClient {
            base_url: self.base_url,
            default_headers: self.default_headers,
            defaults: self.defaults,
            client_name: self.client_name,
            transport,
            codec: self.codec,
            observer: self.observer,
        })
    }

    pub fn build(self) -> RestClient {
        self.try_build()
            .unwrap_or_else(|error| panic!("failed to build restexec client: {error}"))
    }
}

/// Shared entry point: owns the transport, codec and defaults, and hands out
/// one [`RequestBuilder`] per call. Cloning is cheap.
#[derive(Clone)]
pub struct RestClient {
    base_url: Option<String>,
    default_headers: HeaderMap,
    defaults: ExecutionDefaults,
    client_name: String,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    observer: Option<Arc<dyn Observer>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestClient")
            .field("client_name", &self.client_name)
            .field("base_url", &self.base_url)
            .field("defaults", &self.defaults)
            .field("default_headers", &self.default_headers.len())
            .finish()
    }
}

impl RestClient {
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    pub fn request<T: 'static>(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_, T> {
        RequestBuilder::new(self, method, url.into())
    }

    pub fn get<T: 'static>(&self, url: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::GET, url)
    }

    pub fn post<T: 'static>(&self, url: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::POST, url)
    }

    pub fn put<T: 'static>(&self, url: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::PUT, url)
    }

    pub fn patch<T: 'static>(&self, url: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::PATCH, url)
    }

    pub fn delete<T: 'static>(&self, url: impl Into<String>) -> RequestBuilder<'_, T> {
        self.request(Method::DELETE, url)
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn defaults(&self) -> ExecutionDefaults {
        self.defaults
    }

    pub(crate) fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub(crate) fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub(crate) fn executor(&self) -> Executor<'_> {
        Executor::new(self.transport.as_ref(), self.codec.as_ref())
            .observer(self.observer.as_deref())
            .client_name(&self.client_name)
    }
}
