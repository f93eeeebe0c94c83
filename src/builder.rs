use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::client::RestClient;
use crate::codec::encode_value;
use crate::error::{ClassifiedError, Error};
use crate::mapping::{ErrorBodyTypes, ExceptionMappers, FailureKind};
use crate::policy::ExecutionPolicy;
use crate::request::RequestSpec;
use crate::util::{merge_headers, method_allows_body, parse_header_name, parse_header_value};

/// Per-call configuration; [`RequestBuilder::execute`] runs the call.
///
/// Settings start from the client's [`ExecutionDefaults`](crate::ExecutionDefaults)
/// and every setter overrides them for this call only.
pub struct RequestBuilder<'a, T> {
    client: &'a RestClient,
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    policy: ExecutionPolicy<T>,
    mappers: ExceptionMappers,
    error_bodies: ErrorBodyTypes,
}

impl<'a, T: 'static> RequestBuilder<'a, T> {
    pub(crate) fn new(client: &'a RestClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            policy: ExecutionPolicy::from_defaults(client.defaults()),
            mappers: ExceptionMappers::new(),
            error_bodies: ErrorBodyTypes::new(),
        }
    }

    /// Sets a header; a later value for the same name replaces the earlier one.
    pub fn add_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_add_header(self, name: &str, value: &str) -> Result<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.add_header(name, value))
    }

    /// Appends a query parameter; repeated names are sent as repeated pairs.
    pub fn add_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn add_params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.query.extend(
            params
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    pub fn query<Q>(mut self, params: &Q) -> Result<Self>
    where
        Q: Serialize + ?Sized,
    {
        let encoded =
            serde_urlencoded::to_string(params).map_err(|source| Error::SerializeQuery { source })?;
        self.query.extend(
            url::form_urlencoded::parse(encoded.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned())),
        );
        Ok(self)
    }

    /// Encodes `payload` with the client codec. Only POST, PUT and PATCH carry a body.
    pub fn request_body<B>(mut self, payload: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        if !method_allows_body(&self.method) {
            return Err(Error::BodyNotAllowed {
                method: self.method,
            });
        }
        let client = self.client;
        let codec = client.codec();
        let body = encode_value(codec, payload).map_err(|source| Error::Encode { source })?;
        self.body = Some(body);
        Ok(self.add_header(CONTENT_TYPE, codec.content_type()))
    }

    /// Value returned instead of an error when a suppressed failure settles the call.
    pub fn default_response<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        self.policy = self.policy.fallback(Arc::new(supplier));
        self
    }

    /// Decodes the body of a `status` error response into `E`; retrieve it with
    /// [`ErrorBody::decoded`](crate::ErrorBody::decoded).
    pub fn error_response_type<E>(mut self, status: u16) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        self.error_bodies.register::<E>(status);
        self
    }

    pub fn process_client_exceptions(mut self, process: bool) -> Self {
        self.policy = self.policy.process_client_errors(process);
        self
    }

    pub fn process_server_exceptions(mut self, process: bool) -> Self {
        self.policy = self.policy.process_server_errors(process);
        self
    }

    /// Connection failures are still raised when this is off; only their log level drops.
    pub fn process_connection_exceptions(mut self, process: bool) -> Self {
        self.policy = self.policy.process_connection_errors(process);
        self
    }

    pub fn process_timeout_exceptions(mut self, process: bool) -> Self {
        self.policy = self.policy.process_timeout_errors(process);
        self
    }

    pub fn add_exception_mapping<F>(mut self, status: u16, mapper: F) -> Self
    where
        F: Fn(ClassifiedError) -> Error + Send + Sync + 'static,
    {
        self.mappers.register_status(status, Arc::new(mapper));
        self
    }

    /// Mapper for connection failures.
    pub fn resource_exception_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(ClassifiedError) -> Error + Send + Sync + 'static,
    {
        self.mappers
            .register_failure(FailureKind::Connection, Arc::new(mapper));
        self
    }

    pub fn timeout_exception_mapping<F>(mut self, mapper: F) -> Self
    where
        F: Fn(ClassifiedError) -> Error + Send + Sync + 'static,
    {
        self.mappers
            .register_failure(FailureKind::Timeout, Arc::new(mapper));
        self
    }

    /// Deadline for each attempt; retries get a fresh window.
    pub fn request_processing_timeout(mut self, timeout: Duration) -> Self {
        self.policy = self.policy.timeout(timeout);
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.policy = self.policy.retry_count(retry_count);
        self
    }

    pub fn retry_server_error(mut self, retry: bool) -> Self {
        self.policy = self.policy.retry_server_error(retry);
        self
    }

    pub fn retry_connection_error(mut self, retry: bool) -> Self {
        self.policy = self.policy.retry_connection_error(retry);
        self
    }

    pub fn retry_timeout(mut self, retry: bool) -> Self {
        self.policy = self.policy.retry_timeout(retry);
        self
    }

    pub fn policy(&self) -> &ExecutionPolicy<T> {
        &self.policy
    }

    /// Freezes the configuration and runs it.
    ///
    /// Returns `Ok(None)` for an empty success body or when a suppressed failure
    /// settles the call without a configured default response.
    pub async fn execute(self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let headers = merge_headers(self.client.default_headers(), &self.headers);
        let spec = RequestSpec::resolve(
            self.method,
            self.client.base_url(),
            &self.url,
            self.query,
            headers,
            self.body,
        )?;
        self.client
            .executor()
            .execute(&spec, &self.policy, &self.mappers, &self.error_bodies)
            .await
    }
}
