use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};

use crate::Result;
use crate::error::Error;
use crate::util::{append_query_pairs, method_allows_body, redact_uri_for_logs, resolve_uri};

/// Immutable description of one call.
///
/// Query parameters are already folded into [`RequestSpec::uri`]; every retry
/// replays the same spec unchanged.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    method: Method,
    uri: Uri,
    redacted_uri: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl RequestSpec {
    /// Builds a spec for an absolute `http`/`https` url.
    pub fn new(method: Method, url: &str) -> Result<Self> {
        Self::resolve(method, None, url, Vec::new(), HeaderMap::new(), None)
    }

    pub(crate) fn resolve(
        method: Method,
        base_url: Option<&str>,
        url: &str,
        query: Vec<(String, String)>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Self> {
        if body.is_some() && !method_allows_body(&method) {
            return Err(Error::BodyNotAllowed { method });
        }
        let (uri_text, _) = resolve_uri(base_url, url)?;
        let uri_text = append_query_pairs(&uri_text, &query);
        let uri: Uri = uri_text.parse().map_err(|_| Error::InvalidUri {
            uri: uri_text.clone(),
        })?;
        Ok(Self {
            method,
            redacted_uri: redact_uri_for_logs(&uri_text),
            uri,
            headers,
            query,
            body,
        })
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches a payload; only POST, PUT and PATCH carry one.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Result<Self> {
        if !method_allows_body(&self.method) {
            return Err(Error::BodyNotAllowed {
                method: self.method,
            });
        }
        self.body = Some(body.into());
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The uri without userinfo, query or fragment, as used in logs and errors.
    pub fn redacted_uri(&self) -> &str {
        &self.redacted_uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Converts the spec into an [`http::Request`] for custom [`Transport`](crate::Transport)
    /// implementations; an absent body becomes an empty one.
    pub fn to_http_request(&self) -> Result<http::Request<Bytes>> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(
                self.headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
        builder
            .body(self.body.clone().unwrap_or_default())
            .map_err(|source| Error::RequestBuild { source })
    }
}
