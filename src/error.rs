use std::any::Any;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// Body attached to a status error.
///
/// `Decoded` holds the value produced by the error-body type registered for the
/// status code; use [`ErrorBody::decoded`] to get it back as its concrete type.
pub enum ErrorBody {
    Empty,
    Raw(String),
    Decoded(Box<dyn Any + Send + Sync>),
}

impl ErrorBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            _ => None,
        }
    }

    pub fn decoded<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Decoded(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ErrorBody {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => formatter.write_str("Empty"),
            Self::Raw(text) => formatter.debug_tuple("Raw").field(text).finish(),
            Self::Decoded(_) => formatter.write_str("Decoded(..)"),
        }
    }
}

/// A 4xx or 5xx response after classification.
#[derive(Debug, Error)]
#[error("{} {reason} for {method} {uri}", .status.as_u16())]
pub struct StatusError {
    status: StatusCode,
    reason: String,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: ErrorBody,
}

impl StatusError {
    pub(crate) fn new(
        status: StatusCode,
        reason: String,
        method: Method,
        uri: String,
        headers: HeaderMap,
        body: ErrorBody,
    ) -> Self {
        Self {
            status,
            reason,
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }

    pub fn into_body(self) -> ErrorBody {
        self.body
    }
}

#[derive(Debug, Error)]
#[error("http connection error ({kind}) for {method} {uri}: {source}")]
pub struct ConnectionFailure {
    kind: TransportErrorKind,
    method: Method,
    uri: String,
    #[source]
    source: BoxError,
}

impl ConnectionFailure {
    pub(crate) fn new(
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        source: BoxError,
    ) -> Self {
        Self {
            kind,
            method,
            uri,
            source,
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[derive(Debug, Error)]
#[error("http request timed out after {timeout_ms}ms for {method} {uri}")]
pub struct TimeoutFailure {
    timeout_ms: u128,
    method: Method,
    uri: String,
}

impl TimeoutFailure {
    pub(crate) fn new(timeout: Duration, method: Method, uri: String) -> Self {
        Self {
            timeout_ms: timeout.as_millis(),
            method,
            uri,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.min(u64::MAX as u128) as u64)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// The failure handed to an exception mapper.
#[derive(Debug)]
pub enum ClassifiedError {
    Client(StatusError),
    Server(StatusError),
    Connection(ConnectionFailure),
    Timeout(TimeoutFailure),
}

impl ClassifiedError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Client(error) | Self::Server(error) => Some(error.status()),
            Self::Connection(_) | Self::Timeout(_) => None,
        }
    }

    /// The error raised when no mapper is registered for this failure.
    pub fn into_error(self) -> Error {
        match self {
            Self::Client(error) => Error::ClientStatus(error),
            Self::Server(error) => Error::ServerStatus(error),
            Self::Connection(error) => Error::Connection(error),
            Self::Timeout(error) => Error::Timeout(error),
        }
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(error) => write!(formatter, "client error {error}"),
            Self::Server(error) => write!(formatter, "server error {error}"),
            Self::Connection(error) => write!(formatter, "{error}"),
            Self::Timeout(error) => write!(formatter, "{error}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    ClientStatus,
    ServerStatus,
    Connection,
    Timeout,
    Decode,
    Encode,
    Mapped,
    InvalidUri,
    InvalidHeaderName,
    InvalidHeaderValue,
    SerializeQuery,
    BodyNotAllowed,
    RequestBuild,
    TlsBackendUnavailable,
    TlsBackendInit,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientStatus => "client_status",
            Self::ServerStatus => "server_status",
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
            Self::Encode => "encode",
            Self::Mapped => "mapped",
            Self::InvalidUri => "invalid_uri",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::SerializeQuery => "serialize_query",
            Self::BodyNotAllowed => "body_not_allowed",
            Self::RequestBuild => "request_build",
            Self::TlsBackendUnavailable => "tls_backend_unavailable",
            Self::TlsBackendInit => "tls_backend_init",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("client error {0}")]
    ClientStatus(StatusError),
    #[error("server error {0}")]
    ServerStatus(StatusError),
    #[error(transparent)]
    Connection(ConnectionFailure),
    #[error(transparent)]
    Timeout(TimeoutFailure),
    #[error("failed to decode response body: {source}; body={body}")]
    Decode {
        #[source]
        source: BoxError,
        body: String,
    },
    #[error("failed to encode request body: {source}")]
    Encode {
        #[source]
        source: BoxError,
    },
    #[error("{source}")]
    Mapped {
        #[source]
        source: BoxError,
    },
    #[error("invalid request uri: {uri}")]
    InvalidUri { uri: String },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to serialize request query: {source}")]
    SerializeQuery {
        #[source]
        source: serde_urlencoded::ser::Error,
    },
    #[error("{method} requests cannot carry a body")]
    BodyNotAllowed { method: Method },
    #[error("failed to build http request: {source}")]
    RequestBuild {
        #[source]
        source: http::Error,
    },
    #[error("requested tls backend is not enabled in this build: {backend}")]
    TlsBackendUnavailable { backend: &'static str },
    #[error("failed to initialize tls backend {backend}: {message}")]
    TlsBackendInit {
        backend: &'static str,
        message: String,
    },
}

impl Error {
    /// Wraps a caller-defined error so it can be returned from an exception mapper.
    pub fn mapped<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Mapped {
            source: Box::new(error),
        }
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Mapped { source } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn status_error(&self) -> Option<&StatusError> {
        match self {
            Self::ClientStatus(error) | Self::ServerStatus(error) => Some(error),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status_error().map(StatusError::status)
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ClientStatus(_) => ErrorCode::ClientStatus,
            Self::ServerStatus(_) => ErrorCode::ServerStatus,
            Self::Connection(_) => ErrorCode::Connection,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::Encode { .. } => ErrorCode::Encode,
            Self::Mapped { .. } => ErrorCode::Mapped,
            Self::InvalidUri { .. } => ErrorCode::InvalidUri,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::SerializeQuery { .. } => ErrorCode::SerializeQuery,
            Self::BodyNotAllowed { .. } => ErrorCode::BodyNotAllowed,
            Self::RequestBuild { .. } => ErrorCode::RequestBuild,
            Self::TlsBackendUnavailable { .. } => ErrorCode::TlsBackendUnavailable,
            Self::TlsBackendInit { .. } => ErrorCode::TlsBackendInit,
        }
    }
}
