use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::codec::{Codec, decode_value};
use crate::error::{BoxError, ClassifiedError, Error, ErrorBody};

/// Converts a classified failure into the error returned to the caller.
pub type ErrorMapper = Arc<dyn Fn(ClassifiedError) -> Error + Send + Sync>;

type ErrorBodyDecoder =
    Arc<dyn Fn(&dyn Codec, &[u8]) -> Result<Box<dyn Any + Send + Sync>, BoxError> + Send + Sync>;

/// Failures that are not tied to a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connection,
    Timeout,
}

/// Exact-match mapper lookup by status code or failure kind.
#[derive(Clone, Default)]
pub struct ExceptionMappers {
    by_status: HashMap<u16, ErrorMapper>,
    connection: Option<ErrorMapper>,
    timeout: Option<ErrorMapper>,
}

impl std::fmt::Debug for ExceptionMappers {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut statuses: Vec<_> = self.by_status.keys().copied().collect();
        statuses.sort_unstable();
        formatter
            .debug_struct("ExceptionMappers")
            .field("statuses", &statuses)
            .field("connection", &self.connection.is_some())
            .field("timeout", &self.timeout.is_some())
            .finish()
    }
}

impl ExceptionMappers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `mapper` for `status`; a later registration replaces an earlier one.
    pub fn register_status(&mut self, status: u16, mapper: ErrorMapper) {
        self.by_status.insert(status, mapper);
    }

    pub fn register_failure(&mut self, kind: FailureKind, mapper: ErrorMapper) {
        match kind {
            FailureKind::Connection => self.connection = Some(mapper),
            FailureKind::Timeout => self.timeout = Some(mapper),
        }
    }

    pub fn for_status(&self, status: u16) -> Option<&ErrorMapper> {
        self.by_status.get(&status)
    }

    pub fn for_failure(&self, kind: FailureKind) -> Option<&ErrorMapper> {
        match kind {
            FailureKind::Connection => self.connection.as_ref(),
            FailureKind::Timeout => self.timeout.as_ref(),
        }
    }

    /// Produces the error to return for `classified`: the registered mapper's
    /// result verbatim, or the default error for that outcome kind.
    pub fn raise(&self, classified: ClassifiedError) -> Error {
        let mapper = match &classified {
            ClassifiedError::Client(error) | ClassifiedError::Server(error) => {
                self.for_status(error.status().as_u16())
            }
            ClassifiedError::Connection(_) => self.for_failure(FailureKind::Connection),
            ClassifiedError::Timeout(_) => self.for_failure(FailureKind::Timeout),
        };
        match mapper {
            Some(mapper) => mapper(classified),
            None => classified.into_error(),
        }
    }
}

/// Per-status types used to decode error response bodies.
#[derive(Clone, Default)]
pub struct ErrorBodyTypes {
    decoders: HashMap<u16, ErrorBodyDecoder>,
}

impl std::fmt::Debug for ErrorBodyTypes {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut statuses: Vec<_> = self.decoders.keys().copied().collect();
        statuses.sort_unstable();
        formatter
            .debug_struct("ErrorBodyTypes")
            .field("statuses", &statuses)
            .finish()
    }
}

impl ErrorBodyTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E>(&mut self, status: u16)
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        let decoder: ErrorBodyDecoder = Arc::new(
            |codec: &dyn Codec, body: &[u8]| -> Result<Box<dyn Any + Send + Sync>, BoxError> {
                match decode_value::<E>(codec, body)? {
                    Some(value) => Ok(Box::new(value)),
                    None => Err("error body decoded to null".into()),
                }
            },
        );
        self.decoders.insert(status, decoder);
    }

    pub fn contains(&self, status: u16) -> bool {
        self.decoders.contains_key(&status)
    }

    /// Empty bodies stay empty. A body that fails to decode into the registered
    /// type is kept raw.
    pub fn decode(&self, codec: &dyn Codec, status: StatusCode, body: &[u8]) -> ErrorBody {
        if body.is_empty() {
            return ErrorBody::Empty;
        }
        let raw = || ErrorBody::Raw(String::from_utf8_lossy(body).into_owned());
        let Some(decoder) = self.decoders.get(&status.as_u16()) else {
            return raw();
        };
        match decoder(codec, body) {
            Ok(value) => ErrorBody::Decoded(value),
            Err(error) => {
                warn!(
                    status = status.as_u16(),
                    error = %error,
                    "failed to decode error response body into registered type"
                );
                raw()
            }
        }
    }
}
