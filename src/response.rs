use std::any::TypeId;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::Result;
use crate::codec::{Codec, decode_value};
use crate::error::Error;
use crate::util::truncate_body;

/// A fully buffered response as returned by a [`Transport`](crate::Transport).
#[derive(Clone, Debug)]
pub struct RawResponse {
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body: body.into(),
        }
    }

    /// Overrides the canonical reason phrase with the one sent by the server.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub(crate) fn into_parts(self) -> (StatusCode, String, HeaderMap, Bytes) {
        (self.status, self.reason, self.headers, self.body)
    }
}

/// Turns a successful response body into the declared response type.
pub struct ResponseDecoder<'a> {
    codec: &'a dyn Codec,
}

impl<'a> ResponseDecoder<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        Self { codec }
    }

    /// Empty (or whitespace-only) bodies and bodies that decode to `null` are
    /// absent, whatever `T` is. A `()` response type never reads the body.
    pub fn decode<T>(&self, body: &[u8]) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
    {
        if TypeId::of::<T>() == TypeId::of::<()>() || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        decode_value(self.codec, body).map_err(|source| Error::Decode {
            source,
            body: truncate_body(body),
        })
    }
}
