use bytes::Bytes;
use http::header::HeaderValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BoxError;

/// Body codec used for request payloads, success bodies and typed error bodies.
///
/// Codecs exchange `serde_json::Value` with the executor, so any serde data
/// format can be plugged in without making the trait generic.
pub trait Codec: Send + Sync {
    fn content_type(&self) -> HeaderValue;

    fn encode(&self, value: &Value) -> Result<Bytes, BoxError>;

    fn decode(&self, body: &[u8]) -> Result<Value, BoxError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("application/json")
    }

    fn encode(&self, value: &Value) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(&self, body: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(body)?)
    }
}

pub(crate) fn encode_value<T>(codec: &dyn Codec, payload: &T) -> Result<Bytes, BoxError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(payload)?;
    codec.encode(&value)
}

/// Decodes `body` into `T`; a body that decodes to `null` yields `None`.
pub(crate) fn decode_value<T>(codec: &dyn Codec, body: &[u8]) -> Result<Option<T>, BoxError>
where
    T: DeserializeOwned,
{
    match codec.decode(body)? {
        Value::Null => Ok(None),
        value => Ok(Some(serde_json::from_value(value)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Codec, JsonCodec, decode_value, encode_value};

    #[test]
    fn json_codec_encodes_payload_as_compact_json() {
        let body = encode_value(&JsonCodec, &serde_json::json!({ "login": "ronin" }))
            .expect("payload should encode");
        assert_eq!(&body[..], br#"{"login":"ronin"}"#);
        assert_eq!(JsonCodec.content_type(), "application/json");
    }

    #[test]
    fn json_null_decodes_to_none() {
        let decoded: Option<String> = decode_value(&JsonCodec, b"null").expect("null should decode");
        assert!(decoded.is_none());
    }

    #[test]
    fn malformed_json_is_reported() {
        let result: Result<Option<String>, _> = decode_value(&JsonCodec, b"{oops");
        assert!(result.is_err());
    }
}
