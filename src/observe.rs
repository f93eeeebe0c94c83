use http::Method;

use crate::classify::OutcomeKind;

#[derive(Clone, Debug)]
pub struct RequestContext {
    client_name: String,
    method: Method,
    uri: String,
    attempt: usize,
    max_attempts: usize,
}

impl RequestContext {
    pub(crate) fn new(
        client_name: &str,
        method: Method,
        uri: String,
        attempt: usize,
        max_attempts: usize,
    ) -> Self {
        Self {
            client_name: client_name.to_owned(),
            method,
            uri,
            attempt,
            max_attempts,
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Redacted request uri.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// Hooks invoked by the executor around every attempt.
pub trait Observer: Send + Sync {
    fn on_request_start(&self, _context: &RequestContext) {}

    /// Called after a failed attempt, before the same request is replayed.
    fn on_retry_scheduled(&self, _context: &RequestContext, _outcome: OutcomeKind) {}

    /// Called once per call with the outcome of the last attempt.
    fn on_request_settled(&self, _context: &RequestContext, _outcome: OutcomeKind) {}
}
