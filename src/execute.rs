use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::{Instrument, debug, info_span, warn};

use crate::Result;
use crate::classify::{Outcome, OutcomeKind, RawOutcome, classify};
use crate::codec::Codec;
use crate::error::{ClassifiedError, ConnectionFailure, StatusError, TimeoutFailure};
use crate::mapping::{ErrorBodyTypes, ExceptionMappers};
use crate::observe::{Observer, RequestContext};
use crate::policy::ExecutionPolicy;
use crate::request::RequestSpec;
use crate::response::{RawResponse, ResponseDecoder};
use crate::transport::Transport;

const DEFAULT_CLIENT_NAME: &str = "restexec";

/// Runs the attempt loop for one call.
///
/// Holds only borrowed collaborators, so one executor can serve any number of
/// independent calls concurrently.
pub struct Executor<'a> {
    transport: &'a dyn Transport,
    codec: &'a dyn Codec,
    observer: Option<&'a dyn Observer>,
    client_name: &'a str,
}

impl<'a> Executor<'a> {
    pub fn new(transport: &'a dyn Transport, codec: &'a dyn Codec) -> Self {
        Self {
            transport,
            codec,
            observer: None,
            client_name: DEFAULT_CLIENT_NAME,
        }
    }

    pub fn observer(mut self, observer: Option<&'a dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn client_name(mut self, client_name: &'a str) -> Self {
        self.client_name = client_name;
        self
    }

    /// Sends `spec` until it settles.
    ///
    /// Server, connection and timeout failures are replayed while the policy
    /// allows it and retry budget remains; each attempt gets the full timeout.
    /// Client errors settle on the first attempt.
    pub async fn execute<T>(
        &self,
        spec: &RequestSpec,
        policy: &ExecutionPolicy<T>,
        mappers: &ExceptionMappers,
        error_bodies: &ErrorBodyTypes,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let max_attempts = policy.max_attempts();
        let attempt_timeout = policy.configured_timeout();
        let mut remaining_retries = policy.configured_retry_count();
        let mut attempt = 0_usize;

        loop {
            attempt += 1;
            let context = RequestContext::new(
                self.client_name,
                spec.method().clone(),
                spec.redacted_uri().to_owned(),
                attempt,
                max_attempts,
            );
            let span = info_span!(
                "restexec.request",
                client = %self.client_name,
                method = %spec.method(),
                uri = %spec.redacted_uri(),
                attempt = attempt,
                max_attempts = max_attempts
            );

            let outcome = self
                .send_attempt(spec, attempt_timeout, &context)
                .instrument(span.clone())
                .await;
            let kind = outcome.kind();

            if policy.retries(kind) && remaining_retries > 0 {
                remaining_retries -= 1;
                span.in_scope(|| log_retry(&outcome, remaining_retries));
                if let Some(observer) = self.observer {
                    observer.on_retry_scheduled(&context, kind);
                }
                continue;
            }

            if let Some(observer) = self.observer {
                observer.on_request_settled(&context, kind);
            }
            return span.in_scope(|| self.settle(spec, outcome, policy, mappers, error_bodies));
        }
    }

    async fn send_attempt(
        &self,
        spec: &RequestSpec,
        attempt_timeout: Duration,
        context: &RequestContext,
    ) -> Outcome {
        if let Some(observer) = self.observer {
            observer.on_request_start(context);
        }
        let started = Instant::now();
        debug!("sending request");

        let raw = match timeout(attempt_timeout, self.transport.send(spec)).await {
            Ok(Ok(response)) => RawOutcome::Response(response),
            Ok(Err(error)) => RawOutcome::Transport(error),
            Err(_) => RawOutcome::TimedOut(attempt_timeout),
        };
        let outcome = classify(raw);
        debug!(
            outcome = %outcome.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "attempt completed"
        );
        outcome
    }

    fn settle<T>(
        &self,
        spec: &RequestSpec,
        outcome: Outcome,
        policy: &ExecutionPolicy<T>,
        mappers: &ExceptionMappers,
        error_bodies: &ErrorBodyTypes,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let kind = outcome.kind();
        match outcome {
            Outcome::Success(response) => ResponseDecoder::new(self.codec).decode(response.body()),
            Outcome::ClientError(response) | Outcome::ServerError(response) => {
                let status = response.status().as_u16();
                if !policy.raises(kind) {
                    warn!(status, outcome = %kind, "request failed; returning fallback response");
                    return Ok(policy.fallback_value());
                }
                warn!(status, outcome = %kind, "request failed");
                let error = self.status_error(spec, response, error_bodies);
                let classified = match kind {
                    OutcomeKind::ClientError => ClassifiedError::Client(error),
                    _ => ClassifiedError::Server(error),
                };
                Err(mappers.raise(classified))
            }
            Outcome::ConnectionError(error) => {
                if policy.logs_connection_errors() {
                    warn!(error = %error, "request failed with connection error");
                } else {
                    debug!(error = %error, "request failed with connection error");
                }
                let failure = ConnectionFailure::new(
                    error.kind(),
                    spec.method().clone(),
                    spec.redacted_uri().to_owned(),
                    error.into_source(),
                );
                Err(mappers.raise(ClassifiedError::Connection(failure)))
            }
            Outcome::TimeoutError(elapsed) => {
                let timeout_ms = elapsed.as_millis() as u64;
                if !policy.raises(kind) {
                    warn!(timeout_ms, "request timed out; returning fallback response");
                    return Ok(policy.fallback_value());
                }
                warn!(timeout_ms, "request timed out");
                let failure = TimeoutFailure::new(
                    elapsed,
                    spec.method().clone(),
                    spec.redacted_uri().to_owned(),
                );
                Err(mappers.raise(ClassifiedError::Timeout(failure)))
            }
            Outcome::Unresolved(response) => {
                warn!(
                    status = response.status().as_u16(),
                    "transport returned an unresolved status; returning fallback response"
                );
                Ok(policy.fallback_value())
            }
        }
    }

    fn status_error(
        &self,
        spec: &RequestSpec,
        response: RawResponse,
        error_bodies: &ErrorBodyTypes,
    ) -> StatusError {
        let (status, reason, headers, body) = response.into_parts();
        let body = error_bodies.decode(self.codec, status, &body);
        StatusError::new(
            status,
            reason,
            spec.method().clone(),
            spec.redacted_uri().to_owned(),
            headers,
            body,
        )
    }
}

fn log_retry(outcome: &Outcome, remaining_retries: u32) {
    match outcome {
        Outcome::ServerError(response) => warn!(
            status = response.status().as_u16(),
            remaining_retries, "retrying request after server error"
        ),
        Outcome::ConnectionError(error) => warn!(
            error = %error,
            remaining_retries, "retrying request after connection error"
        ),
        Outcome::TimeoutError(elapsed) => warn!(
            timeout_ms = elapsed.as_millis() as u64,
            remaining_retries, "retrying request after timeout"
        ),
        other => warn!(outcome = %other.kind(), remaining_retries, "retrying request"),
    }
}
