use std::time::Duration;

use crate::response::RawResponse;
use crate::transport::TransportError;

/// What one attempt produced before classification.
#[derive(Debug)]
pub enum RawOutcome {
    Response(RawResponse),
    Transport(TransportError),
    TimedOut(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    ClientError,
    ServerError,
    ConnectionError,
    TimeoutError,
    /// A 1xx/3xx status the transport should have resolved on its own.
    Unresolved,
}

impl OutcomeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::ConnectionError => "connection_error",
            Self::TimeoutError => "timeout_error",
            Self::Unresolved => "unresolved",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Exactly one classified outcome per attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(RawResponse),
    ClientError(RawResponse),
    ServerError(RawResponse),
    ConnectionError(TransportError),
    TimeoutError(Duration),
    Unresolved(RawResponse),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::ClientError(_) => OutcomeKind::ClientError,
            Self::ServerError(_) => OutcomeKind::ServerError,
            Self::ConnectionError(_) => OutcomeKind::ConnectionError,
            Self::TimeoutError(_) => OutcomeKind::TimeoutError,
            Self::Unresolved(_) => OutcomeKind::Unresolved,
        }
    }
}

pub fn classify(raw: RawOutcome) -> Outcome {
    match raw {
        RawOutcome::Transport(error) => Outcome::ConnectionError(error),
        RawOutcome::TimedOut(timeout) => Outcome::TimeoutError(timeout),
        RawOutcome::Response(response) => {
            let status = response.status();
            if status.is_success() {
                Outcome::Success(response)
            } else if status.is_client_error() {
                Outcome::ClientError(response)
            } else if status.as_u16() >= 500 {
                Outcome::ServerError(response)
            } else {
                Outcome::Unresolved(response)
            }
        }
    }
}
