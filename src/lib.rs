//! `restexec` runs declarative HTTP calls through a retry, timeout and error
//! classification pipeline, returning a typed result, a typed error or a
//! caller-supplied fallback.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use restexec::prelude::{RestClient, RestResult};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Item {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> RestResult<()> {
//!     let client = RestClient::builder()
//!         .base_url("https://api.example.com")
//!         .client_name("inventory")
//!         .try_build()?;
//!
//!     let item: Option<Item> = client
//!         .get("/v1/items/42")
//!         .add_param("expand", "stock")
//!         .request_processing_timeout(Duration::from_secs(1))
//!         .retry_count(2)
//!         .retry_server_error(true)
//!         .process_timeout_exceptions(false)
//!         .execute()
//!         .await?;
//!
//!     println!("item={item:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Outcomes
//!
//! - 2xx decodes the body; an empty or `null` body is `Ok(None)`.
//! - 4xx is never retried.
//! - 5xx, connection failures and timeouts are retried when enabled and budget remains.
//! - Connection failures always end in an error; the other failure kinds can be
//!   suppressed in favour of the default response.

mod builder;
mod classify;
mod client;
mod codec;
mod config;
mod error;
mod execute;
pub mod logging;
mod mapping;
mod observe;
mod policy;
mod request;
mod response;
mod transport;
mod util;

pub use crate::builder::RequestBuilder;
pub use crate::classify::{Outcome, OutcomeKind, RawOutcome, classify};
pub use crate::client::{RestClient, RestClientBuilder};
pub use crate::codec::{Codec, JsonCodec};
pub use crate::config::{ClientProfile, ExecutionDefaults};
pub use crate::error::{
    BoxError, ClassifiedError, ConnectionFailure, Error, ErrorBody, ErrorCode, StatusError,
    TimeoutFailure, TransportErrorKind,
};
pub use crate::execute::Executor;
pub use crate::mapping::{ErrorBodyTypes, ErrorMapper, ExceptionMappers, FailureKind};
pub use crate::observe::{Observer, RequestContext};
pub use crate::policy::{ExecutionPolicy, FallbackSupplier};
pub use crate::request::RequestSpec;
pub use crate::response::{RawResponse, ResponseDecoder};
pub use crate::transport::{
    HyperTransport, RedirectPolicy, TlsBackend, Transport, TransportError, TransportFuture,
    TransportOptions,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type RestResult<T> = Result<T>;

pub mod prelude {
    pub use crate::{
        ClassifiedError, ClientProfile, Error, ErrorBody, ErrorCode, ExecutionDefaults,
        OutcomeKind, RequestBuilder, RestClient, RestClientBuilder, RestResult, StatusError,
        TransportErrorKind,
    };
}
