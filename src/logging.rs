//! Request/response logging for call sites that want the payloads in their logs.

use std::future::Future;

use serde::Serialize;
use tracing::{Level, debug};

use crate::Result;

/// Runs `call` and logs `request` and the returned value as pretty JSON at
/// `debug` level under `endpoint`. A plain pass-through when `debug` is off.
///
/// ```no_run
/// # async fn demo(client: &restexec::RestClient) -> restexec::Result<()> {
/// let query = [("id", "42")];
/// let item: Option<serde_json::Value> = restexec::logging::log_exchange(
///     "items.get",
///     &query,
///     client.get("/items").add_params(query).execute(),
/// )
/// .await?;
/// # let _ = item;
/// # Ok(())
/// # }
/// ```
pub async fn log_exchange<R, T, F>(endpoint: &str, request: &R, call: F) -> Result<Option<T>>
where
    R: Serialize + ?Sized,
    T: Serialize,
    F: Future<Output = Result<Option<T>>>,
{
    if !tracing::enabled!(Level::DEBUG) {
        return call.await;
    }

    debug!(endpoint, request = %to_pretty_json(request), "calling endpoint");
    let result = call.await;
    match &result {
        Ok(value) => debug!(endpoint, response = %to_pretty_json(value), "endpoint returned"),
        Err(error) => debug!(endpoint, error = %error, code = error.code().as_str(), "endpoint failed"),
    }
    result
}

fn to_pretty_json<V>(value: &V) -> String
where
    V: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<unserializable: {error}>"))
}
