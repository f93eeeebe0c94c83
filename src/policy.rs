use std::sync::Arc;
use std::time::Duration;

use crate::classify::OutcomeKind;
use crate::config::ExecutionDefaults;

pub type FallbackSupplier<T> = Arc<dyn Fn() -> Option<T> + Send + Sync>;

/// Retry, timeout and suppression settings for a single call.
pub struct ExecutionPolicy<T> {
    timeout: Duration,
    retry_count: u32,
    retry_server_error: bool,
    retry_connection_error: bool,
    retry_timeout: bool,
    process_client_errors: bool,
    process_server_errors: bool,
    process_connection_errors: bool,
    process_timeout_errors: bool,
    fallback: FallbackSupplier<T>,
}

impl<T> Clone for ExecutionPolicy<T> {
    fn clone(&self) -> Self {
        Self {
            timeout: self.timeout,
            retry_count: self.retry_count,
            retry_server_error: self.retry_server_error,
            retry_connection_error: self.retry_connection_error,
            retry_timeout: self.retry_timeout,
            process_client_errors: self.process_client_errors,
            process_server_errors: self.process_server_errors,
            process_connection_errors: self.process_connection_errors,
            process_timeout_errors: self.process_timeout_errors,
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl<T> std::fmt::Debug for ExecutionPolicy<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExecutionPolicy")
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("retry_server_error", &self.retry_server_error)
            .field("retry_connection_error", &self.retry_connection_error)
            .field("retry_timeout", &self.retry_timeout)
            .field("process_client_errors", &self.process_client_errors)
            .field("process_server_errors", &self.process_server_errors)
            .field("process_connection_errors", &self.process_connection_errors)
            .field("process_timeout_errors", &self.process_timeout_errors)
            .finish()
    }
}

impl<T: 'static> Default for ExecutionPolicy<T> {
    fn default() -> Self {
        Self::from_defaults(ExecutionDefaults::default())
    }
}

impl<T: 'static> ExecutionPolicy<T> {
    pub fn from_defaults(defaults: ExecutionDefaults) -> Self {
        Self {
            timeout: defaults.timeout.max(Duration::from_millis(1)),
            retry_count: defaults.retry_count,
            retry_server_error: defaults.retry_server_error,
            retry_connection_error: defaults.retry_connection_error,
            retry_timeout: defaults.retry_timeout,
            process_client_errors: true,
            process_server_errors: true,
            process_connection_errors: true,
            process_timeout_errors: true,
            fallback: Arc::new(|| None),
        }
    }
}

impl<T> ExecutionPolicy<T> {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn retry_server_error(mut self, retry: bool) -> Self {
        self.retry_server_error = retry;
        self
    }

    pub fn retry_connection_error(mut self, retry: bool) -> Self {
        self.retry_connection_error = retry;
        self
    }

    pub fn retry_timeout(mut self, retry: bool) -> Self {
        self.retry_timeout = retry;
        self
    }

    pub fn process_client_errors(mut self, process: bool) -> Self {
        self.process_client_errors = process;
        self
    }

    pub fn process_server_errors(mut self, process: bool) -> Self {
        self.process_server_errors = process;
        self
    }

    /// Connection failures are raised regardless; turning this off only
    /// lowers the log level of the terminal failure.
    pub fn process_connection_errors(mut self, process: bool) -> Self {
        self.process_connection_errors = process;
        self
    }

    pub fn process_timeout_errors(mut self, process: bool) -> Self {
        self.process_timeout_errors = process;
        self
    }

    pub fn fallback(mut self, fallback: FallbackSupplier<T>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn configured_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn configured_retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_attempts(&self) -> usize {
        (self.retry_count as usize).saturating_add(1)
    }

    /// Whether a failed attempt of this kind may be replayed while budget remains.
    pub fn retries(&self, kind: OutcomeKind) -> bool {
        match kind {
            OutcomeKind::ServerError => self.retry_server_error,
            OutcomeKind::ConnectionError => self.retry_connection_error,
            OutcomeKind::TimeoutError => self.retry_timeout,
            OutcomeKind::Success | OutcomeKind::ClientError | OutcomeKind::Unresolved => false,
        }
    }

    /// Whether a terminal failure of this kind is raised instead of replaced by the fallback.
    pub fn raises(&self, kind: OutcomeKind) -> bool {
        match kind {
            OutcomeKind::ClientError => self.process_client_errors,
            OutcomeKind::ServerError => self.process_server_errors,
            OutcomeKind::TimeoutError => self.process_timeout_errors,
            OutcomeKind::ConnectionError => true,
            OutcomeKind::Success | OutcomeKind::Unresolved => false,
        }
    }

    pub(crate) fn logs_connection_errors(&self) -> bool {
        self.process_connection_errors
    }

    pub fn fallback_value(&self) -> Option<T> {
        (self.fallback)()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::ExecutionPolicy;
    use crate::classify::OutcomeKind;

    #[test]
    fn client_errors_are_never_retryable() {
        let policy = ExecutionPolicy::<()>::default()
            .retry_count(5)
            .retry_server_error(true)
            .retry_connection_error(true);
        assert!(!policy.retries(OutcomeKind::ClientError));
        assert!(policy.retries(OutcomeKind::ServerError));
        assert!(policy.retries(OutcomeKind::ConnectionError));
        assert!(policy.retries(OutcomeKind::TimeoutError));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn connection_errors_are_raised_even_when_processing_is_off() {
        let policy = ExecutionPolicy::<()>::default()
            .process_client_errors(false)
            .process_server_errors(false)
            .process_connection_errors(false)
            .process_timeout_errors(false);
        assert!(policy.raises(OutcomeKind::ConnectionError));
        assert!(!policy.raises(OutcomeKind::ClientError));
        assert!(!policy.raises(OutcomeKind::ServerError));
        assert!(!policy.raises(OutcomeKind::TimeoutError));
    }

    #[test]
    fn fallback_defaults_to_absent() {
        let policy = ExecutionPolicy::<String>::default();
        assert!(policy.fallback_value().is_none());
        assert_eq!(policy.configured_timeout(), Duration::from_millis(3000));

        let policy = policy.fallback(Arc::new(|| Some("cached".to_owned())));
        assert_eq!(policy.fallback_value().as_deref(), Some("cached"));
    }
}
