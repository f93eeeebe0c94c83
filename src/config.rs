use std::time::Duration;

pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientProfile {
    #[default]
    Standard,
    LowLatency,
    Resilient,
}

/// Client-wide starting values for every per-call [`ExecutionPolicy`](crate::ExecutionPolicy).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionDefaults {
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_server_error: bool,
    pub retry_connection_error: bool,
    pub retry_timeout: bool,
}

impl Default for ExecutionDefaults {
    fn default() -> Self {
        ClientProfile::Standard.defaults()
    }
}

impl ExecutionDefaults {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_retry_server_error(mut self, retry: bool) -> Self {
        self.retry_server_error = retry;
        self
    }

    pub fn with_retry_connection_error(mut self, retry: bool) -> Self {
        self.retry_connection_error = retry;
        self
    }

    pub fn with_retry_timeout(mut self, retry: bool) -> Self {
        self.retry_timeout = retry;
        self
    }
}

impl ClientProfile {
    pub fn defaults(self) -> ExecutionDefaults {
        match self {
            Self::Standard => ExecutionDefaults {
                timeout: DEFAULT_REQUEST_TIMEOUT,
                retry_count: 0,
                retry_server_error: false,
                retry_connection_error: false,
                retry_timeout: true,
            },
            Self::LowLatency => ExecutionDefaults {
                timeout: Duration::from_millis(500),
                retry_count: 1,
                retry_server_error: false,
                retry_connection_error: true,
                retry_timeout: true,
            },
            Self::Resilient => ExecutionDefaults {
                timeout: Duration::from_secs(10),
                retry_count: 3,
                retry_server_error: true,
                retry_connection_error: true,
                retry_timeout: true,
            },
        }
    }
}
