//! Configuration options for the OrderMS client

use std::time::Duration;

/// Configuration options for the OrderMS client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether to persist the session in the credential store
    pub persist_session: bool,

    /// Whether to start background validation when the client is built
    pub auto_validate: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Minutes before true expiry at which a proactive token refresh triggers
    pub refresh_buffer_minutes: i64,

    /// Minimum interval between full server-side validations, and the
    /// period of the background validator
    pub validate_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            auto_validate: false,
            request_timeout: Some(Duration::from_secs(30)),
            refresh_buffer_minutes: 5,
            validate_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set whether background validation starts with the client
    pub fn with_auto_validate(mut self, value: bool) -> Self {
        self.auto_validate = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the proactive refresh buffer in minutes
    pub fn with_refresh_buffer_minutes(mut self, value: i64) -> Self {
        self.refresh_buffer_minutes = value;
        self
    }

    /// Set the server validation interval
    pub fn with_validate_interval(mut self, value: Duration) -> Self {
        self.validate_interval = value;
        self
    }
}
