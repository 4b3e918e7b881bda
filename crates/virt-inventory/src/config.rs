//! Client configuration.

use std::time::Duration;

use crate::interfaces::AddressSource;

/// Default deadline for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for a single query against an open connection.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadlines and query options shared by every call made through a
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for `connect`, including authentication and the open call.
    pub connect_timeout: Duration,
    /// Deadline for each `lookup`, `fetch_info`, `fetch_interfaces` and
    /// `close` call.
    pub call_timeout: Duration,
    /// Where interface addresses are read from when the caller does not say.
    pub address_source: AddressSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            address_source: AddressSource::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_address_source(mut self, source: AddressSource) -> Self {
        self.address_source = source;
        self
    }
}
