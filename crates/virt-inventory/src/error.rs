//! Error types for the inventory client.

use std::fmt;
use std::time::Duration;

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the inventory client.
///
/// Each variant is one failure kind; use [`Error::kind`] to dispatch on it
/// without matching the context fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The hypervisor could not be reached, authenticated against, or the
    /// endpoint was malformed.
    #[error("failed to connect to hypervisor '{endpoint}': {reason}")]
    Connection { endpoint: String, reason: String },

    /// A potentially blocking call exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    /// No domain with this name exists on the connection.
    #[error("failed to find domain '{0}'")]
    DomainNotFound(String),

    /// The connection was closed before the call was attempted.
    #[error("connection closed")]
    ConnectionClosed,

    /// The domain handle was released, or its connection closed.
    #[error("handle for domain '{0}' is no longer valid")]
    InvalidHandle(String),

    /// The runtime information query failed or reported an error sentinel.
    #[error("failed to get information for domain '{domain}': {reason}")]
    InfoUnavailable { domain: String, reason: String },

    /// The interface address query failed to communicate with its source.
    #[error("failed to get interface addresses for domain '{domain}': {reason}")]
    InventoryUnavailable { domain: String, reason: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::DomainNotFound(_) => ErrorKind::DomainNotFound,
            Error::ConnectionClosed => ErrorKind::ConnectionClosed,
            Error::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Error::InfoUnavailable { .. } => ErrorKind::InfoUnavailable,
            Error::InventoryUnavailable { .. } => ErrorKind::InventoryUnavailable,
        }
    }

    pub(crate) fn connection(endpoint: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Error::Connection {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn info(domain: &str, reason: impl fmt::Display) -> Self {
        Error::InfoUnavailable {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn inventory(domain: &str, reason: impl fmt::Display) -> Self {
        Error::InventoryUnavailable {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    DomainNotFound,
    ConnectionClosed,
    InvalidHandle,
    InfoUnavailable,
    InventoryUnavailable,
}

/// The blocking operations that accept a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Lookup,
    FetchInfo,
    FetchInterfaces,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Connect => "connect",
            Operation::Lookup => "domain lookup",
            Operation::FetchInfo => "domain info query",
            Operation::FetchInterfaces => "interface address query",
            Operation::Close => "close",
        })
    }
}

/// Run `fut` under a deadline, turning expiry into [`Error::Timeout`].
///
/// On expiry `fut` is dropped, which releases whatever it had acquired.
pub(crate) async fn with_deadline<T>(
    operation: Operation,
    after: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { operation, after }),
    }
}
