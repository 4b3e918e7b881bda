//! Hypervisor connection handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{with_deadline, Error, Operation, Result};
use crate::hypervisor::{Connector, Hypervisor};

/// Lifecycle state of a [`ConnectionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// An open session with one hypervisor endpoint.
///
/// Closing is idempotent and never fails observably. Dropping the handle
/// disconnects any session not yet torn down, including one whose close was
/// cancelled part way, without the graceful close exchange. Domain handles
/// resolved through this connection stay safe to hold after it closes, but
/// every query on them fails with [`Error::InvalidHandle`].
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

/// State shared between a connection and the domain handles resolved on it.
pub(crate) struct Shared {
    pub(crate) endpoint: Endpoint,
    pub(crate) config: ClientConfig,
    pub(crate) hypervisor: Box<dyn Hypervisor>,
    open: AtomicBool,
    /// Set once the backend session has been torn down. Tracked apart from
    /// `open` so a close cancelled mid-exchange still disconnects on drop.
    disconnected: AtomicBool,
}

impl Shared {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn disconnect(&self) {
        if !self.disconnected.swap(true, Ordering::AcqRel) {
            self.hypervisor.disconnect();
        }
    }
}

impl ConnectionHandle {
    /// Open a connection to `endpoint` through `connector`.
    ///
    /// If the deadline expires mid-handshake, the partially opened session is
    /// torn down before the timeout is returned.
    pub async fn connect(
        connector: &dyn Connector,
        endpoint: &Endpoint,
        config: &ClientConfig,
    ) -> Result<Self> {
        tracing::debug!(%endpoint, "connecting to hypervisor");

        let hypervisor = with_deadline(
            Operation::Connect,
            config.connect_timeout,
            connector.open(endpoint),
        )
        .await?;

        tracing::debug!(%endpoint, "connection open");
        Ok(Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.clone(),
                config: config.clone(),
                hypervisor,
                open: AtomicBool::new(true),
                disconnected: AtomicBool::new(false),
            }),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn state(&self) -> ConnectionState {
        if self.shared.is_open() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// Close the connection.
    ///
    /// Only the first call does any work; later calls log and return.
    /// A failed or timed-out close exchange still leaves the handle closed.
    pub async fn close(&self) {
        let endpoint = &self.shared.endpoint;
        if !self.shared.open.swap(false, Ordering::AcqRel) {
            tracing::warn!(%endpoint, "close on an already closed connection");
            return;
        }

        let graceful = with_deadline(
            Operation::Close,
            self.shared.config.call_timeout,
            self.shared.hypervisor.close(),
        )
        .await;
        if let Err(e) = graceful {
            tracing::warn!(%endpoint, error = %e, "graceful close failed");
        }
        self.shared.disconnect();
        tracing::debug!(%endpoint, "connection closed");
    }

    pub(crate) fn shared(&self) -> Result<&Arc<Shared>> {
        if self.shared.is_open() {
            Ok(&self.shared)
        } else {
            Err(Error::ConnectionClosed)
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if self.shared.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(endpoint = %self.shared.endpoint, "connection dropped while open");
        }
        self.shared.disconnect();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &self.state())
            .finish()
    }
}
