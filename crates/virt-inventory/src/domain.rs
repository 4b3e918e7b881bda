//! Domain handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use virt_inventory_xdr::Uuid;

use crate::connection::{ConnectionHandle, Shared};
use crate::error::{with_deadline, Error, Operation, Result};
use crate::hypervisor::{DomainRef, Hypervisor};

/// Lifecycle state of a [`DomainHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainHandleState {
    Resolved,
    Released,
}

/// A domain resolved on a connection.
///
/// The handle is owned independently of its [`ConnectionHandle`] and may
/// outlive it, but it is only usable while that connection is open.
/// Releasing is idempotent; dropping releases.
pub struct DomainHandle {
    conn: Arc<Shared>,
    domain: DomainRef,
    released: AtomicBool,
}

impl DomainHandle {
    /// Resolve `name` on an open connection.
    ///
    /// Fails with [`Error::ConnectionClosed`] without contacting the
    /// hypervisor when `connection` is closed.
    pub async fn lookup(connection: &ConnectionHandle, name: &str) -> Result<Self> {
        let conn = connection.shared()?;
        let domain = with_deadline(
            Operation::Lookup,
            conn.config.call_timeout,
            conn.hypervisor.lookup_domain(name),
        )
        .await?;

        tracing::debug!(domain = %domain.name, uuid = %domain.uuid, id = domain.id, "domain resolved");
        Ok(Self {
            conn: Arc::clone(conn),
            domain,
            released: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.domain.name
    }

    pub fn uuid(&self) -> Uuid {
        self.domain.uuid
    }

    /// Runtime id, `None` while the domain is inactive.
    pub fn id(&self) -> Option<u32> {
        u32::try_from(self.domain.id).ok()
    }

    pub fn state(&self) -> DomainHandleState {
        if self.released.load(Ordering::Acquire) {
            DomainHandleState::Released
        } else {
            DomainHandleState::Resolved
        }
    }

    /// Whether queries on this handle can currently succeed.
    pub fn is_valid(&self) -> bool {
        self.state() == DomainHandleState::Resolved && self.conn.is_open()
    }

    /// Release the handle. Safe to call any number of times, before or after
    /// the owning connection closes.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(domain = %self.domain.name, "domain handle released");
    }

    /// The session and domain identity, if the handle is still usable.
    pub(crate) fn live(&self) -> Result<(&dyn Hypervisor, &DomainRef)> {
        if !self.is_valid() {
            return Err(Error::InvalidHandle(self.domain.name.clone()));
        }
        Ok((self.conn.hypervisor.as_ref(), &self.domain))
    }

    pub(crate) fn call_timeout(&self) -> std::time::Duration {
        self.conn.config.call_timeout
    }
}

impl Drop for DomainHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DomainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainHandle")
            .field("name", &self.domain.name)
            .field("uuid", &self.domain.uuid)
            .field("state", &self.state())
            .finish()
    }
}
