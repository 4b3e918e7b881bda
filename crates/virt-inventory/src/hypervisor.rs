//! Backend seam: the query verbs a hypervisor management service exposes.
//!
//! [`ConnectionHandle`](crate::ConnectionHandle) and
//! [`DomainHandle`](crate::DomainHandle) only talk to these traits. The
//! production implementation is [`RemoteConnector`](crate::RemoteConnector),
//! which speaks the libvirt remote protocol.

use async_trait::async_trait;
use virt_inventory_xdr::Uuid;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::interfaces::AddressSource;

/// Opens sessions with a hypervisor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open, authenticate and return a live session.
    ///
    /// Failures are reported as [`Error::Connection`](crate::Error::Connection).
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Hypervisor>>;
}

/// A live session with a hypervisor.
///
/// Implementations report failures using the crate's error kinds:
/// `lookup_domain` with `DomainNotFound`/`ConnectionClosed`, `domain_info`
/// with `InfoUnavailable`, and `interface_addresses` with
/// `InventoryUnavailable`.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    async fn lookup_domain(&self, name: &str) -> Result<DomainRef>;

    async fn domain_info(&self, domain: &DomainRef) -> Result<RawDomainInfo>;

    /// An agent that is absent or not running yields `Ok(vec![])`.
    async fn interface_addresses(
        &self,
        domain: &DomainRef,
        source: AddressSource,
    ) -> Result<Vec<RawInterface>>;

    /// Gracefully end the session.
    async fn close(&self) -> Result<()>;

    /// Tear down the session immediately without talking to the peer.
    ///
    /// Called from `Drop` paths, so it must not block.
    fn disconnect(&self);
}

/// Identity of a domain as resolved by the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRef {
    pub name: String,
    pub uuid: Uuid,
    /// Runtime id; `-1` for inactive domains.
    pub id: i32,
}

/// Runtime information exactly as the backend reported it.
///
/// Negative values are error sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDomainInfo {
    pub state: i32,
    pub max_memory_kb: i64,
    pub memory_kb: i64,
    pub nr_virt_cpu: i32,
    pub cpu_time_ns: i64,
}

/// One interface as the backend reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInterface {
    pub name: String,
    pub hwaddr: Option<String>,
    pub addrs: Vec<RawAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAddress {
    /// Address family code: 0 for IPv4, 1 for IPv6.
    pub family: i32,
    pub addr: String,
    pub prefix: u32,
}
