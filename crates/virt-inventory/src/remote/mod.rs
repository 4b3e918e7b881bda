//! libvirt remote protocol backend.
//!
//! [`RemoteConnector`] opens sessions with a libvirt daemon over a Unix
//! socket or TCP and implements the [`Hypervisor`] verbs as RPC calls.

mod error;
mod packet;
pub mod protocol;
pub mod route;
mod rpc;
pub mod transport;

pub use error::{RpcError, RpcResult};
pub use packet::{MAX_PACKET_SIZE, HEADER_SIZE};
pub use rpc::RpcClient;

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::hypervisor::{Connector, DomainRef, Hypervisor, RawAddress, RawDomainInfo, RawInterface};
use crate::interfaces::AddressSource;
use protocol::{auth_type, error_code, procedure};
use route::Route;
use transport::{StreamTransport, Transport};

/// Opens [`RemoteHypervisor`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteConnector;

#[async_trait]
impl Connector for RemoteConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Hypervisor>> {
        Ok(Box::new(RemoteHypervisor::open(endpoint).await?))
    }
}

/// A session with a libvirt daemon.
pub struct RemoteHypervisor {
    rpc: RpcClient,
    /// URI the daemon opened, for error context.
    uri: String,
}

impl RemoteHypervisor {
    /// Resolve `endpoint`, connect its transport and run the handshake.
    pub async fn open(endpoint: &Endpoint) -> Result<Self> {
        let target = route::resolve(endpoint.as_str()).map_err(|e| Error::connection(endpoint, e))?;
        tracing::debug!(%endpoint, route = ?target.route, "opening transport");

        let rpc = match &target.route {
            Route::Unix(path) => StreamTransport::connect_unix(path).await.map(RpcClient::new),
            Route::Tcp { host, port } => StreamTransport::connect_tcp(host, *port).await.map(RpcClient::new),
        }
        .map_err(|e| Error::connection(endpoint, e))?;

        Self::handshake(rpc, target.name)
            .await
            .map_err(|e| Error::connection(endpoint, e))
    }

    /// Run the handshake over an already connected transport.
    ///
    /// `name` is the URI the daemon should open; `None` selects its default.
    pub async fn over_transport<T: Transport + 'static>(
        transport: T,
        name: Option<String>,
    ) -> RpcResult<Self> {
        Self::handshake(RpcClient::new(transport), name).await
    }

    async fn handshake(rpc: RpcClient, name: Option<String>) -> RpcResult<Self> {
        authenticate(&rpc).await?;
        let uri = name.clone().unwrap_or_else(|| "(daemon default)".to_string());
        let args = protocol::ConnectOpenArgs { name, flags: 0 };
        rpc.call_xdr::<_, ()>(procedure::CONNECT_OPEN, &args).await?;
        Ok(Self { rpc, uri })
    }
}

async fn authenticate(rpc: &RpcClient) -> RpcResult<()> {
    let ret: protocol::AuthListRet = rpc.call_xdr(procedure::AUTH_LIST, &()).await?;
    tracing::debug!(types = ?ret.types, "authentication methods offered");

    if ret.types.is_empty() || ret.types.contains(&auth_type::NONE) {
        return Ok(());
    }
    if ret.types.contains(&auth_type::POLKIT) {
        let polkit: protocol::AuthPolkitRet = rpc.call_xdr(procedure::AUTH_POLKIT, &()).await?;
        if polkit.complete != 0 {
            return Ok(());
        }
        return Err(RpcError::AuthFailed("polkit authentication incomplete".into()));
    }
    Err(RpcError::AuthFailed(format!(
        "no supported authentication method offered (types {:?})",
        ret.types
    )))
}

fn wire_domain(domain: &DomainRef) -> protocol::RemoteNonnullDomain {
    protocol::RemoteNonnullDomain {
        name: domain.name.clone(),
        uuid: domain.uuid,
        id: domain.id,
    }
}

/// Clamp an unsigned wire value into the signed raw form.
fn signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[async_trait]
impl Hypervisor for RemoteHypervisor {
    async fn lookup_domain(&self, name: &str) -> Result<DomainRef> {
        let args = protocol::DomainLookupByNameArgs {
            name: name.to_string(),
        };
        let ret: protocol::DomainLookupByNameRet = self
            .rpc
            .call_xdr(procedure::DOMAIN_LOOKUP_BY_NAME, &args)
            .await
            .map_err(|e| match e {
                e if e.is_fatal() => Error::ConnectionClosed,
                e if e.remote_code() == Some(error_code::NO_DOMAIN) => {
                    Error::DomainNotFound(name.to_string())
                }
                e => {
                    tracing::warn!(domain = name, error = %e, "domain lookup failed");
                    Error::DomainNotFound(name.to_string())
                }
            })?;

        Ok(DomainRef {
            name: ret.dom.name,
            uuid: ret.dom.uuid,
            id: ret.dom.id,
        })
    }

    async fn domain_info(&self, domain: &DomainRef) -> Result<RawDomainInfo> {
        let args = protocol::DomainGetInfoArgs {
            dom: wire_domain(domain),
        };
        let ret: protocol::DomainGetInfoRet = self
            .rpc
            .call_xdr(procedure::DOMAIN_GET_INFO, &args)
            .await
            .map_err(|e| Error::info(&domain.name, e))?;

        Ok(RawDomainInfo {
            state: ret.state as i32,
            max_memory_kb: signed(ret.max_mem),
            memory_kb: signed(ret.memory),
            nr_virt_cpu: ret.nr_virt_cpu as i32,
            cpu_time_ns: signed(ret.cpu_time),
        })
    }

    async fn interface_addresses(
        &self,
        domain: &DomainRef,
        source: AddressSource,
    ) -> Result<Vec<RawInterface>> {
        let args = protocol::DomainInterfaceAddressesArgs {
            dom: wire_domain(domain),
            source: source.code(),
            flags: 0,
        };
        let ret: protocol::DomainInterfaceAddressesRet = match self
            .rpc
            .call_xdr(procedure::DOMAIN_INTERFACE_ADDRESSES, &args)
            .await
        {
            Ok(ret) => ret,
            Err(e) if source == AddressSource::GuestAgent && agent_absent(&e) => {
                tracing::debug!(domain = %domain.name, reason = %e, "guest agent not available");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::inventory(&domain.name, e)),
        };

        Ok(ret
            .ifaces
            .into_iter()
            .map(|iface| RawInterface {
                name: iface.name,
                hwaddr: iface.hwaddr,
                addrs: iface
                    .addrs
                    .into_iter()
                    .map(|addr| RawAddress {
                        family: addr.kind,
                        addr: addr.addr,
                        prefix: addr.prefix,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.rpc
            .call_void(procedure::CONNECT_CLOSE)
            .await
            .map_err(|e| match e {
                e if e.is_fatal() => Error::ConnectionClosed,
                e => Error::connection(&self.uri, e),
            })
    }

    fn disconnect(&self) {
        self.rpc.abort();
    }
}

/// Error replies meaning the guest agent is not installed or not running.
fn agent_absent(err: &RpcError) -> bool {
    matches!(
        err.remote_code(),
        Some(error_code::ARGUMENT_UNSUPPORTED | error_code::AGENT_UNRESPONSIVE)
    )
}
