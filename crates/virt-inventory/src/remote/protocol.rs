//! libvirt remote protocol messages used by the inventory client.
//!
//! Field order and types follow `remote_protocol.x`; every struct encodes
//! as XDR through `virt-inventory-xdr`.

use serde::{Deserialize, Serialize};
use virt_inventory_xdr::Uuid;

pub const REMOTE_PROGRAM: u32 = 0x2000_8086;
pub const REMOTE_PROTOCOL_VERSION: u32 = 1;

/// Procedure numbers.
pub mod procedure {
    pub const CONNECT_OPEN: u32 = 1;
    pub const CONNECT_CLOSE: u32 = 2;
    pub const DOMAIN_GET_INFO: u32 = 16;
    pub const DOMAIN_LOOKUP_BY_NAME: u32 = 23;
    pub const AUTH_LIST: u32 = 66;
    pub const AUTH_POLKIT: u32 = 70;
    pub const DOMAIN_INTERFACE_ADDRESSES: u32 = 353;
}

/// `virErrorNumber` values the client reacts to.
pub mod error_code {
    pub const NO_DOMAIN: i32 = 42;
    pub const OPERATION_INVALID: i32 = 55;
    /// Guest agent is not configured for the domain.
    pub const ARGUMENT_UNSUPPORTED: i32 = 74;
    /// Guest agent is configured but not connected.
    pub const AGENT_UNRESPONSIVE: i32 = 86;
}

/// `remote_auth_type` values.
pub mod auth_type {
    pub const NONE: i32 = 0;
    pub const SASL: i32 = 1;
    pub const POLKIT: i32 = 2;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNonnullDomain {
    pub name: String,
    pub uuid: Uuid,
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNonnullNetwork {
    pub name: String,
    pub uuid: Uuid,
}

/// Payload of every error reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i32,
    pub domain: i32,
    pub message: Option<String>,
    pub level: i32,
    pub dom: Option<RemoteNonnullDomain>,
    pub str1: Option<String>,
    pub str2: Option<String>,
    pub str3: Option<String>,
    pub int1: i32,
    pub int2: i32,
    pub net: Option<RemoteNonnullNetwork>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOpenArgs {
    pub name: Option<String>,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthListRet {
    pub types: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPolkitRet {
    pub complete: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLookupByNameArgs {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLookupByNameRet {
    pub dom: RemoteNonnullDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainGetInfoArgs {
    pub dom: RemoteNonnullDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainGetInfoRet {
    pub state: u8,
    pub max_mem: u64,
    pub memory: u64,
    pub nr_virt_cpu: u16,
    pub cpu_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInterfaceAddressesArgs {
    pub dom: RemoteNonnullDomain,
    pub source: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainIpAddr {
    #[serde(rename = "type")]
    pub kind: i32,
    pub addr: String,
    pub prefix: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInterface {
    pub name: String,
    pub hwaddr: Option<String>,
    pub addrs: Vec<DomainIpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInterfaceAddressesRet {
    pub ifaces: Vec<DomainInterface>,
}
