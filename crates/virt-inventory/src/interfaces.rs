//! Network interface inventory.

use std::fmt;
use std::str::FromStr;

use crate::domain::DomainHandle;
use crate::error::{with_deadline, Error, Operation, Result};
use crate::hypervisor::{RawAddress, RawInterface};

/// Where interface address data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressSource {
    /// DHCP leases handed out by the hypervisor's virtual networks.
    Lease,
    /// The in-guest agent.
    #[default]
    GuestAgent,
    /// The host's ARP table.
    ArpTable,
}

impl AddressSource {
    /// libvirt `VIR_DOMAIN_INTERFACE_ADDRESSES_SRC_*` value.
    pub fn code(self) -> u32 {
        match self {
            AddressSource::Lease => 0,
            AddressSource::GuestAgent => 1,
            AddressSource::ArpTable => 2,
        }
    }
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressSource::Lease => "lease",
            AddressSource::GuestAgent => "agent",
            AddressSource::ArpTable => "arp",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown address source '{0}', expected one of: agent, lease, arp")]
pub struct ParseAddressSourceError(String);

impl FromStr for AddressSource {
    type Err = ParseAddressSourceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agent" | "guest-agent" => Ok(AddressSource::GuestAgent),
            "lease" => Ok(AddressSource::Lease),
            "arp" | "arp-table" => Ok(AddressSource::ArpTable),
            _ => Err(ParseAddressSourceError(s.to_string())),
        }
    }
}

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    IPv4,
    IPv6,
}

impl AddressFamily {
    /// libvirt `VIR_IP_ADDR_TYPE_*` value.
    pub fn code(self) -> i32 {
        match self {
            AddressFamily::IPv4 => 0,
            AddressFamily::IPv6 => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AddressFamily::IPv4),
            1 => Some(AddressFamily::IPv6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub address: String,
    /// 0 to 128.
    pub prefix_length: u8,
    pub family: AddressFamily,
}

/// An interface as seen by the address source. An interface without
/// addresses is still listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub hardware_address: Option<String>,
    pub addresses: Vec<AddressRecord>,
}

/// Interfaces in the order the address source reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory(Vec<InterfaceRecord>);

impl Inventory {
    pub fn new(interfaces: Vec<InterfaceRecord>) -> Self {
        Self(interfaces)
    }

    pub fn interfaces(&self) -> &[InterfaceRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterfaceRecord> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<InterfaceRecord> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a InterfaceRecord;
    type IntoIter = std::slice::Iter<'a, InterfaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Inventory {
    type Item = InterfaceRecord;
    type IntoIter = std::vec::IntoIter<InterfaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn convert_address(domain: &str, iface: &str, raw: RawAddress) -> Result<AddressRecord> {
    let family = AddressFamily::from_code(raw.family).ok_or_else(|| {
        Error::inventory(
            domain,
            format!("{}: unknown address family {} for {}", iface, raw.family, raw.addr),
        )
    })?;
    let prefix_length = u8::try_from(raw.prefix)
        .ok()
        .filter(|p| *p <= 128)
        .ok_or_else(|| {
            Error::inventory(
                domain,
                format!("{}: prefix {} out of range for {}", iface, raw.prefix, raw.addr),
            )
        })?;

    Ok(AddressRecord {
        address: raw.addr,
        prefix_length,
        family,
    })
}

fn convert_interface(domain: &str, raw: RawInterface) -> Result<InterfaceRecord> {
    let addresses = raw
        .addrs
        .into_iter()
        .map(|addr| convert_address(domain, &raw.name, addr))
        .collect::<Result<Vec<_>>>()?;

    Ok(InterfaceRecord {
        name: raw.name,
        hardware_address: raw.hwaddr,
        addresses,
    })
}

/// Query the interfaces of `domain` and their addresses from `source`.
///
/// An empty inventory is a valid answer: with the guest agent source it
/// means the agent is not installed or not running. Only a failure to
/// communicate with the source is an error. The backend's reply is consumed
/// here; the caller gets owned records.
pub async fn fetch_interfaces(domain: &DomainHandle, source: AddressSource) -> Result<Inventory> {
    let (hypervisor, dom) = domain.live()?;
    let raw = with_deadline(
        Operation::FetchInterfaces,
        domain.call_timeout(),
        hypervisor.interface_addresses(dom, source),
    )
    .await?;

    let interfaces = raw
        .into_iter()
        .map(|iface| convert_interface(&dom.name, iface))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        domain = %dom.name,
        %source,
        interfaces = interfaces.len(),
        "interface addresses fetched"
    );
    Ok(Inventory::new(interfaces))
}
