//! Virtualization inventory client core.
//!
//! Opens a connection to a hypervisor management service, resolves a domain
//! by name, and collects its runtime information (CPU count, memory, state)
//! together with the network interfaces and addresses reported for it.
//!
//! Every remote resource is an owned handle with an idempotent release path,
//! and dropping a handle releases it, so no exit path can leak one.
//!
//! # Example
//!
//! ```ignore
//! use virt_inventory::{inspect, ClientConfig, Endpoint, RemoteConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Endpoint::new("qemu:///system")?;
//!     let inspection = inspect(
//!         &RemoteConnector,
//!         &endpoint,
//!         "web1",
//!         &ClientConfig::default(),
//!     )
//!     .await?;
//!
//!     print!("{}", inspection.report()?);
//!     Ok(())
//! }
//! ```
//!
//! The lower-level steps are available individually:
//!
//! ```ignore
//! let conn = ConnectionHandle::connect(&RemoteConnector, &endpoint, &config).await?;
//! let domain = DomainHandle::lookup(&conn, "web1").await?;
//! let info = fetch_info(&domain).await?;
//! let inventory = fetch_interfaces(&domain, AddressSource::GuestAgent).await?;
//! domain.release();
//! conn.close().await;
//! ```

mod config;
mod connection;
mod domain;
mod endpoint;
mod error;
mod hypervisor;
mod info;
mod interfaces;
pub mod remote;
pub mod report;
mod session;

pub use config::ClientConfig;
pub use connection::{ConnectionHandle, ConnectionState};
pub use domain::{DomainHandle, DomainHandleState};
pub use endpoint::Endpoint;
pub use error::{Error, ErrorKind, Operation, Result};
pub use hypervisor::{Connector, DomainRef, Hypervisor, RawAddress, RawDomainInfo, RawInterface};
pub use info::{fetch_info, DomainInfo, DomainState};
pub use interfaces::{
    fetch_interfaces, AddressFamily, AddressRecord, AddressSource, InterfaceRecord, Inventory,
    ParseAddressSourceError,
};
pub use remote::RemoteConnector;
pub use session::{inspect, Inspection};
pub use virt_inventory_xdr::Uuid;
