//! One complete inventory request: connect, resolve, fetch, release.

use crate::config::ClientConfig;
use crate::connection::ConnectionHandle;
use crate::domain::DomainHandle;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::hypervisor::Connector;
use crate::info::{fetch_info, DomainInfo};
use crate::interfaces::{fetch_interfaces, Inventory};
use crate::report;

/// Outcome of [`inspect`].
///
/// The info and inventory queries are independent, so each keeps its own
/// result: a failed inventory query does not discard a good CPU count.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub domain: String,
    pub info: Result<DomainInfo>,
    pub inventory: Result<Inventory>,
}

impl Inspection {
    pub fn is_complete(&self) -> bool {
        self.info.is_ok() && self.inventory.is_ok()
    }

    /// The full report, or the first failed step's error (info first).
    pub fn report(&self) -> Result<String> {
        let info = self.info.as_ref().map_err(Clone::clone)?;
        let inventory = self.inventory.as_ref().map_err(Clone::clone)?;
        Ok(report::format(&self.domain, info, inventory))
    }
}

/// Run a full inventory request for domain `name` on `endpoint`.
///
/// Connection or lookup failures are returned directly. Once the domain is
/// resolved, both queries run concurrently and both finish before the domain
/// handle is released; the connection is closed after that on every path.
/// If the returned future is dropped part way, the handles release on drop.
pub async fn inspect(
    connector: &dyn Connector,
    endpoint: &Endpoint,
    name: &str,
    config: &ClientConfig,
) -> Result<Inspection> {
    let conn = ConnectionHandle::connect(connector, endpoint, config).await?;
    let outcome = inspect_on(&conn, name, config).await;
    conn.close().await;
    outcome
}

async fn inspect_on(conn: &ConnectionHandle, name: &str, config: &ClientConfig) -> Result<Inspection> {
    let domain = DomainHandle::lookup(conn, name).await?;

    let (info, inventory) = tokio::join!(
        fetch_info(&domain),
        fetch_interfaces(&domain, config.address_source),
    );
    if let Err(e) = &info {
        tracing::warn!(domain = name, error = %e, "domain info query failed");
    }
    if let Err(e) = &inventory {
        tracing::warn!(domain = name, error = %e, "interface address query failed");
    }

    domain.release();
    Ok(Inspection {
        domain: name.to_string(),
        info,
        inventory,
    })
}
