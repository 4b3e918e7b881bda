//! In-memory hypervisor used by the integration tests.

#![allow(dead_code)]

pub mod daemon;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use virt_inventory::{
    AddressSource, Connector, DomainRef, Endpoint, Error, Hypervisor, RawAddress, RawDomainInfo,
    RawInterface, Result, Uuid,
};

/// Which verb never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stall {
    Connect,
    Lookup,
    Info,
    Interfaces,
    Close,
}

#[derive(Debug, Clone)]
pub struct FakeDomain {
    pub name: String,
    pub info: RawDomainInfo,
    pub interfaces: Vec<RawInterface>,
    /// Reported instead of the interfaces.
    pub inventory_error: Option<String>,
}

impl FakeDomain {
    pub fn new(name: &str, vcpus: i32) -> Self {
        Self {
            name: name.to_string(),
            info: RawDomainInfo {
                state: 1,
                max_memory_kb: 2_097_152,
                memory_kb: 2_097_152,
                nr_virt_cpu: vcpus,
                cpu_time_ns: 1_000_000,
            },
            interfaces: Vec::new(),
            inventory_error: None,
        }
    }

    pub fn with_interface(mut self, name: &str, hwaddr: Option<&str>, addrs: &[(i32, &str, u32)]) -> Self {
        self.interfaces.push(RawInterface {
            name: name.to_string(),
            hwaddr: hwaddr.map(str::to_string),
            addrs: addrs
                .iter()
                .map(|(family, addr, prefix)| RawAddress {
                    family: *family,
                    addr: addr.to_string(),
                    prefix: *prefix,
                })
                .collect(),
        });
        self
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub lookups: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub interface_calls: AtomicUsize,
    pub closes: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    pub domains: Vec<FakeDomain>,
    pub unreachable: bool,
    pub stall: Option<Stall>,
    pub counters: Arc<Counters>,
}

impl FakeConnector {
    pub fn with_domains(domains: Vec<FakeDomain>) -> Self {
        Self {
            domains,
            ..Default::default()
        }
    }

    pub fn stalling(mut self, stall: Stall) -> Self {
        self.stall = Some(stall);
        self
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Hypervisor>> {
        if self.unreachable {
            return Err(Error::Connection {
                endpoint: endpoint.to_string(),
                reason: "Connection refused".into(),
            });
        }
        if self.stall == Some(Stall::Connect) {
            std::future::pending::<()>().await;
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            domains: self.domains.clone(),
            stall: self.stall,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    domains: Vec<FakeDomain>,
    stall: Option<Stall>,
    counters: Arc<Counters>,
}

impl FakeSession {
    async fn stall_on(&self, verb: Stall) {
        if self.stall == Some(verb) {
            std::future::pending::<()>().await;
        }
    }

    fn find(&self, name: &str) -> Option<&FakeDomain> {
        self.domains.iter().find(|d| d.name == name)
    }
}

#[async_trait]
impl Hypervisor for FakeSession {
    async fn lookup_domain(&self, name: &str) -> Result<DomainRef> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        self.stall_on(Stall::Lookup).await;
        let domain = self
            .find(name)
            .ok_or_else(|| Error::DomainNotFound(name.to_string()))?;
        Ok(DomainRef {
            name: domain.name.clone(),
            uuid: Uuid([0x11; 16]),
            id: 1,
        })
    }

    async fn domain_info(&self, domain: &DomainRef) -> Result<RawDomainInfo> {
        self.counters.info_calls.fetch_add(1, Ordering::SeqCst);
        self.stall_on(Stall::Info).await;
        self.find(&domain.name)
            .map(|d| d.info)
            .ok_or_else(|| Error::InfoUnavailable {
                domain: domain.name.clone(),
                reason: "domain vanished".into(),
            })
    }

    async fn interface_addresses(
        &self,
        domain: &DomainRef,
        _source: AddressSource,
    ) -> Result<Vec<RawInterface>> {
        self.counters.interface_calls.fetch_add(1, Ordering::SeqCst);
        self.stall_on(Stall::Interfaces).await;
        let found = self.find(&domain.name).ok_or_else(|| Error::InventoryUnavailable {
            domain: domain.name.clone(),
            reason: "domain vanished".into(),
        })?;
        match &found.inventory_error {
            Some(reason) => Err(Error::InventoryUnavailable {
                domain: domain.name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(found.interfaces.clone()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.stall_on(Stall::Close).await;
        Ok(())
    }

    fn disconnect(&self) {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// A domain with two CPUs and one configured interface.
pub fn web1() -> FakeDomain {
    FakeDomain::new("web1", 2).with_interface(
        "eth0",
        Some("52:54:00:aa:bb:cc"),
        &[(0, "192.168.1.10", 24)],
    )
}

pub fn endpoint() -> Endpoint {
    Endpoint::new("test:///default").unwrap()
}
