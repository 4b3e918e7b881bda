//! Domain runtime information.

use std::fmt;

use crate::domain::DomainHandle;
use crate::error::{with_deadline, Error, Operation, Result};
use crate::hypervisor::RawDomainInfo;

/// Run state of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainState {
    Running,
    Blocked,
    Paused,
    Shutdown,
    Shutoff,
    Crashed,
    Unknown,
}

impl DomainState {
    /// Map a libvirt `virDomainState` code.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => DomainState::Running,
            2 => DomainState::Blocked,
            // PMSUSPENDED is a guest-initiated pause.
            3 | 7 => DomainState::Paused,
            4 => DomainState::Shutdown,
            5 => DomainState::Shutoff,
            6 => DomainState::Crashed,
            _ => DomainState::Unknown,
        }
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DomainState::Running => "running",
            DomainState::Blocked => "blocked",
            DomainState::Paused => "paused",
            DomainState::Shutdown => "in shutdown",
            DomainState::Shutoff => "shut off",
            DomainState::Crashed => "crashed",
            DomainState::Unknown => "unknown",
        })
    }
}

/// Snapshot of a domain's runtime information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainInfo {
    pub virtual_cpu_count: u32,
    /// Current memory in KiB.
    pub memory_kb: u64,
    /// Memory ceiling in KiB.
    pub max_memory_kb: u64,
    /// Cumulative CPU time in nanoseconds.
    pub cpu_time_ns: u64,
    pub state: DomainState,
}

impl DomainInfo {
    /// Validate a raw backend reply. Any negative field is an error sentinel.
    fn from_raw(domain: &str, raw: RawDomainInfo) -> Result<Self> {
        let sentinel = |field: &str| Error::info(domain, format!("backend reported invalid {}", field));

        Ok(Self {
            virtual_cpu_count: u32::try_from(raw.nr_virt_cpu).map_err(|_| sentinel("CPU count"))?,
            memory_kb: u64::try_from(raw.memory_kb).map_err(|_| sentinel("memory"))?,
            max_memory_kb: u64::try_from(raw.max_memory_kb).map_err(|_| sentinel("max memory"))?,
            cpu_time_ns: u64::try_from(raw.cpu_time_ns).map_err(|_| sentinel("CPU time"))?,
            state: DomainState::from_code(raw.state),
        })
    }
}

/// Query runtime information for `domain`.
///
/// Every call queries the hypervisor again; nothing is cached.
pub async fn fetch_info(domain: &DomainHandle) -> Result<DomainInfo> {
    let (hypervisor, dom) = domain.live()?;
    let raw = with_deadline(
        Operation::FetchInfo,
        domain.call_timeout(),
        hypervisor.domain_info(dom),
    )
    .await?;

    let info = DomainInfo::from_raw(&dom.name, raw)?;
    tracing::debug!(
        domain = %dom.name,
        vcpus = info.virtual_cpu_count,
        memory_kb = info.memory_kb,
        state = %info.state,
        "domain info fetched"
    );
    Ok(info)
}
