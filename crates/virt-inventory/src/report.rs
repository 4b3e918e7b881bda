//! Plain-text inventory reports.
//!
//! The layout is fixed so reports can be compared byte for byte:
//!
//! ```plaintext
//! name: eth0 hwaddr: 52:54:00:aa:bb:cc[addr: 192.168.1.10 prefix: 24 type: 0]
//! name: lo[addr: 127.0.0.1 prefix: 8 type: 0][addr: ::1 prefix: 128 type: 1]
//! Domain web1: 2 CPUs
//! ```
//!
//! One line per interface in inventory order, then the CPU line. `type` is
//! the address family code (0 IPv4, 1 IPv6).

use std::fmt::Write;

use crate::info::DomainInfo;
use crate::interfaces::{InterfaceRecord, Inventory};

/// Render the full report. Never fails; an empty inventory renders no
/// interface lines.
pub fn format(name: &str, info: &DomainInfo, inventory: &Inventory) -> String {
    let mut out = String::new();
    for iface in inventory {
        out.push_str(&format_interface(iface));
        out.push('\n');
    }
    out.push_str(&format_cpu_line(name, info));
    out.push('\n');
    out
}

/// A single interface line, without the trailing newline.
pub fn format_interface(iface: &InterfaceRecord) -> String {
    let mut line = format!("name: {}", iface.name);
    if let Some(hwaddr) = &iface.hardware_address {
        // Infallible: writing to a String.
        let _ = write!(line, " hwaddr: {}", hwaddr);
    }
    for addr in &iface.addresses {
        let _ = write!(
            line,
            "[addr: {} prefix: {} type: {}]",
            addr.address,
            addr.prefix_length,
            addr.family.code()
        );
    }
    line
}

/// The CPU summary line, without the trailing newline.
pub fn format_cpu_line(name: &str, info: &DomainInfo) -> String {
    format!("Domain {}: {} CPUs", name, info.virtual_cpu_count)
}
