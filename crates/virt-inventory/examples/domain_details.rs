//! Example: Show one domain's details from every address source.
//!
//! Usage: `cargo run --example domain_details -- [URI] NAME`
//!
//! Walks the handle API step by step instead of using `inspect`.

use virt_inventory::{
    fetch_info, fetch_interfaces, report, AddressSource, ClientConfig, ConnectionHandle,
    DomainHandle, Endpoint, RemoteConnector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let name = args.pop().ok_or("usage: domain_details [URI] NAME")?;
    let uri = args.pop().unwrap_or_else(|| "qemu:///system".to_string());

    println!("=== virt-inventory Domain Details ===\n");

    let endpoint = Endpoint::new(uri)?;
    let config = ClientConfig::default();
    let conn = match ConnectionHandle::connect(&RemoteConnector, &endpoint, &config).await {
        Ok(conn) => {
            println!("[OK] Connected to {}", endpoint);
            conn
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            eprintln!("\nPlease make sure libvirtd is running:");
            eprintln!("  sudo systemctl start libvirtd");
            return Err(e.into());
        }
    };

    let domain = match DomainHandle::lookup(&conn, &name).await {
        Ok(domain) => domain,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            conn.close().await;
            return Err(e.into());
        }
    };
    println!("  Name: {}", domain.name());
    println!("  UUID: {}", domain.uuid());
    match domain.id() {
        Some(id) => println!("  ID: {}", id),
        None => println!("  ID: inactive"),
    }

    match fetch_info(&domain).await {
        Ok(info) => {
            println!("  State: {}", info.state);
            println!("  CPUs: {}", info.virtual_cpu_count);
            println!("  Memory: {} / {} KiB", info.memory_kb, info.max_memory_kb);
            println!("  CPU time: {} ns", info.cpu_time_ns);
        }
        Err(e) => println!("  Info: (failed to get: {})", e),
    }

    for source in [AddressSource::GuestAgent, AddressSource::Lease, AddressSource::ArpTable] {
        println!("\n=== Interfaces ({}) ===\n", source);
        match fetch_interfaces(&domain, source).await {
            Ok(inventory) if inventory.is_empty() => println!("(none reported)"),
            Ok(inventory) => {
                for iface in &inventory {
                    println!("{}", report::format_interface(iface));
                }
            }
            Err(e) => println!("(failed to get: {})", e),
        }
    }

    domain.release();
    conn.close().await;

    println!("\n=== Done ===");
    Ok(())
}
