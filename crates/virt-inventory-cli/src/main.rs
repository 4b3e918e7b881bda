//! `virt-inventory URI NAME`: print a domain's interfaces and CPU count.
//!
//! Exit status is 0 only when the full report was printed. Each failure kind
//! has its own non-zero status; see [`exit_code`].

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use virt_inventory::{
    inspect, report, AddressSource, ClientConfig, Endpoint, Error, ErrorKind, Inspection,
    RemoteConnector,
};

/// Show the CPU count and network interface addresses of a domain.
#[derive(Debug, Parser)]
#[command(name = "virt-inventory", version)]
struct Cli {
    /// Hypervisor URI, e.g. qemu:///system or qemu+tcp://host/system
    uri: String,

    /// Domain name
    name: String,

    /// Seconds allowed for connecting and authenticating
    #[arg(long, value_name = "SECS", env = "VIRT_INVENTORY_CONNECT_TIMEOUT", default_value_t = 30)]
    connect_timeout: u64,

    /// Seconds allowed for each query
    #[arg(long, value_name = "SECS", env = "VIRT_INVENTORY_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Address source: agent, lease or arp
    #[arg(long, env = "VIRT_INVENTORY_SOURCE", default_value = "agent")]
    source: AddressSource,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_call_timeout(Duration::from_secs(self.timeout))
            .with_address_source(self.source)
    }
}

const EXIT_USAGE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Connection => 2,
        ErrorKind::Timeout => 3,
        ErrorKind::DomainNotFound => 4,
        ErrorKind::ConnectionClosed => 5,
        ErrorKind::InvalidHandle => 6,
        ErrorKind::InfoUnavailable => 7,
        ErrorKind::InventoryUnavailable => 8,
    }
}

fn fail(err: &Error) -> ExitCode {
    eprintln!("error: {}", err);
    ExitCode::from(exit_code(err.kind()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn finish(inspection: Inspection) -> ExitCode {
    match inspection.report() {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            // The steps are independent: a good CPU count is still shown.
            if let Ok(info) = &inspection.info {
                println!("{}", report::format_cpu_line(&inspection.domain, info));
            }
            fail(&e)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing();

    let endpoint = match Endpoint::new(cli.uri.as_str()) {
        Ok(endpoint) => endpoint,
        Err(e) => return fail(&e),
    };
    let config = cli.config();
    tracing::debug!(%endpoint, domain = %cli.name, ?config, "starting inventory request");

    tokio::select! {
        outcome = inspect(&RemoteConnector, &endpoint, &cli.name, &config) => match outcome {
            Ok(inspection) => finish(inspection),
            Err(e) => fail(&e),
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
