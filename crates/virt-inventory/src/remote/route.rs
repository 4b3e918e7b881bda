//! Mapping libvirt URIs onto transports.

use std::path::PathBuf;

use url::{Host, Url};

use super::error::{RpcError, RpcResult};

/// System daemon socket.
pub const SYSTEM_SOCKET_PATH: &str = "/var/run/libvirt/libvirt-sock";

/// Session daemon socket, relative to `XDG_RUNTIME_DIR`.
pub const SESSION_SOCKET_PATH: &str = "libvirt/libvirt-sock";

/// Default port of an unencrypted remote daemon.
pub const DEFAULT_TCP_PORT: u16 = 16509;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

/// Where to connect and what to ask the daemon to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub route: Route,
    /// URI passed to `CONNECT_OPEN`, with transport and host stripped.
    /// `None` lets the daemon pick its default driver.
    pub name: Option<String>,
}

/// Resolve a libvirt URI.
///
/// Accepts `driver:///path`, `driver+unix:///path[?socket=...]`,
/// `driver+tcp://host[:port]/path`, and raw socket paths (`/path` or
/// `unix:///path`).
pub fn resolve(uri: &str) -> RpcResult<Target> {
    if let Some(path) = uri.strip_prefix("unix://") {
        return Ok(Target {
            route: Route::Unix(PathBuf::from(path)),
            name: None,
        });
    }
    if uri.starts_with('/') {
        return Ok(Target {
            route: Route::Unix(PathBuf::from(uri)),
            name: None,
        });
    }

    let url = Url::parse(uri).map_err(|e| RpcError::UnsupportedUri(format!("{}: {}", uri, e)))?;
    let (driver, transport) = match url.scheme().split_once('+') {
        Some((driver, transport)) => (driver, Some(transport)),
        None => (url.scheme(), None),
    };
    let host = match url.host() {
        Some(Host::Domain(d)) if !d.is_empty() => Some(d.to_string()),
        Some(Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => Some(addr.to_string()),
        _ => None,
    };
    let name = Some(format!("{}://{}", driver, url.path()));

    let route = match (transport, host) {
        (None | Some("unix"), None) => {
            let socket = url
                .query_pairs()
                .find(|(key, _)| key == "socket")
                .map(|(_, value)| PathBuf::from(value.as_ref()))
                .unwrap_or_else(|| default_socket(url.path()));
            Route::Unix(socket)
        }
        (Some("tcp"), Some(host)) => Route::Tcp {
            host,
            port: url.port().unwrap_or(DEFAULT_TCP_PORT),
        },
        (Some("tcp"), None) => {
            return Err(RpcError::UnsupportedUri(format!("{}: tcp transport needs a host", uri)))
        }
        // A bare remote host means TLS, which is not supported.
        (None, Some(_)) => {
            return Err(RpcError::UnsupportedUri(format!("{}: tls transport is not supported", uri)))
        }
        (Some(other), _) => {
            return Err(RpcError::UnsupportedUri(format!(
                "{}: {} transport is not supported",
                uri, other
            )))
        }
    };

    Ok(Target { route, name })
}

fn default_socket(path: &str) -> PathBuf {
    if path.trim_end_matches('/').ends_with("/session") {
        let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(runtime_dir).join(SESSION_SOCKET_PATH)
    } else {
        PathBuf::from(SYSTEM_SOCKET_PATH)
    }
}
