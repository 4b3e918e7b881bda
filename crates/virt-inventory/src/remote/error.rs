//! Wire-level errors of the remote backend.

use super::packet::PacketError;
use super::protocol::RemoteError;

/// Result type for remote protocol operations.
pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Errors raised while talking to a libvirt daemon.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// XDR serialization/deserialization error.
    #[error("XDR error: {0}")]
    Xdr(#[from] virt_inventory_xdr::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Packet parsing error.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// The call could not be encoded; nothing was sent.
    #[error("invalid request: {0}")]
    Request(PacketError),

    /// The connection's I/O task has stopped.
    #[error("connection closed")]
    Closed,

    /// Error reply from the daemon.
    #[error("remote error {code}: {message}")]
    Remote {
        code: i32,
        domain: i32,
        message: String,
    },

    /// URI that cannot be routed to a supported transport.
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),

    /// Authentication failed or needs an unsupported mechanism.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The peer violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RpcError {
    /// Build an error from the payload of an error reply.
    ///
    /// Falls back to the raw bytes as text if the payload does not decode.
    pub fn from_reply(payload: &[u8]) -> Self {
        match virt_inventory_xdr::from_prefix::<RemoteError>(payload) {
            Ok(err) => RpcError::Remote {
                code: err.code,
                domain: err.domain,
                message: err
                    .message
                    .unwrap_or_else(|| format!("unknown error (code {})", err.code)),
            },
            Err(_) => RpcError::Remote {
                code: -1,
                domain: -1,
                message: String::from_utf8_lossy(payload).into_owned(),
            },
        }
    }

    /// libvirt error code, if this is an error reply.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            RpcError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the connection itself is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RpcError::Closed | RpcError::Io(_) | RpcError::Packet(_))
    }
}
