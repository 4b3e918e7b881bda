//! Byte transports carrying framed libvirt packets.
//!
//! - Unix socket (local daemons)
//! - TCP (unencrypted remote daemons)
//! - Any other `AsyncRead + AsyncWrite` stream, e.g. an in-memory pipe

mod stream;

pub use stream::{StreamTransport, TcpTransport, UnixTransport};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::RpcResult;
use super::packet::{PacketError, HEADER_SIZE, MAX_PACKET_SIZE};

/// A duplex channel for whole packets.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded packet (length prefix included).
    async fn send(&mut self, data: &[u8]) -> RpcResult<()>;

    /// Receive one packet body (length prefix stripped).
    async fn recv(&mut self) -> RpcResult<Bytes>;

    /// Shut down the write side.
    async fn close(&mut self) -> RpcResult<()>;
}

/// Read one length-prefixed frame.
async fn read_framed<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut BytesMut) -> RpcResult<Bytes> {
    let total_len = reader.read_u32().await? as usize;
    if total_len > MAX_PACKET_SIZE {
        return Err(PacketError::TooLarge(total_len).into());
    }
    let body_len = total_len.saturating_sub(4);
    if body_len < HEADER_SIZE {
        return Err(PacketError::TooShort(body_len).into());
    }

    buf.clear();
    buf.resize(body_len, 0);
    reader.read_exact(buf).await?;
    Ok(buf.split().freeze())
}

async fn write_framed<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> RpcResult<()> {
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}
