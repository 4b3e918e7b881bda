//! Stream-backed transport.

use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

use super::{read_framed, write_framed, Transport};
use crate::remote::error::RpcResult;

/// Transport over any byte stream.
pub struct StreamTransport<S> {
    stream: S,
    read_buf: BytesMut,
}

pub type UnixTransport = StreamTransport<UnixStream>;
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        }
    }
}

impl StreamTransport<UnixStream> {
    pub async fn connect_unix(path: impl AsRef<Path>) -> RpcResult<Self> {
        Ok(Self::new(UnixStream::connect(path).await?))
    }
}

impl StreamTransport<TcpStream> {
    pub async fn connect_tcp(host: &str, port: u16) -> RpcResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, data: &[u8]) -> RpcResult<()> {
        write_framed(&mut self.stream, data).await
    }

    async fn recv(&mut self) -> RpcResult<Bytes> {
        read_framed(&mut self.stream, &mut self.read_buf).await
    }

    async fn close(&mut self) -> RpcResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
