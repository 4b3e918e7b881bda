//! RPC client for a libvirt daemon.
//!
//! This module handles:
//! - Serial number generation
//! - Request/response matching
//! - The background I/O task and its teardown

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::error::{RpcError, RpcResult};
use super::packet::{MessageType, Packet, Status};
use super::transport::Transport;

type ReplySender = oneshot::Sender<RpcResult<Bytes>>;
type Pending = DashMap<i32, ReplySender>;

/// Multiplexes calls over one transport.
///
/// Dropping the client aborts its I/O task, which closes the transport and
/// fails every outstanding call with [`RpcError::Closed`].
pub struct RpcClient {
    serial: AtomicU32,
    tx: mpsc::Sender<Outgoing>,
    pending: Arc<Pending>,
    aborted: AtomicBool,
    io: JoinHandle<()>,
}

struct Outgoing {
    serial: i32,
    frame: BytesMut,
}

/// Removes a pending entry if the caller stops waiting (timeout, cancellation).
struct PendingGuard<'a> {
    pending: &'a Pending,
    serial: i32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.serial);
    }
}

impl RpcClient {
    /// Start the I/O task on `transport`. Must be called within a Tokio runtime.
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let pending = Arc::new(Pending::new());
        let io = tokio::spawn(io_task(transport, rx, Arc::clone(&pending)));

        Self {
            serial: AtomicU32::new(1),
            tx,
            pending,
            aborted: AtomicBool::new(false),
            io,
        }
    }

    /// Make an RPC call with a raw payload.
    pub async fn call(&self, procedure: u32, payload: Bytes) -> RpcResult<Bytes> {
        let serial = self.serial.fetch_add(1, Ordering::Relaxed) as i32;
        let frame = Packet::new_call(procedure, serial, payload)
            .encode()
            .map_err(RpcError::Request)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(serial, reply_tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            serial,
        };
        if self.aborted.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        tracing::trace!(procedure, serial, "rpc call");
        self.tx
            .send(Outgoing { serial, frame })
            .await
            .map_err(|_| RpcError::Closed)?;

        reply_rx.await.map_err(|_| RpcError::Closed)?
    }

    /// Make a call with XDR-encoded arguments and reply.
    pub async fn call_xdr<Req, Resp>(&self, procedure: u32, args: &Req) -> RpcResult<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let payload = virt_inventory_xdr::to_bytes(args)?;
        let reply = self.call(procedure, Bytes::from(payload)).await?;
        Ok(virt_inventory_xdr::from_bytes(&reply)?)
    }

    /// Make a call whose arguments and reply are both void.
    pub async fn call_void(&self, procedure: u32) -> RpcResult<()> {
        self.call(procedure, Bytes::new()).await?;
        Ok(())
    }

    /// Whether the I/O task has stopped.
    pub fn is_closed(&self) -> bool {
        self.aborted.load(Ordering::SeqCst) || self.io.is_finished() || self.tx.is_closed()
    }

    /// Stop the I/O task now. Outstanding and future calls fail with
    /// [`RpcError::Closed`].
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.io.abort();
        // The aborted task never reaches its own cleanup.
        self.pending.clear();
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Background task: write each call, then read until its reply arrives.
///
/// Async event messages arriving in between are skipped.
async fn io_task<T: Transport>(mut transport: T, mut rx: mpsc::Receiver<Outgoing>, pending: Arc<Pending>) {
    if let Err(e) = pump(&mut transport, &mut rx, &pending).await {
        tracing::error!(error = %e, "libvirt connection I/O failed");
    }
    rx.close();
    // Dropping the reply senders wakes every waiter with `Closed`.
    pending.clear();
    if let Err(e) = transport.close().await {
        tracing::debug!(error = %e, "transport shutdown failed");
    }
}

async fn pump<T: Transport>(
    transport: &mut T,
    rx: &mut mpsc::Receiver<Outgoing>,
    pending: &Pending,
) -> RpcResult<()> {
    while let Some(out) = rx.recv().await {
        if let Err(e) = transport.send(&out.frame).await {
            fail(pending, out.serial, RpcError::Closed);
            return Err(e);
        }

        loop {
            let packet = match transport.recv().await.and_then(|data| Ok(Packet::decode(data)?)) {
                Ok(packet) => packet,
                Err(e) => {
                    fail(pending, out.serial, RpcError::Closed);
                    return Err(e);
                }
            };

            if packet.msg_type != MessageType::Reply {
                tracing::trace!(
                    procedure = packet.procedure,
                    msg_type = ?packet.msg_type,
                    "skipping unsolicited message"
                );
                continue;
            }

            let result = match packet.status {
                Status::Ok => Ok(packet.payload),
                Status::Error => Err(RpcError::from_reply(&packet.payload)),
                Status::Continue => Err(RpcError::Protocol(format!(
                    "unexpected stream continuation for serial {}",
                    packet.serial
                ))),
            };
            match pending.remove(&packet.serial) {
                Some((_, reply_tx)) => {
                    let _ = reply_tx.send(result);
                }
                None => tracing::debug!(serial = packet.serial, "reply for abandoned call"),
            }
            if packet.serial == out.serial {
                break;
            }
        }
    }
    Ok(())
}

fn fail(pending: &Pending, serial: i32, err: RpcError) {
    if let Some((_, reply_tx)) = pending.remove(&serial) {
        let _ = reply_tx.send(Err(err));
    }
}
