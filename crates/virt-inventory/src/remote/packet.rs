//! libvirt RPC packet encoding/decoding.
//!
//! ```plaintext
//! +------------+------------+------------+------------+
//! | length (4) | program(4) | version(4) |procedure(4)|
//! +------------+------------+------------+------------+
//! |  type (4)  | serial (4) | status (4) |   payload  |
//! +------------+------------+------------+------------+
//! ```
//!
//! All multi-byte values are big-endian. The length counts itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::protocol::{REMOTE_PROGRAM, REMOTE_PROTOCOL_VERSION};

/// Header size in bytes, not counting the length field.
pub const HEADER_SIZE: usize = 24;

/// Maximum packet size (4 MiB).
pub const MAX_PACKET_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    Call = 0,
    Reply = 1,
    /// Asynchronous event.
    Message = 2,
    Stream = 3,
}

impl MessageType {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Call),
            1 => Some(Self::Reply),
            2 => Some(Self::Message),
            3 => Some(Self::Stream),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    Error = 1,
    Continue = 2,
}

impl Status {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Continue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Packet {
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub msg_type: MessageType,
    pub serial: i32,
    pub status: Status,
    pub payload: Bytes,
}

impl Packet {
    pub fn new_call(procedure: u32, serial: i32, payload: Bytes) -> Self {
        Self {
            program: REMOTE_PROGRAM,
            version: REMOTE_PROTOCOL_VERSION,
            procedure,
            msg_type: MessageType::Call,
            serial,
            status: Status::Ok,
            payload,
        }
    }

    /// Encode the packet, length prefix included.
    pub fn encode(&self) -> Result<BytesMut, PacketError> {
        let total_len = 4 + HEADER_SIZE + self.payload.len();
        if total_len > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge(total_len));
        }

        let mut buf = BytesMut::with_capacity(total_len);
        buf.put_u32(total_len as u32);
        buf.put_u32(self.program);
        buf.put_u32(self.version);
        buf.put_u32(self.procedure);
        buf.put_u32(self.msg_type as u32);
        buf.put_i32(self.serial);
        buf.put_u32(self.status as u32);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode a packet body. The input must NOT include the length prefix.
    pub fn decode(mut data: Bytes) -> Result<Self, PacketError> {
        if data.len() < HEADER_SIZE {
            return Err(PacketError::TooShort(data.len()));
        }

        let program = data.get_u32();
        let version = data.get_u32();
        let procedure = data.get_u32();
        let msg_type = data.get_u32();
        let serial = data.get_i32();
        let status = data.get_u32();

        let msg_type =
            MessageType::from_u32(msg_type).ok_or(PacketError::InvalidMessageType(msg_type))?;
        let status = Status::from_u32(status).ok_or(PacketError::InvalidStatus(status))?;

        if program != REMOTE_PROGRAM {
            return Err(PacketError::UnknownProgram(program));
        }

        Ok(Self {
            program,
            version,
            procedure,
            msg_type,
            serial,
            status,
            payload: data,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),
    #[error("invalid message type: {0}")]
    InvalidMessageType(u32),
    #[error("invalid status: {0}")]
    InvalidStatus(u32),
    #[error("unknown program: {0:#x}")]
    UnknownProgram(u32),
    #[error("packet too large: {0} bytes")]
    TooLarge(usize),
}
