//! A scripted libvirt daemon speaking the remote protocol over an in-memory
//! stream.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use virt_inventory::remote::protocol::{
    self, auth_type, error_code, procedure, DomainInterface, DomainIpAddr, RemoteError,
    RemoteNonnullDomain, REMOTE_PROGRAM, REMOTE_PROTOCOL_VERSION,
};
use virt_inventory::remote::transport::StreamTransport;
use virt_inventory::remote::{RemoteHypervisor, HEADER_SIZE};
use virt_inventory::{Connector, Endpoint, Error, Hypervisor, Result, Uuid};

const MSG_REPLY: u32 = 1;
const MSG_EVENT: u32 = 2;
const STATUS_OK: u32 = 0;
const STATUS_ERROR: u32 = 1;
/// `VIR_FROM_QEMU`
const FROM_QEMU: i32 = 10;

#[derive(Debug, Clone)]
pub struct DaemonDomain {
    pub name: String,
    pub id: i32,
    pub uuid: Uuid,
    pub nr_virt_cpu: u16,
    /// Interfaces, or the error code the daemon replies with.
    pub interfaces: std::result::Result<Vec<DomainInterface>, i32>,
}

impl DaemonDomain {
    pub fn new(name: &str, nr_virt_cpu: u16) -> Self {
        Self {
            name: name.to_string(),
            id: 3,
            uuid: Uuid([0x5a; 16]),
            nr_virt_cpu,
            interfaces: Ok(Vec::new()),
        }
    }

    pub fn with_interface(mut self, name: &str, hwaddr: Option<&str>, addrs: &[(i32, &str, u32)]) -> Self {
        if let Ok(ifaces) = &mut self.interfaces {
            ifaces.push(DomainInterface {
                name: name.to_string(),
                hwaddr: hwaddr.map(str::to_string),
                addrs: addrs
                    .iter()
                    .map(|(kind, addr, prefix)| DomainIpAddr {
                        kind: *kind,
                        addr: addr.to_string(),
                        prefix: *prefix,
                    })
                    .collect(),
            });
        }
        self
    }

    pub fn with_interface_error(mut self, code: i32) -> Self {
        self.interfaces = Err(code);
        self
    }
}

/// What the daemon saw.
#[derive(Debug, Default)]
pub struct Journal {
    pub procedures: Vec<u32>,
    pub opened: Option<Option<String>>,
    pub sources: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct FakeDaemon {
    pub auth_types: Vec<i32>,
    pub domains: Vec<DaemonDomain>,
    /// Send an event before every reply.
    pub chatty: bool,
    pub journal: Arc<Mutex<Journal>>,
}

impl FakeDaemon {
    pub fn new(domains: Vec<DaemonDomain>) -> Self {
        Self {
            auth_types: vec![auth_type::NONE],
            domains,
            chatty: false,
            journal: Arc::default(),
        }
    }

    pub fn procedures(&self) -> Vec<u32> {
        self.journal.lock().unwrap().procedures.clone()
    }

    /// Serve one client until it hangs up.
    pub fn spawn(&self, mut stream: DuplexStream) -> JoinHandle<()> {
        let daemon = self.clone();
        tokio::spawn(async move {
            while let Some((proc_, serial, args)) = read_call(&mut stream).await {
                if daemon.chatty {
                    write_message(&mut stream, MSG_EVENT, 0, STATUS_OK, &[]).await;
                }
                match daemon.handle(proc_, args) {
                    Ok(ret) => write_message(&mut stream, MSG_REPLY, serial, STATUS_OK, &ret).await,
                    Err(err) => {
                        let payload = virt_inventory_xdr::to_bytes(&err).unwrap();
                        write_message(&mut stream, MSG_REPLY, serial, STATUS_ERROR, &payload).await
                    }
                }
            }
        })
    }

    /// Connect a fresh client session to this daemon.
    pub async fn connect(&self, name: Option<String>) -> virt_inventory::remote::RpcResult<RemoteHypervisor> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        self.spawn(server);
        RemoteHypervisor::over_transport(StreamTransport::new(client), name).await
    }

    fn handle(&self, proc_: u32, args: Bytes) -> std::result::Result<Vec<u8>, RemoteError> {
        self.journal.lock().unwrap().procedures.push(proc_);
        match proc_ {
            procedure::AUTH_LIST => reply(&protocol::AuthListRet {
                types: self.auth_types.clone(),
            }),
            procedure::AUTH_POLKIT => reply(&protocol::AuthPolkitRet { complete: 1 }),
            procedure::CONNECT_OPEN => {
                let args: protocol::ConnectOpenArgs = decode(&args);
                self.journal.lock().unwrap().opened = Some(args.name);
                Ok(Vec::new())
            }
            procedure::CONNECT_CLOSE => Ok(Vec::new()),
            procedure::DOMAIN_LOOKUP_BY_NAME => {
                let args: protocol::DomainLookupByNameArgs = decode(&args);
                let dom = self.find(&args.name)?;
                reply(&protocol::DomainLookupByNameRet { dom: wire(dom) })
            }
            procedure::DOMAIN_GET_INFO => {
                let args: protocol::DomainGetInfoArgs = decode(&args);
                let dom = self.find(&args.dom.name)?;
                reply(&protocol::DomainGetInfoRet {
                    state: 1,
                    max_mem: 4_194_304,
                    memory: 2_097_152,
                    nr_virt_cpu: dom.nr_virt_cpu,
                    cpu_time: 42_000_000_000,
                })
            }
            procedure::DOMAIN_INTERFACE_ADDRESSES => {
                let args: protocol::DomainInterfaceAddressesArgs = decode(&args);
                self.journal.lock().unwrap().sources.push(args.source);
                let dom = self.find(&args.dom.name)?;
                match &dom.interfaces {
                    Ok(ifaces) => reply(&protocol::DomainInterfaceAddressesRet {
                        ifaces: ifaces.clone(),
                    }),
                    Err(code) => Err(remote_error(*code, "guest agent is not available")),
                }
            }
            other => Err(remote_error(1, &format!("unsupported procedure {}", other))),
        }
    }

    fn find(&self, name: &str) -> std::result::Result<&DaemonDomain, RemoteError> {
        self.domains
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                remote_error(
                    error_code::NO_DOMAIN,
                    &format!("Domain not found: no domain with matching name '{}'", name),
                )
            })
    }
}

/// Opens sessions against a [`FakeDaemon`].
pub struct DaemonConnector(pub FakeDaemon);

#[async_trait]
impl Connector for DaemonConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn Hypervisor>> {
        let hypervisor = self
            .0
            .connect(Some(endpoint.to_string()))
            .await
            .map_err(|e| Error::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(hypervisor))
    }
}

fn wire(dom: &DaemonDomain) -> RemoteNonnullDomain {
    RemoteNonnullDomain {
        name: dom.name.clone(),
        uuid: dom.uuid,
        id: dom.id,
    }
}

fn remote_error(code: i32, message: &str) -> RemoteError {
    RemoteError {
        code,
        domain: FROM_QEMU,
        message: Some(message.to_string()),
        level: 2,
        ..Default::default()
    }
}

fn reply<T: Serialize>(ret: &T) -> std::result::Result<Vec<u8>, RemoteError> {
    Ok(virt_inventory_xdr::to_bytes(ret).unwrap())
}

fn decode<T: DeserializeOwned>(args: &[u8]) -> T {
    virt_inventory_xdr::from_bytes(args).unwrap()
}

async fn read_call(stream: &mut DuplexStream) -> Option<(u32, i32, Bytes)> {
    let len = stream.read_u32().await.ok()? as usize;
    let mut body = vec![0u8; len - 4];
    stream.read_exact(&mut body).await.ok()?;

    let mut body = Bytes::from(body);
    assert_eq!(body.get_u32(), REMOTE_PROGRAM);
    assert_eq!(body.get_u32(), REMOTE_PROTOCOL_VERSION);
    let procedure = body.get_u32();
    body.advance(4);
    let serial = body.get_i32();
    body.advance(4);
    Some((procedure, serial, body))
}

async fn write_message(stream: &mut DuplexStream, msg_type: u32, serial: i32, status: u32, payload: &[u8]) {
    let mut frame = BytesMut::with_capacity(4 + HEADER_SIZE + payload.len());
    frame.put_u32((4 + HEADER_SIZE + payload.len()) as u32);
    frame.put_u32(REMOTE_PROGRAM);
    frame.put_u32(REMOTE_PROTOCOL_VERSION);
    frame.put_u32(0);
    frame.put_u32(msg_type);
    frame.put_i32(serial);
    frame.put_u32(status);
    frame.put_slice(payload);
    // The client may already be gone.
    let _ = stream.write_all(&frame).await;
}
