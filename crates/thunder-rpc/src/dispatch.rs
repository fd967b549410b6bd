//! Per-connection dispatch engine.
//!
//! The engine is shared by both peers (symmetric RPC): a client and a
//! server differ only in who dials, which handler table is consulted, and
//! whether an unhandled request code earns a synthesized reply. Each
//! connection gets one serial receive task that reads frames in wire
//! order; decoded packets are classified as responses (resolve the pending
//! future) or requests (run the registered processor) and the actual work
//! runs on the bounded worker pool.

use std::{
    collections::HashMap,
    net::SocketAddr,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, RwLock},
    time::Duration,
};

use bytes::Bytes;
use thunder_proto::{CODE_NOT_SUPPORTED, CodecType, Packet, codec};
use tokio::net::tcp::OwnedReadHalf;
use tracing::{debug, error, warn};

use crate::{
    connection::{Connection, read_frame},
    error::{Result, RpcError},
    future::{ResponseCallback, ResponseFuture},
    pool::WorkerPool,
    table::ResponseTable,
};

/// Inbound request processor, registered by operation code.
///
/// Receives the decoded packet and the remote address; returning `Some`
/// sends the packet back as the response (unless the request was oneway).
pub type Processor = Arc<dyn Fn(Packet, SocketAddr) -> Option<Packet> + Send + Sync + 'static>;

/// Which side of the connection this dispatcher serves.
///
/// A server with no processor for a request code synthesizes a
/// [`CODE_NOT_SUPPORTED`] reply; a client logs and drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Accepting side.
    Server,
    /// Dialing side.
    Client,
}

/// Shared request/response state machine for one peer.
pub struct Dispatcher {
    role: PeerRole,
    codec: CodecType,
    processors: RwLock<HashMap<i16, Processor>>,
    // Shared with the async-invoke watchdog tasks.
    table: Arc<ResponseTable>,
    pool: WorkerPool,
}

impl Dispatcher {
    pub(crate) fn new(role: PeerRole, codec: CodecType, worker_limit: usize) -> Self {
        Self {
            role,
            codec,
            processors: RwLock::new(HashMap::new()),
            table: Arc::new(ResponseTable::new()),
            pool: WorkerPool::new(worker_limit),
        }
    }

    /// Register a processor for an operation code.
    ///
    /// Intended to be called during setup, before traffic flows; the table
    /// is read concurrently during dispatch and registration is not
    /// synchronized with in-flight lookups.
    pub(crate) fn register_processor(&self, code: i16, processor: Processor) {
        self.processors
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(code, processor);
    }

    pub(crate) fn pending_requests(&self) -> usize {
        self.table.len()
    }

    /// Send a request and block the caller until the reply or the deadline.
    ///
    /// The correlation entry is released on every exit path, so a reply
    /// that races the deadline is dropped rather than delivered twice.
    pub(crate) async fn invoke_sync(
        &self,
        conn: &Connection,
        packet: &Packet,
        timeout: Duration,
    ) -> Result<Packet> {
        let future = Arc::new(ResponseFuture::new(packet.packet_id, None));
        self.table.insert(Arc::clone(&future));

        let result = async {
            let wire = codec::encode(packet, self.codec)?;
            conn.write_frame(&wire).await?;
            future.wait(timeout).await
        }
        .await;

        self.table.remove(packet.packet_id);
        result
    }

    /// Send a request and return immediately; `callback` fires when the
    /// future resolves, normally or with an error.
    pub(crate) async fn invoke_async(
        &self,
        conn: &Connection,
        packet: &Packet,
        callback: ResponseCallback,
        timeout: Duration,
    ) -> Result<()> {
        let future = Arc::new(ResponseFuture::new(packet.packet_id, Some(callback)));
        self.table.insert(Arc::clone(&future));

        let written = async {
            let wire = codec::encode(packet, self.codec)?;
            conn.write_frame(&wire).await
        }
        .await;

        if let Err(err) = written {
            // The caller sees the failure synchronously; no callback fires.
            self.table.remove(packet.packet_id);
            return Err(err);
        }

        // Watchdog: if the deadline passes before the receive path resolves
        // the future, fail it (firing the callback) and release the entry.
        let table = Arc::clone(&self.table);
        let packet_id = packet.packet_id;
        tokio::spawn(async move {
            if future.wait(timeout).await == Err(RpcError::Timeout)
                && table.remove(packet_id).is_some()
            {
                future.fail(RpcError::Timeout);
            }
        });

        Ok(())
    }

    /// Mark the packet oneway and send it; no future is registered and
    /// `timeout` bounds only the write.
    pub(crate) async fn invoke_oneway(
        &self,
        conn: &Connection,
        packet: &mut Packet,
        timeout: Duration,
    ) -> Result<()> {
        packet.mark_oneway();
        let wire = codec::encode(packet, self.codec)?;
        match tokio::time::timeout(timeout, conn.write_frame(&wire)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout),
        }
    }

    /// Serial receive loop for one connection.
    ///
    /// Decode failures drop the offending frame and keep reading — the
    /// framing layer has already consumed the bytes, so the stream stays in
    /// sync. Read failures and peer close end the loop; the caller removes
    /// the connection from its registry.
    pub(crate) async fn receive_loop(
        self: Arc<Self>,
        mut reader: OwnedReadHalf,
        conn: Arc<Connection>,
    ) {
        loop {
            match read_frame(&mut reader).await {
                Ok(Some(frame)) => match codec::decode(&frame) {
                    Ok(packet) => self.process_packet(packet, &conn).await,
                    Err(err) => {
                        warn!(peer = %conn.peer_addr(), %err, "dropping undecodable frame");
                    }
                },
                Ok(None) => {
                    debug!(peer = %conn.peer_addr(), "peer closed connection");
                    break;
                }
                Err(err) => {
                    warn!(peer = %conn.peer_addr(), %err, "closing connection after read failure");
                    break;
                }
            }
        }
    }

    async fn process_packet(&self, packet: Packet, conn: &Arc<Connection>) {
        if packet.is_response() {
            let Some(future) = self.table.remove(packet.packet_id) else {
                debug!(packet_id = packet.packet_id, "dropping late or duplicate response");
                return;
            };
            self.pool
                .submit(async move {
                    // The callback runs user code; keep its panics off the pool.
                    if catch_unwind(AssertUnwindSafe(|| future.complete(packet))).is_err() {
                        error!("response callback panicked");
                    }
                })
                .await;
            return;
        }

        let processor = self
            .processors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&packet.code)
            .cloned();

        match processor {
            Some(processor) => {
                let conn = Arc::clone(conn);
                let codec = self.codec;
                self.pool
                    .submit(async move {
                        let code = packet.code;
                        let packet_id = packet.packet_id;
                        let oneway = packet.is_oneway();
                        let peer = conn.peer_addr();

                        match catch_unwind(AssertUnwindSafe(|| processor(packet, peer))) {
                            Ok(Some(mut response)) if !oneway => {
                                response.packet_id = packet_id;
                                response.mark_response();
                                send_reply(&conn, &response, codec).await;
                            }
                            Ok(_) => {}
                            Err(_) => {
                                error!(code, peer = %peer, "processor panicked, no response sent");
                            }
                        }
                    })
                    .await;
            }
            None if self.role == PeerRole::Server => {
                let mut response = Packet::new(CODE_NOT_SUPPORTED, Bytes::new());
                response.packet_id = packet.packet_id;
                response.mark_response();
                response.message =
                    format!("no processor registered for code: {}", packet.code);
                send_reply(conn, &response, self.codec).await;
            }
            None => {
                warn!(code = packet.code, peer = %conn.peer_addr(), "no processor registered, dropping request");
            }
        }
    }
}

async fn send_reply(conn: &Connection, response: &Packet, codec: CodecType) {
    match codec::encode(response, codec) {
        Ok(wire) => {
            if let Err(err) = conn.write_frame(&wire).await {
                warn!(peer = %conn.peer_addr(), %err, "failed to send response");
            }
        }
        Err(err) => error!(%err, "failed to encode response packet"),
    }
}
