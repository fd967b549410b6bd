//! RPC client with per-address connection pooling.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use dashmap::DashMap;
use thunder_proto::Packet;
use tokio::net::TcpStream;
use tracing::debug;

use crate::{
    config::ClientConfig,
    connection::Connection,
    dispatch::{Dispatcher, PeerRole},
    error::{Result, RpcError},
    future::ResponseFuture,
};

/// Client side of the transport.
///
/// Keeps one active connection per remote address, created on demand under
/// a mutex; later requests to the same address reuse the cached connection.
/// Each connection gets a dedicated receive task at creation, so a pooled
/// client can also serve requests that the remote peer originates.
pub struct RpcClient {
    dispatcher: Arc<Dispatcher>,
    connections: Arc<DashMap<String, Arc<Connection>>>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl RpcClient {
    /// Create a client from configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(
                PeerRole::Client,
                config.codec,
                config.worker_limit,
            )),
            connections: Arc::new(DashMap::new()),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Register a processor for requests the remote peer originates.
    pub fn register_processor<F>(&self, code: i16, processor: F)
    where
        F: Fn(Packet, SocketAddr) -> Option<Packet> + Send + Sync + 'static,
    {
        self.dispatcher.register_processor(code, Arc::new(processor));
    }

    /// Send a request and wait for the matching response.
    ///
    /// Returns the response packet, [`RpcError::Timeout`] when the deadline
    /// elapses first, or an I/O error. The correlation entry is released on
    /// every exit path.
    pub async fn invoke_sync(
        &self,
        addr: &str,
        packet: &Packet,
        timeout: Duration,
    ) -> Result<Packet> {
        let conn = self.acquire(addr).await?;
        self.dispatcher.invoke_sync(&conn, packet, timeout).await
    }

    /// Send a request and return after the write; `callback` fires when the
    /// response arrives or the deadline expires.
    pub async fn invoke_async<F>(
        &self,
        addr: &str,
        packet: &Packet,
        callback: F,
        timeout: Duration,
    ) -> Result<()>
    where
        F: FnOnce(&ResponseFuture) + Send + 'static,
    {
        let conn = self.acquire(addr).await?;
        self.dispatcher.invoke_async(&conn, packet, Box::new(callback), timeout).await
    }

    /// Send a fire-and-forget packet; `timeout` bounds only the write.
    pub async fn invoke_oneway(
        &self,
        addr: &str,
        packet: &mut Packet,
        timeout: Duration,
    ) -> Result<()> {
        let conn = self.acquire(addr).await?;
        self.dispatcher.invoke_oneway(&conn, packet, timeout).await
    }

    /// Number of requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending_requests()
    }

    /// Number of pooled connections.
    pub fn pooled_connections(&self) -> usize {
        self.connections.len()
    }

    /// Close every pooled connection.
    ///
    /// In-flight requests resolve through their own deadlines.
    pub async fn shutdown(&self) {
        let conns: Vec<Arc<Connection>> =
            self.connections.iter().map(|entry| Arc::clone(entry.value())).collect();
        self.connections.clear();
        for conn in conns {
            conn.close().await;
        }
    }

    async fn acquire(&self, addr: &str) -> Result<Arc<Connection>> {
        if let Some(conn) = self.connections.get(addr) {
            return Ok(Arc::clone(conn.value()));
        }

        let _guard = self.connect_lock.lock().await;
        // Double-check: another caller may have dialed while we waited.
        if let Some(conn) = self.connections.get(addr) {
            return Ok(Arc::clone(conn.value()));
        }

        let stream = TcpStream::connect(addr).await.map_err(|err| RpcError::Connect {
            addr: addr.to_string(),
            reason: err.to_string(),
        })?;
        let (conn, reader) = Connection::pair(stream)?;
        let conn = Arc::new(conn);
        self.connections.insert(addr.to_string(), Arc::clone(&conn));
        debug!(%addr, "connection established");

        let dispatcher = Arc::clone(&self.dispatcher);
        let connections = Arc::clone(&self.connections);
        let key = addr.to_string();
        let receive_conn = Arc::clone(&conn);
        tokio::spawn(async move {
            dispatcher.receive_loop(reader, receive_conn).await;
            // In-flight futures on this connection resolve via their
            // deadlines; the pool entry must not serve new requests.
            connections.remove(&key);
            debug!(addr = %key, "connection removed from pool");
        });

        Ok(conn)
    }
}
