//! RPC server: accept loop and connection registry.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use dashmap::DashMap;
use thunder_proto::Packet;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
};
use tracing::{debug, info, warn};

use crate::{
    banner,
    config::ServerConfig,
    connection::Connection,
    dispatch::{Dispatcher, PeerRole},
    error::{Result, RpcError},
    future::ResponseFuture,
};

/// Server side of the transport.
///
/// Accepts connections on the configured address and runs the shared
/// dispatch engine on each. Because the engine is symmetric, the server
/// exposes the same invocation surface as the client, addressed at an
/// accepted connection instead of a remote address.
pub struct RpcServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    connections: Arc<DashMap<SocketAddr, Arc<Connection>>>,
    listener: std::sync::Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl RpcServer {
    /// Bind the configured address.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(
                PeerRole::Server,
                config.codec,
                config.worker_limit,
            )),
            config,
            connections: Arc::new(DashMap::new()),
            listener: std::sync::Mutex::new(Some(listener)),
            local_addr,
            shutdown,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Register a processor for an operation code. Call before [`run`].
    ///
    /// [`run`]: RpcServer::run
    pub fn register_processor<F>(&self, code: i16, processor: F)
    where
        F: Fn(Packet, SocketAddr) -> Option<Packet> + Send + Sync + 'static,
    {
        self.dispatcher.register_processor(code, Arc::new(processor));
    }

    /// Accept connections until [`shutdown`] is called.
    ///
    /// [`shutdown`]: RpcServer::shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .ok_or_else(|| RpcError::Io("server is already running".to_string()))?;

        if self.config.print_banner {
            info!("{}", banner::banner_string());
        }
        info!(
            addr = %self.local_addr,
            multicore = self.config.multicore,
            event_loops = self.config.event_loop_num,
            "server listening"
        );

        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.register_connection(stream, peer),
                    Err(err) => warn!(%err, "accept failed"),
                },
                _ = shutdown.changed() => {
                    info!("server shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Stop accepting connections. Established connections drain on their
    /// own receive loops.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Handle for an accepted connection, for server-originated requests.
    pub fn connection(&self, peer: SocketAddr) -> Option<Arc<Connection>> {
        self.connections.get(&peer).map(|entry| Arc::clone(entry.value()))
    }

    /// Peers with an established connection.
    pub fn connected_peers(&self) -> Vec<SocketAddr> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of requests this server originated that still await replies.
    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending_requests()
    }

    /// Send a request on an accepted connection and wait for the response.
    pub async fn invoke_sync(
        &self,
        conn: &Connection,
        packet: &Packet,
        timeout: Duration,
    ) -> Result<Packet> {
        self.dispatcher.invoke_sync(conn, packet, timeout).await
    }

    /// Send a request on an accepted connection; `callback` fires when the
    /// response arrives or the deadline expires.
    pub async fn invoke_async<F>(
        &self,
        conn: &Connection,
        packet: &Packet,
        callback: F,
        timeout: Duration,
    ) -> Result<()>
    where
        F: FnOnce(&ResponseFuture) + Send + 'static,
    {
        self.dispatcher.invoke_async(conn, packet, Box::new(callback), timeout).await
    }

    /// Send a fire-and-forget packet on an accepted connection.
    pub async fn invoke_oneway(
        &self,
        conn: &Connection,
        packet: &mut Packet,
        timeout: Duration,
    ) -> Result<()> {
        self.dispatcher.invoke_oneway(conn, packet, timeout).await
    }

    fn register_connection(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(err) = apply_keep_alive(&stream, self.config.tcp_keep_alive) {
            debug!(%peer, %err, "failed to set TCP keepalive");
        }

        match Connection::pair(stream) {
            Ok((conn, reader)) => {
                let conn = Arc::new(conn);
                self.connections.insert(peer, Arc::clone(&conn));
                debug!(%peer, "connection accepted");

                let dispatcher = Arc::clone(&self.dispatcher);
                let connections = Arc::clone(&self.connections);
                tokio::spawn(async move {
                    dispatcher.receive_loop(reader, conn).await;
                    connections.remove(&peer);
                    debug!(%peer, "connection closed");
                });
            }
            Err(err) => warn!(%peer, %err, "failed to register connection"),
        }
    }
}

fn apply_keep_alive(stream: &TcpStream, keep_alive: Duration) -> std::io::Result<()> {
    if keep_alive.is_zero() {
        return Ok(());
    }
    let sock = socket2::SockRef::from(stream);
    sock.set_tcp_keepalive(&socket2::TcpKeepalive::new().with_time(keep_alive))
}
