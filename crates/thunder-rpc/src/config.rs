//! Server and client configuration.

use std::time::Duration;

use thunder_proto::CodecType;

/// Default bound on concurrently dispatched worker tasks.
pub const DEFAULT_WORKER_LIMIT: usize = 256;

/// Connection placement policy, carried opaquely for the runtime glue.
///
/// The core engine does not interpret this; a deployment that runs several
/// acceptor shards can use it to pick where new connections land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadBalance {
    /// Rotate across shards.
    #[default]
    RoundRobin,
    /// Prefer the shard with the fewest connections.
    LeastConnections,
}

/// Server configuration.
///
/// `multicore` and `event_loop_num` parameterize the runtime the embedding
/// process builds (see the `thunder-server` binary); the engine itself is
/// runtime-agnostic.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub addr: String,
    /// Run a multi-threaded runtime.
    pub multicore: bool,
    /// Worker threads when `multicore` is set.
    pub event_loop_num: usize,
    /// TCP keepalive applied to accepted sockets; zero disables.
    pub tcp_keep_alive: Duration,
    /// Connection placement policy, opaque to the engine.
    pub load_balance: LoadBalance,
    /// Header codec for outgoing packets.
    pub codec: CodecType,
    /// Bound on concurrently dispatched worker tasks.
    pub worker_limit: usize,
    /// Print the startup banner.
    pub print_banner: bool,
}

impl ServerConfig {
    /// Default configuration listening on the given port.
    pub fn with_port(port: u16) -> Self {
        Self { addr: format!("0.0.0.0:{port}"), ..Self::default() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9003".to_string(),
            multicore: true,
            event_loop_num: 8,
            tcp_keep_alive: Duration::from_secs(5),
            load_balance: LoadBalance::default(),
            codec: CodecType::default(),
            worker_limit: DEFAULT_WORKER_LIMIT,
            print_banner: true,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Header codec for outgoing packets.
    pub codec: CodecType,
    /// Bound on concurrently dispatched worker tasks.
    pub worker_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { codec: CodecType::default(), worker_limit: DEFAULT_WORKER_LIMIT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_constructor_fills_defaults() {
        let config = ServerConfig::with_port(9003);
        assert_eq!(config.addr, "0.0.0.0:9003");
        assert!(config.multicore);
        assert_eq!(config.event_loop_num, 8);
        assert_eq!(config.tcp_keep_alive, Duration::from_secs(5));
        assert!(config.print_banner);
    }
}
