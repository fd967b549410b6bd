//! Thunder RPC server binary.
//!
//! # Usage
//!
//! ```bash
//! # Development (verbose logging)
//! thunder-server --bind 0.0.0.0:9003
//!
//! # Production logging preset
//! LOGGING_MODE=prod thunder-server --bind 0.0.0.0:9003 --codec thunder
//! ```
//!
//! Registers an echo processor on code 1 so the server is immediately
//! usable for smoke tests.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::Parser;
use thunder_proto::{CodecType, Packet};
use thunder_rpc::{RpcServer, ServerConfig, logging};

/// Thunder RPC server
#[derive(Parser, Debug)]
#[command(name = "thunder-server")]
#[command(about = "Symmetric RPC server over length-prefixed TCP frames")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:9003")]
    bind: String,

    /// Run a single-threaded runtime instead of the multicore default
    #[arg(long)]
    single_thread: bool,

    /// Worker threads when multicore
    #[arg(long, default_value_t = 8)]
    event_loops: usize,

    /// TCP keepalive in seconds (0 disables)
    #[arg(long, default_value_t = 5)]
    tcp_keep_alive: u64,

    /// Header codec for outgoing packets (json or thunder)
    #[arg(long, default_value = "json")]
    codec: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Suppress the startup banner
    #[arg(long)]
    no_banner: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let codec = match args.codec.as_str() {
        "thunder" => CodecType::Thunder,
        _ => CodecType::Json,
    };
    let config = ServerConfig {
        addr: args.bind,
        multicore: !args.single_thread,
        event_loop_num: args.event_loops,
        tcp_keep_alive: Duration::from_secs(args.tcp_keep_alive),
        codec,
        print_banner: !args.no_banner,
        ..ServerConfig::default()
    };

    let runtime = if config.multicore {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.event_loop_num.max(1))
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_current_thread().enable_all().build()?
    };

    runtime.block_on(async {
        let server = Arc::new(RpcServer::bind(config).await?);

        server.register_processor(1, |request: Packet, _addr: SocketAddr| {
            let mut reply = Packet::new(1, request.body);
            reply.message = "echo".to_string();
            Some(reply)
        });
        tracing::info!("registered echo processor on code 1");

        server.run().await
    })?;

    Ok(())
}
