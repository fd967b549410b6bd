//! Symmetric request/response RPC engine over length-prefixed TCP frames.
//!
//! Both peers may originate requests on the same connection; both dispatch
//! inbound packets through a processor table keyed by operation code. A
//! caller can block until the matching response arrives ([`invoke_sync`]),
//! register a completion callback and return immediately
//! ([`invoke_async`]), or fire and forget ([`invoke_oneway`]).
//!
//! # Architecture
//!
//! - [`Connection`]: framed write half plus cached peer address; a
//!   dedicated receive task owns the read half
//! - [`ResponseFuture`] + the correlation table: match each reply to its
//!   outstanding request by `packet_id`, first resolution wins
//! - [`dispatch`]: the shared receive → decode → classify → route state
//!   machine, parameterized by peer role
//! - [`RpcClient`]: dials and pools connections by remote address
//! - [`RpcServer`]: accepts connections and keeps a peer-addressed registry
//!
//! Dispatched work (processors, completion callbacks) runs on a bounded
//! worker pool with a panic boundary: a failing processor is logged and
//! the receive loop keeps running.
//!
//! [`invoke_sync`]: RpcClient::invoke_sync
//! [`invoke_async`]: RpcClient::invoke_async
//! [`invoke_oneway`]: RpcClient::invoke_oneway

pub mod banner;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod future;
pub mod logging;
pub mod pool;
pub mod server;
pub mod table;

pub use client::RpcClient;
pub use config::{ClientConfig, DEFAULT_WORKER_LIMIT, LoadBalance, ServerConfig};
pub use connection::Connection;
pub use dispatch::{PeerRole, Processor};
pub use error::{Result, RpcError};
pub use future::{ResponseCallback, ResponseFuture};
pub use server::RpcServer;
pub use table::ResponseTable;
