//! RPC error types.

use thiserror::Error;
use thunder_proto::ProtocolError;

/// Result alias for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;

/// Errors surfaced by the invocation API.
///
/// I/O causes are carried as strings so the error stays `Clone`: the same
/// failure may be observed by a synchronous waiter and recorded on a
/// response future for its callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Encode or decode failure from the wire layer.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Read or write on the transport failed.
    #[error("i/o failure: {0}")]
    Io(String),

    /// Dialing the remote address failed.
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// Remote address that was dialed.
        addr: String,
        /// Underlying failure.
        reason: String,
    },

    /// The deadline elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The connection was torn down while the request was in flight.
    #[error("connection lost")]
    ConnectionLost,
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
