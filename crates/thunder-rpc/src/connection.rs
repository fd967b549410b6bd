//! Framed TCP connection wrapper.
//!
//! A [`Connection`] owns the write half of a stream plus the cached peer
//! address; the read half is handed to the connection's dedicated receive
//! task. Writes are serialized through an async mutex, so frames from
//! concurrent callers never interleave on the wire.

use std::net::SocketAddr;

use bytes::BytesMut;
use thunder_proto::frame;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

use crate::error::Result;

/// The send side of one framed byte stream, shared between the invocation
/// paths and the dispatch engine's response writes.
pub struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
}

impl Connection {
    /// Split a stream into a connection (write half) and its read half.
    pub(crate) fn pair(stream: TcpStream) -> Result<(Self, OwnedReadHalf)> {
        let peer_addr = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        Ok((Self { writer: Mutex::new(writer), peer_addr }, reader))
    }

    /// Remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Write one length-prefixed frame.
    pub async fn write_frame(&self, payload: &[u8]) -> Result<()> {
        let framed = frame::encode(payload)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&framed).await?;
        Ok(())
    }

    /// Shut down the write side, signalling EOF to the peer.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Read one length-prefixed frame, stripping the prefix.
///
/// Returns `Ok(None)` on clean end-of-stream. A malformed length prefix is
/// a fatal per-connection error; the caller closes the connection.
pub(crate) async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<BytesMut>> {
    let mut prefix = [0u8; frame::LENGTH_FIELD_LEN];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = frame::decode_length(prefix)?;
    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
