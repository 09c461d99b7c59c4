//! Scripted server peer for driving a framed connection in tests.
//!
//! [`duplex_connection`] spawns a session over one half of an in-memory
//! duplex stream and hands back a [`TestPeer`] holding the other half. The
//! peer speaks the same length-delimited bincode framing as the connection
//! and either answers frames according to a [`ServerMode`] or lets the test
//! exchange frames by hand.

use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use rpclink::{
    connection::{Connection, ConnectionBuilder},
    message::{Frame, Message, RpcResponse},
};
use tokio::io::{DuplexStream, duplex};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const DUPLEX_CAPACITY: usize = 64 * 1024;

/// How a serving peer answers inbound frames.
#[derive(Debug, Clone, Copy, Default)]
pub enum ServerMode {
    /// Answer each request with its own payload and each heartbeat in kind.
    #[default]
    Echo,
    /// Answer requests under an identifier nobody is waiting for.
    Mismatch,
    /// Read frames but never answer.
    Silent,
}

/// Compute the reply to `frame` under `mode`.
#[must_use]
pub fn process_frame(mode: ServerMode, frame: &Frame) -> Option<Frame> {
    match (mode, frame) {
        (ServerMode::Silent, _) | (_, Frame::Response(_)) => None,
        (_, Frame::Heartbeat) => Some(Frame::Heartbeat),
        (ServerMode::Echo, Frame::Request(request)) => Some(Frame::Response(RpcResponse::ok(
            request.request_id().clone(),
            request.payload().to_vec(),
        ))),
        (ServerMode::Mismatch, Frame::Request(request)) => Some(Frame::Response(
            RpcResponse::ok(format!("{}-other", request.request_id()), Vec::new()),
        )),
    }
}

/// Server end of an in-memory connection.
pub struct TestPeer {
    framed: Framed<DuplexStream, LengthDelimitedCodec>,
}

impl TestPeer {
    /// Read the next frame, or `None` once the client has closed.
    ///
    /// # Panics
    ///
    /// Panics if the bytes received are not a valid frame.
    pub async fn recv(&mut self) -> Option<Frame> {
        let bytes = self.framed.next().await?.ok()?;
        let (frame, _) = Frame::from_bytes(&bytes).expect("peer received an invalid frame");
        Some(frame)
    }

    /// Write `frame` to the client.
    ///
    /// # Panics
    ///
    /// Panics if the frame cannot be encoded or written.
    pub async fn send(&mut self, frame: Frame) {
        let bytes = frame.to_bytes().expect("encode frame");
        self.framed
            .send(Bytes::from(bytes))
            .await
            .expect("peer write failed");
    }

    /// Write raw bytes as a single frame, bypassing encoding.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.framed
            .send(Bytes::copy_from_slice(bytes))
            .await
            .expect("peer write failed");
    }

    /// Answer frames according to `mode` until the client disconnects.
    pub async fn serve(mut self, mode: ServerMode) {
        while let Some(frame) = self.recv().await {
            if let Some(reply) = process_frame(mode, &frame) {
                self.send(reply).await;
            }
        }
    }
}

/// Start a session over an in-memory stream reporting `peer_addr`.
#[must_use]
pub fn duplex_connection(
    builder: ConnectionBuilder,
    peer_addr: Option<SocketAddr>,
) -> (Connection, TestPeer) {
    duplex_connection_with_capacity(builder, peer_addr, DUPLEX_CAPACITY)
}

/// Like [`duplex_connection`], buffering at most `capacity` bytes in each
/// direction. Small capacities let tests stall the client's writes by not
/// reading from the peer.
#[must_use]
pub fn duplex_connection_with_capacity(
    builder: ConnectionBuilder,
    peer_addr: Option<SocketAddr>,
    capacity: usize,
) -> (Connection, TestPeer) {
    let (client, server) = duplex(capacity);
    let connection = builder.spawn(client, peer_addr);
    let peer = TestPeer {
        framed: Framed::new(server, LengthDelimitedCodec::new()),
    };
    (connection, peer)
}
