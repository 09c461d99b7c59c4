//! [`Transport`] implementation backed by the connection's writer task.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    message::Frame,
    transport::{Transport, TransportError},
};

/// A frame queued for the writer task with its acknowledgement channel.
pub(super) struct WriteRequest {
    pub(super) frame: Frame,
    pub(super) ack: oneshot::Sender<Result<(), TransportError>>,
}

/// Cloneable write handle for a framed connection.
///
/// Writes are queued to the connection's writer task and resolve once the
/// frame has been flushed. After [`close`](Transport::close) the handle
/// rejects writes and no longer reports a peer address.
#[derive(Clone, Debug)]
pub struct FramedTransport {
    tx: mpsc::Sender<WriteRequest>,
    shutdown: CancellationToken,
    peer_addr: Option<SocketAddr>,
}

impl FramedTransport {
    pub(super) fn new(
        tx: mpsc::Sender<WriteRequest>,
        shutdown: CancellationToken,
        peer_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            tx,
            shutdown,
            peer_addr,
        }
    }

    /// Returns `true` once the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.shutdown.is_cancelled() }
}

#[async_trait]
impl Transport for FramedTransport {
    async fn write(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriteRequest { frame, ack })
            .await
            .map_err(|_| TransportError::Closed)?;
        done.await.map_err(|_| TransportError::Closed)?
    }

    fn try_write(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        // Nobody waits for the acknowledgement.
        let (ack, _) = oneshot::channel();
        self.tx
            .try_send(WriteRequest { frame, ack })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => TransportError::Busy,
                mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    fn close(&self) { self.shutdown.cancel(); }

    fn peer_addr(&self) -> Option<SocketAddr> {
        if self.is_closed() {
            None
        } else {
            self.peer_addr
        }
    }
}
