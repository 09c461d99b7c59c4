//! Transport collaborator consumed by [`RpcSession`](crate::session::RpcSession).
//!
//! A transport accepts frames for writing from any task and can be closed.
//! Inbound delivery runs the other way: the transport's I/O runtime invokes
//! the session's `on_*` callbacks on one sequential context per connection.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Frame;

/// Errors reported by a [`Transport`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
    /// The write queue is full and the frame was not queued.
    #[error("write queue full")]
    Busy,
    /// Underlying I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// A frame could not be encoded.
    #[error("failed to encode frame")]
    Encode(#[source] bincode::error::EncodeError),
    /// An inbound frame could not be decoded.
    #[error("failed to decode frame")]
    Decode(#[source] bincode::error::DecodeError),
}

/// Write side of a connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Write and flush `frame`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the frame could not be written.
    async fn write(&self, frame: Frame) -> Result<(), TransportError>;

    /// Queue `frame` for writing without waiting for it to be flushed.
    ///
    /// Used from the inbound context, which must never block on the write
    /// path. Failures that happen after the frame was queued are not
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Busy`] if the frame cannot be queued right
    /// away, or [`TransportError::Closed`] once the transport is closed.
    fn try_write(&self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection. Closing drives the session's
    /// `on_connection_lost` callback from the inbound context.
    fn close(&self);

    /// Remote address, while the transport can still report it.
    fn peer_addr(&self) -> Option<SocketAddr>;
}
