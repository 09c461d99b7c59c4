#![cfg(any(test, feature = "test-helpers"))]
//! Test-only collaborators for exercising sessions without a socket.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    connection_info::RpcConnectionInfo,
    message::Frame,
    registry::ConnectionRegistry,
    session::SessionId,
    transport::{Transport, TransportError},
};

#[derive(Default)]
struct RecordingInner {
    written: Mutex<Vec<Frame>>,
    peer: Mutex<Option<SocketAddr>>,
    fail_writes: AtomicBool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

/// In-memory [`Transport`] recording every written frame.
///
/// Clones share state, so a test can keep one clone for inspection while the
/// session owns another.
#[derive(Clone, Default)]
pub struct RecordingTransport(Arc<RecordingInner>);

impl RecordingTransport {
    /// Create a transport reporting `peer` as its remote address.
    #[must_use]
    pub fn new(peer: Option<SocketAddr>) -> Self {
        let transport = Self::default();
        transport.set_peer_addr(peer);
        transport
    }

    /// Change the address reported by [`Transport::peer_addr`].
    pub fn set_peer_addr(&self, peer: Option<SocketAddr>) {
        *self.0.peer.lock().unwrap_or_else(PoisonError::into_inner) = peer;
    }

    /// Make subsequent writes fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) { self.0.fail_writes.store(fail, Ordering::SeqCst); }

    /// Frames written so far, in order.
    #[must_use]
    pub fn written(&self) -> Vec<Frame> {
        self.0
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of heartbeats written so far.
    #[must_use]
    pub fn heartbeats(&self) -> usize {
        self.written()
            .iter()
            .filter(|frame| matches!(frame, Frame::Heartbeat))
            .count()
    }

    /// Returns `true` once [`Transport::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.0.closed.load(Ordering::SeqCst) }

    /// Number of [`Transport::close`] calls.
    #[must_use]
    pub fn close_calls(&self) -> usize { self.0.close_calls.load(Ordering::SeqCst) }

    fn record(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.0.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused").into());
        }
        self.0
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn write(&self, frame: Frame) -> Result<(), TransportError> { self.record(frame) }

    fn try_write(&self, frame: Frame) -> Result<(), TransportError> { self.record(frame) }

    fn close(&self) {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        self.0.closed.store(true, Ordering::SeqCst);
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        *self.0.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`ConnectionRegistry`] recording every removal.
#[derive(Default)]
pub struct RecordingRegistry(Mutex<Vec<RpcConnectionInfo>>);

impl RecordingRegistry {
    /// Identities removed so far, in order.
    #[must_use]
    pub fn removals(&self) -> Vec<RpcConnectionInfo> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConnectionRegistry for RecordingRegistry {
    fn remove_session(&self, info: &RpcConnectionInfo, _id: SessionId) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info.clone());
    }
}
