//! Per-connection request/response correlation.
//!
//! An [`RpcSession`] is created fresh for every connection. Callers issue
//! requests through [`RpcSession::send`] from any task; the connection's
//! inbound context reports lifecycle events, responses and idle timeouts
//! through the `on_*` methods, which must be invoked sequentially for a given
//! session. The pending-request table is the only state written from both
//! sides.

mod error;
mod id;
mod state;

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        Arc,
        OnceLock,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

pub use error::SessionError;
pub use id::SessionId;
use state::AtomicSessionState;
pub use state::SessionState;
use tracing::{debug, error, info, warn};

use crate::{
    config::SessionConfig,
    connection_info::RpcConnectionInfo,
    error::RpcError,
    future::RpcFuture,
    message::{Frame, RequestId, RpcRequest, RpcResponse},
    metrics,
    pending::PendingRequests,
    registry::ConnectionRegistry,
    transport::{Transport, TransportError},
};

/// Correlates requests and responses on one connection.
///
/// # Examples
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
///
/// use rpclink::{
///     message::RpcRequest,
///     registry::ConnectionRegistry,
///     session::RpcSession,
///     transport::Transport,
/// };
///
/// # async fn example<T: Transport>(transport: T, registry: Arc<dyn ConnectionRegistry>) {
/// let session = Arc::new(RpcSession::new(transport, registry));
/// session.on_active();
/// let future = session
///     .send(RpcRequest::new("echo", "say", b"hi".to_vec()))
///     .await
///     .expect("session is active");
/// let _response = future.wait(Duration::from_secs(5)).await;
/// # }
/// ```
pub struct RpcSession<T> {
    id: SessionId,
    transport: T,
    registry: Arc<dyn ConnectionRegistry>,
    config: SessionConfig,
    pending: PendingRequests,
    state: AtomicSessionState,
    identity: OnceLock<RpcConnectionInfo>,
    peer_addr: OnceLock<SocketAddr>,
    missed_heartbeats: AtomicU32,
}

impl<T: Transport> RpcSession<T> {
    /// Create an unregistered session writing through `transport`.
    #[must_use]
    pub fn new(transport: T, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            id: SessionId::next(),
            transport,
            registry,
            config: SessionConfig::default(),
            pending: PendingRequests::new(),
            state: AtomicSessionState::new(),
            identity: OnceLock::new(),
            peer_addr: OnceLock::new(),
            missed_heartbeats: AtomicU32::new(0),
        }
    }

    /// Replace the session configuration.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the identity under which the session is registered.
    ///
    /// Without one, the identity is derived from the peer address when the
    /// session becomes active.
    #[must_use]
    pub fn with_connection_info(mut self, info: RpcConnectionInfo) -> Self {
        self.identity = OnceLock::from(info);
        self
    }

    /// Process-unique identifier of this session.
    #[must_use]
    pub fn id(&self) -> SessionId { self.id }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState { self.state.load() }

    /// Peer address captured when the session became active.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.peer_addr.get().copied() }

    /// Registry identity of this session.
    #[must_use]
    pub fn connection_info(&self) -> Option<&RpcConnectionInfo> { self.identity.get() }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.pending.len() }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.config }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T { &self.transport }

    /// Issue `request` and return the handle its response will settle.
    ///
    /// The handle is registered before the request is written, so a response
    /// can never overtake its registration. If the write fails, the entry is
    /// removed and the handle is settled with [`RpcError::WriteFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotActive`] unless the session is active, and
    /// [`SessionError::DuplicateRequestId`] if the identifier is already in
    /// flight.
    pub async fn send(&self, request: RpcRequest) -> Result<RpcFuture, SessionError> {
        let state = self.state();
        if state != SessionState::Active {
            return Err(SessionError::NotActive(state));
        }
        let id = request.request_id().clone();
        let future =
            RpcFuture::with_slow_threshold(id.clone(), self.config.slow_response_threshold_value());
        self.pending.register(id.clone(), future.clone())?;
        metrics::inc_pending();
        // The connection may have closed while the entry was registered.
        let state = self.state();
        if state != SessionState::Active {
            self.take_pending(&id);
            return Err(SessionError::NotActive(state));
        }

        if let Err(err) = self.transport.write(Frame::Request(request)).await {
            error!(request_id = %id, peer = ?self.peer_addr(), error = %err, "failed to send request");
            metrics::inc_write_failures();
            self.take_pending(&id);
            future.complete(Err(RpcError::WriteFailed(err.to_string())));
        }
        Ok(future)
    }

    /// Issue `request` and wait up to `timeout` for its response.
    ///
    /// On timeout the pending entry is cancelled so it does not linger in the
    /// table.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] raised by [`send`](Self::send), or
    /// [`SessionError::Rpc`] wrapping the failed outcome.
    pub async fn call(
        &self,
        request: RpcRequest,
        timeout: Duration,
    ) -> Result<RpcResponse, SessionError> {
        let future = self.send(request).await?;
        match future.wait(timeout).await {
            Ok(response) => Ok(response),
            Err(RpcError::Timeout(elapsed)) => {
                if self.cancel(future.request_id()) {
                    return Err(RpcError::Timeout(elapsed).into());
                }
                // Settled between the deadline and the cancel.
                match future.try_result() {
                    Some(Ok(response)) => Ok(response),
                    Some(Err(err)) => Err(err.into()),
                    None => Err(RpcError::Timeout(elapsed).into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Withdraw a pending request, settling its handle with
    /// [`RpcError::Cancelled`].
    ///
    /// Returns `false` if `id` was not pending. A response arriving later is
    /// reported as unmatched.
    pub fn cancel(&self, id: &RequestId) -> bool {
        match self.take_pending(id) {
            Some(future) => {
                debug!(request_id = %id, "request cancelled");
                future.complete(Err(RpcError::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Close the underlying transport.
    pub fn close(&self) { self.transport.close(); }

    /// The connection was registered with its runtime.
    ///
    /// Captures the peer address so later deregistration does not depend on
    /// the transport, then moves the session to [`SessionState::Active`].
    pub fn on_active(&self) {
        if let Some(addr) = self.transport.peer_addr() {
            let _ = self.peer_addr.set(addr);
            let _ = self.identity.get_or_init(|| RpcConnectionInfo::from_addr(addr));
        }
        if self.state.activate() {
            metrics::inc_sessions();
            info!(peer = ?self.peer_addr(), "session active");
        } else {
            warn!(state = %self.state(), "ignoring activation of a session that is not new");
        }
    }

    /// A response arrived.
    ///
    /// Settles the matching handle, or logs and drops the response if no
    /// request is pending under its identifier.
    pub fn on_response(&self, response: RpcResponse) {
        self.missed_heartbeats.store(0, Ordering::Relaxed);
        let id = response.request_id().clone();
        debug!(request_id = %id, "received response");
        match self.take_pending(&id) {
            Some(future) => {
                future.complete(Ok(response));
            }
            None => {
                metrics::inc_unmatched();
                warn!(request_id = %id, peer = ?self.peer_addr(), "unmatched response");
            }
        }
    }

    /// The peer sent a heartbeat.
    pub fn on_heartbeat(&self) {
        self.missed_heartbeats.store(0, Ordering::Relaxed);
        debug!(peer = ?self.peer_addr(), "received heartbeat");
    }

    /// No traffic was observed for the configured idle interval.
    ///
    /// Queues a [`Frame::Heartbeat`], which never enters the pending table,
    /// without waiting for it to be written.
    /// When a missed-heartbeat limit is configured and exceeded, the
    /// transport is closed instead.
    pub fn on_idle_timeout(&self) {
        if self.state() != SessionState::Active {
            return;
        }
        let missed = self.missed_heartbeats.fetch_add(1, Ordering::Relaxed);
        if let Some(limit) = self.config.max_missed_heartbeats_value()
            && missed >= limit
        {
            warn!(peer = ?self.peer_addr(), missed, "peer unresponsive; closing connection");
            self.transport.close();
            return;
        }
        match self.transport.try_write(Frame::Heartbeat) {
            Ok(()) => {
                metrics::inc_heartbeats();
                debug!(peer = ?self.peer_addr(), "queued heartbeat");
            }
            Err(err) => warn!(peer = ?self.peer_addr(), error = %err, "failed to send heartbeat"),
        }
    }

    /// The connection closed.
    ///
    /// Moves the session to [`SessionState::Inactive`] and removes it from
    /// the registry using the identity captured while active. Pending
    /// requests leave the table; their handles stay unset unless
    /// [`SessionConfig::fail_pending_on_disconnect`] is enabled. Later calls
    /// are no-ops.
    pub fn on_connection_lost(&self) {
        let previous = self.state.deactivate();
        if previous == SessionState::Inactive {
            return;
        }
        if previous == SessionState::Active {
            metrics::dec_sessions();
        }
        if let Some(info) = self.identity.get() {
            self.registry.remove_session(info, self.id);
        }
        let abandoned = self.pending.drain();
        metrics::dec_pending(abandoned.len());
        if self.config.fail_pending_on_disconnect_value() {
            for future in &abandoned {
                future.complete(Err(RpcError::ConnectionLost));
            }
            info!(peer = ?self.peer_addr(), failed = abandoned.len(), "session inactive");
        } else {
            info!(peer = ?self.peer_addr(), abandoned = abandoned.len(), "session inactive");
        }
    }

    /// The transport reported an error. The connection is closed, which in
    /// turn drives [`on_connection_lost`](Self::on_connection_lost).
    pub fn on_transport_error(&self, err: &TransportError) {
        error!(peer = ?self.peer_addr(), error = %err, "transport error; closing connection");
        self.transport.close();
    }

    fn take_pending(&self, id: &RequestId) -> Option<RpcFuture> {
        let future = self.pending.take(id);
        if future.is_some() {
            metrics::dec_pending(1);
        }
        future
    }
}

impl<T> fmt::Debug for RpcSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSession")
            .field("id", &self.id)
            .field("state", &self.state.load())
            .field("peer_addr", &self.peer_addr.get())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
