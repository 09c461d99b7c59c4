//! Framed connections driving an [`RpcSession`].
//!
//! [`ConnectionBuilder`] wraps any byte stream in a length-delimited codec and
//! spawns two tasks per connection: a writer task serving
//! [`FramedTransport`] writes, and an event loop that decodes inbound frames,
//! watches for idleness and invokes the session's callbacks in order. A
//! cancellation token shared by both tasks closes the connection.

mod counter;
mod events;
mod transport;
mod writer;

use std::{io, net::SocketAddr, sync::Arc};

pub use counter::live_connection_count;
use counter::LiveConnection;
use futures::StreamExt;
use log::info;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{Notify, mpsc},
};
use tokio_util::{
    codec::{Framed, LengthDelimitedCodec},
    sync::CancellationToken,
    task::TaskTracker,
};
pub use transport::FramedTransport;

use crate::{
    config::SessionConfig,
    connection_info::RpcConnectionInfo,
    registry::ConnectionRegistry,
    session::RpcSession,
};

/// Builder for framed connections.
///
/// # Examples
///
/// ```no_run
/// use std::{net::SocketAddr, sync::Arc};
///
/// use rpclink::{
///     connection::{ConnectionBuilder, FramedTransport},
///     registry::SessionRegistry,
/// };
///
/// # async fn example() -> std::io::Result<()> {
/// let registry = Arc::new(SessionRegistry::<FramedTransport>::default());
/// let addr: SocketAddr = "127.0.0.1:9000".parse().expect("valid socket address");
/// let connection = ConnectionBuilder::new(registry.clone()).connect(addr).await?;
/// if let Some(info) = connection.session().connection_info() {
///     registry.insert(info.clone(), connection.session());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ConnectionBuilder {
    registry: Arc<dyn ConnectionRegistry>,
    config: SessionConfig,
    connection_info: Option<RpcConnectionInfo>,
}

impl ConnectionBuilder {
    /// Start building a connection that deregisters from `registry` on close.
    #[must_use]
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            registry,
            config: SessionConfig::default(),
            connection_info: None,
        }
    }

    /// Replace the session configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity under which the session is registered. Defaults to one
    /// derived from the peer address.
    #[must_use]
    pub fn connection_info(mut self, info: RpcConnectionInfo) -> Self {
        self.connection_info = Some(info);
        self
    }

    /// Open a TCP connection to `addr` and start its session.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the connection cannot be established.
    pub async fn connect(self, addr: SocketAddr) -> io::Result<Connection> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok();
        Ok(self.spawn(stream, peer_addr))
    }

    /// Start a session over an already established stream.
    ///
    /// The session is active when this returns; its event loop and writer
    /// run on the current Tokio runtime.
    pub fn spawn<S>(self, stream: S, peer_addr: Option<SocketAddr>) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let Self {
            registry,
            config,
            connection_info,
        } = self;
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(config.max_frame_length_value())
            .new_codec();
        let (sink, frames) = Framed::new(stream, codec).split();
        let (tx, rx) = mpsc::channel(config.write_queue_capacity_value());
        let shutdown = CancellationToken::new();
        let written = Arc::new(Notify::new());

        let transport = FramedTransport::new(tx, shutdown.clone(), peer_addr);
        let mut session = RpcSession::new(transport, registry).with_config(config.clone());
        if let Some(info) = connection_info {
            session = session.with_connection_info(info);
        }
        let session = Arc::new(session);
        session.on_active();

        let guard = LiveConnection::acquire();
        info!(
            "connection opened: live_connections={}, peer={peer_addr:?}",
            live_connection_count()
        );

        let tracker = TaskTracker::new();
        tracker.spawn(writer::run(
            sink,
            rx,
            shutdown.clone(),
            written.clone(),
            config.close_flush_timeout_value(),
        ));
        tracker.spawn({
            let session = session.clone();
            let shutdown = shutdown.clone();
            async move {
                events::run(frames, session, shutdown, written, config).await;
                drop(guard);
                info!(
                    "connection closed: live_connections={}, peer={peer_addr:?}",
                    live_connection_count()
                );
            }
        });
        tracker.close();

        Connection { session, tracker }
    }
}

/// A running framed connection.
pub struct Connection {
    session: Arc<RpcSession<FramedTransport>>,
    tracker: TaskTracker,
}

impl Connection {
    /// Session correlating requests on this connection.
    #[must_use]
    pub fn session(&self) -> &Arc<RpcSession<FramedTransport>> { &self.session }

    /// Request the connection to close.
    ///
    /// Writes already queued are flushed for up to
    /// [`SessionConfig::close_flush_timeout`] before the stream is shut down.
    pub fn close(&self) { self.session.close(); }

    /// Wait until both connection tasks have exited.
    pub async fn closed(&self) { self.tracker.wait().await; }
}
