//! Shared utilities for integration tests.
//!
//! Provides a session harness built on the recording transport and registry
//! so tests can drive inbound events by hand and inspect what was written.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{net::SocketAddr, sync::Arc};

use rpclink::{
    config::SessionConfig,
    message::RpcRequest,
    session::RpcSession,
};
use rpclink_testing::{RecordingRegistry, RecordingTransport};
use rstest::fixture;

/// Shared result type for fallible tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Address reported by the harness transport.
pub const PEER: &str = "10.0.0.5:9000";

/// Parsed [`PEER`].
#[must_use]
pub fn peer_addr() -> SocketAddr { PEER.parse().expect("valid peer address") }

/// Session wired to recording collaborators.
pub struct SessionHarness {
    pub session: Arc<RpcSession<RecordingTransport>>,
    pub transport: RecordingTransport,
    pub registry: Arc<RecordingRegistry>,
}

impl SessionHarness {
    /// Build an unregistered session using `config`.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let transport = RecordingTransport::new(Some(peer_addr()));
        let registry = Arc::new(RecordingRegistry::default());
        let session = RpcSession::new(transport.clone(), registry.clone()).with_config(config);
        Self {
            session: Arc::new(session),
            transport,
            registry,
        }
    }
}

/// An active session with default configuration.
#[fixture]
pub fn active_session() -> SessionHarness {
    let harness = SessionHarness::new(SessionConfig::default());
    harness.session.on_active();
    harness
}

/// Request with a fixed identifier and a one-byte payload.
#[must_use]
pub fn request(id: &str) -> RpcRequest { RpcRequest::with_id(id, "echo", "say", vec![0]) }
