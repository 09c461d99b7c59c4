//! Tests for session lifecycle transitions and registry cleanup.

use std::{sync::Arc, time::Duration};

use rpclink::{
    config::SessionConfig,
    connection_info::{RpcConnectionInfo, RpcServiceInfo},
    error::RpcError,
    registry::SessionRegistry,
    session::{RpcSession, SessionError, SessionState},
};
use rpclink_testing::RecordingTransport;
use rstest::rstest;

mod common;
use common::{SessionHarness, TestResult, active_session, peer_addr, request};

#[test]
fn new_session_is_unregistered() {
    let harness = SessionHarness::new(SessionConfig::default());
    assert_eq!(harness.session.state(), SessionState::Unregistered);
    assert!(harness.session.peer_addr().is_none());
}

#[rstest]
fn activation_captures_peer(active_session: SessionHarness) {
    assert_eq!(active_session.session.state(), SessionState::Active);
    assert_eq!(active_session.session.peer_addr(), Some(peer_addr()));
    assert_eq!(
        active_session.session.connection_info(),
        Some(&RpcConnectionInfo::from_addr(peer_addr()))
    );
}

/// Deregistration happens once, with the identity captured while active,
/// even though the transport can no longer report its address.
#[rstest]
fn loss_deregisters_exactly_once(active_session: SessionHarness) {
    active_session.transport.set_peer_addr(None);
    for _ in 0..3 {
        active_session.session.on_connection_lost();
    }
    assert_eq!(
        active_session.registry.removals(),
        vec![RpcConnectionInfo::from_addr(peer_addr())]
    );
}

#[rstest]
#[tokio::test]
async fn inactive_session_rejects_sends(active_session: SessionHarness) {
    active_session.session.on_connection_lost();
    active_session.session.on_active();
    assert_eq!(active_session.session.state(), SessionState::Inactive);
    assert_eq!(
        active_session.session.send(request("late")).await.err(),
        Some(SessionError::NotActive(SessionState::Inactive))
    );
    assert!(active_session.transport.written().is_empty());
}

/// A request in flight when the connection drops is abandoned; the caller's
/// deadline bounds the wait.
#[rstest]
#[tokio::test(start_paused = true)]
async fn abandoned_request_times_out(active_session: SessionHarness) -> TestResult {
    let future = active_session.session.send(request("req-1")).await?;
    active_session.session.on_connection_lost();

    let outcome = future.wait(Duration::from_millis(200)).await;
    assert_eq!(outcome, Err(RpcError::Timeout(Duration::from_millis(200))));
    Ok(())
}

/// The blocking wait honours the deadline just like the async one.
#[rstest]
fn abandoned_request_times_out_blocking(active_session: SessionHarness) -> TestResult {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let future = runtime.block_on(active_session.session.send(request("req-1")))?;
    active_session.session.on_connection_lost();

    let outcome = future.wait_blocking(Duration::from_millis(200));
    assert_eq!(outcome, Err(RpcError::Timeout(Duration::from_millis(200))));
    Ok(())
}

#[tokio::test]
async fn disconnect_policy_fails_pending_requests() -> TestResult {
    let harness = SessionHarness::new(SessionConfig::default().fail_pending_on_disconnect(true));
    harness.session.on_active();
    let future = harness.session.send(request("req-1")).await?;
    harness.session.on_connection_lost();

    assert_eq!(
        future.wait(Duration::from_secs(1)).await,
        Err(RpcError::ConnectionLost)
    );
    Ok(())
}

/// A session registered in a [`SessionRegistry`] removes itself on loss.
#[test]
fn session_leaves_registry_on_loss() {
    let registry = Arc::new(SessionRegistry::<RecordingTransport>::default());
    let info = RpcConnectionInfo::new(
        "10.0.0.5",
        9000,
        vec![RpcServiceInfo::new("A", "1"), RpcServiceInfo::new("B", "1")],
    );
    let session = Arc::new(
        RpcSession::new(RecordingTransport::new(Some(peer_addr())), registry.clone())
            .with_connection_info(info.clone()),
    );
    registry.insert(info.clone(), &session);
    session.on_active();
    assert!(registry.get(&info).is_some());

    session.on_connection_lost();
    assert!(registry.get(&info).is_none());
    assert!(registry.is_empty());
}

#[rstest]
fn transport_error_forces_close(active_session: SessionHarness) {
    active_session
        .session
        .on_transport_error(&rpclink::transport::TransportError::Closed);
    assert!(active_session.transport.is_closed());
}
