//! End-to-end tests of framed connections over an in-memory stream.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use rpclink::{
    config::{IdleMode, SessionConfig},
    connection::ConnectionBuilder,
    connection_info::RpcConnectionInfo,
    error::RpcError,
    message::{Frame, RpcRequest, RpcResponse},
    session::{SessionError, SessionState},
};
use rpclink_testing::{
    RecordingRegistry,
    ServerMode,
    duplex_connection,
    duplex_connection_with_capacity,
};
use rstest::{fixture, rstest};

mod common;
use common::{TestResult, peer_addr, request};

#[fixture]
fn registry() -> Arc<RecordingRegistry> { Arc::new(RecordingRegistry::default()) }

fn builder(registry: &Arc<RecordingRegistry>, config: SessionConfig) -> ConnectionBuilder {
    ConnectionBuilder::new(registry.clone()).config(config)
}

#[rstest]
#[tokio::test]
async fn echo_call_round_trips(registry: Arc<RecordingRegistry>) -> TestResult {
    let (connection, peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    tokio::spawn(peer.serve(ServerMode::Echo));

    let session = connection.session();
    assert_eq!(session.state(), SessionState::Active);
    let response = session
        .call(
            RpcRequest::with_id("req-1", "echo", "say", b"hello".to_vec()),
            Duration::from_secs(5),
        )
        .await?;
    assert_eq!(response.request_id().as_str(), "req-1");
    assert_eq!(response.payload(), b"hello");
    assert_eq!(session.pending_len(), 0);

    connection.close();
    connection.closed().await;
    Ok(())
}

/// An idle connection writes a heartbeat frame carrying no request id.
#[rstest]
#[tokio::test(start_paused = true)]
async fn idle_connection_sends_heartbeat(registry: Arc<RecordingRegistry>) {
    let config = SessionConfig::default().idle_timeout(Duration::from_secs(1));
    let (connection, mut peer) = duplex_connection(builder(&registry, config), Some(peer_addr()));

    assert_eq!(peer.recv().await, Some(Frame::Heartbeat));
    assert_eq!(connection.session().pending_len(), 0);

    connection.close();
    connection.closed().await;
}

/// When the peer stops answering heartbeats the connection gives up.
#[rstest]
#[tokio::test(start_paused = true)]
async fn unanswered_heartbeats_close_connection(registry: Arc<RecordingRegistry>) {
    let config = SessionConfig::default()
        .idle_timeout(Duration::from_secs(1))
        .max_missed_heartbeats(Some(2));
    let (connection, peer) = duplex_connection(builder(&registry, config), Some(peer_addr()));
    let server = tokio::spawn(peer.serve(ServerMode::Silent));

    connection.closed().await;
    assert_eq!(connection.session().state(), SessionState::Inactive);
    assert_eq!(
        registry.removals(),
        vec![RpcConnectionInfo::from_addr(peer_addr())]
    );
    server.abort();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn answered_heartbeats_keep_connection_open(registry: Arc<RecordingRegistry>) {
    let config = SessionConfig::default()
        .idle_timeout(Duration::from_secs(1))
        .max_missed_heartbeats(Some(2));
    let (connection, peer) = duplex_connection(builder(&registry, config), Some(peer_addr()));
    tokio::spawn(peer.serve(ServerMode::Echo));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connection.session().state(), SessionState::Active);

    connection.close();
    connection.closed().await;
}

/// Dropping the server side ends the session and deregisters it once.
#[rstest]
#[tokio::test]
async fn peer_disconnect_deregisters_session(registry: Arc<RecordingRegistry>) -> TestResult {
    let (connection, peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    let pending = connection.session().send(request("req-1")).await?;
    drop(peer);

    connection.closed().await;
    let session = connection.session();
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(
        registry.removals(),
        vec![RpcConnectionInfo::from_addr(peer_addr())]
    );
    assert!(!pending.is_done());
    assert_eq!(
        session.send(request("req-2")).await.err(),
        Some(SessionError::NotActive(SessionState::Inactive))
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn disconnect_policy_fails_in_flight_calls(registry: Arc<RecordingRegistry>) -> TestResult {
    let config = SessionConfig::default().fail_pending_on_disconnect(true);
    let (connection, mut peer) = duplex_connection(builder(&registry, config), Some(peer_addr()));
    let pending = connection.session().send(request("req-1")).await?;
    assert!(matches!(peer.recv().await, Some(Frame::Request(_))));
    drop(peer);

    assert_eq!(
        pending.wait(Duration::from_secs(5)).await,
        Err(RpcError::ConnectionLost)
    );
    connection.closed().await;
    Ok(())
}

/// Without a peer address the session has no identity to deregister.
#[rstest]
#[tokio::test]
async fn anonymous_connection_skips_deregistration(registry: Arc<RecordingRegistry>) {
    let (connection, peer) = duplex_connection(builder(&registry, SessionConfig::default()), None);
    drop(peer);

    connection.closed().await;
    assert!(connection.session().connection_info().is_none());
    assert!(registry.removals().is_empty());
}

#[rstest]
#[tokio::test]
async fn explicit_identity_is_deregistered(registry: Arc<RecordingRegistry>) {
    let addr: SocketAddr = "192.168.1.20:7000".parse().expect("valid address");
    let info = RpcConnectionInfo::new("registry-host", 7000, Vec::new());
    let (connection, peer) = duplex_connection(
        builder(&registry, SessionConfig::default()).connection_info(info.clone()),
        Some(addr),
    );
    drop(peer);

    connection.closed().await;
    assert_eq!(registry.removals(), vec![info]);
}

/// Bytes that do not decode as a frame close the connection.
#[rstest]
#[tokio::test]
async fn malformed_frame_closes_connection(registry: Arc<RecordingRegistry>) {
    let (connection, mut peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    peer.send_raw(&[0x07]).await;

    connection.closed().await;
    assert_eq!(connection.session().state(), SessionState::Inactive);
    assert_eq!(registry.removals().len(), 1);
    assert_eq!(peer.recv().await, None);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn silent_peer_times_out_call(registry: Arc<RecordingRegistry>) {
    let (connection, peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    tokio::spawn(peer.serve(ServerMode::Silent));

    let result = connection
        .session()
        .call(request("req-1"), Duration::from_millis(200))
        .await;
    assert_eq!(
        result.err(),
        Some(SessionError::Rpc(RpcError::Timeout(Duration::from_millis(
            200
        ))))
    );
    assert_eq!(connection.session().pending_len(), 0);

    connection.close();
    connection.closed().await;
}

/// Responses tagged with the wrong id leave the caller waiting.
#[rstest]
#[tokio::test(start_paused = true)]
async fn mismatched_response_is_not_delivered(registry: Arc<RecordingRegistry>) {
    let (connection, peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    tokio::spawn(peer.serve(ServerMode::Mismatch));

    let result = connection
        .session()
        .call(request("req-1"), Duration::from_millis(500))
        .await;
    assert!(matches!(
        result,
        Err(SessionError::Rpc(RpcError::Timeout(_)))
    ));

    connection.close();
    connection.closed().await;
}

/// Responses delivered out of order reach the right callers.
#[rstest]
#[tokio::test]
async fn out_of_order_responses_are_matched(registry: Arc<RecordingRegistry>) -> TestResult {
    let (connection, mut peer) = duplex_connection(
        builder(&registry, SessionConfig::default()),
        Some(peer_addr()),
    );
    let session = connection.session();
    let first = session.send(request("a")).await?;
    let second = session.send(request("b")).await?;
    for _ in 0..2 {
        assert!(matches!(peer.recv().await, Some(Frame::Request(_))));
    }

    peer.send(RpcResponse::ok("b", vec![2]).into()).await;
    peer.send(RpcResponse::ok("a", vec![1]).into()).await;

    assert_eq!(first.wait(Duration::from_secs(5)).await?.payload(), &[1]);
    assert_eq!(second.wait(Duration::from_secs(5)).await?.payload(), &[2]);

    connection.close();
    connection.closed().await;
    Ok(())
}

/// A write stalled behind a peer that stopped reading must not hold up
/// inbound responses, even while heartbeats fall due.
#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_writer_does_not_block_responses(
    registry: Arc<RecordingRegistry>,
) -> TestResult {
    let config = SessionConfig::default()
        .idle_mode(IdleMode::Reader)
        .idle_timeout(Duration::from_secs(1));
    let (connection, mut peer) =
        duplex_connection_with_capacity(builder(&registry, config), Some(peer_addr()), 64);
    let session = connection.session().clone();

    let first = session
        .send(RpcRequest::with_id("a", "echo", "say", vec![9]))
        .await?;
    assert!(matches!(peer.recv().await, Some(Frame::Request(_))));

    let large = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .send(RpcRequest::with_id("b", "echo", "say", vec![0; 1024 * 1024]))
                .await
        }
    });
    tokio::time::sleep(Duration::from_secs(3)).await;
    peer.send(RpcResponse::ok("a", vec![9]).into()).await;

    let response = first.wait(Duration::from_secs(5)).await?;
    assert_eq!(response.payload(), &[9]);
    assert_eq!(session.state(), SessionState::Active);

    connection.close();
    connection.closed().await;
    let _ = large.await?;
    Ok(())
}
