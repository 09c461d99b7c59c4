//! Inbound event loop delivering connection events to a session.
//!
//! All session callbacks for one connection are invoked from this loop, so
//! they never run concurrently with each other.

use std::{io, sync::Arc};

use bytes::BytesMut;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use tokio::{
    sync::Notify,
    time::{Instant, sleep},
};
use tokio_util::sync::CancellationToken;

use super::FramedTransport;
use crate::{
    config::SessionConfig,
    message::{Frame, Message},
    session::RpcSession,
    transport::TransportError,
};

/// Drive `session` from inbound frames and idle timers until the connection
/// closes, then report the loss exactly once.
pub(super) async fn run<R>(
    mut frames: R,
    session: Arc<RpcSession<FramedTransport>>,
    shutdown: CancellationToken,
    written: Arc<Notify>,
    config: SessionConfig,
) where
    R: Stream<Item = Result<BytesMut, io::Error>> + Unpin,
{
    let idle = config.idle_timeout_value();
    let mode = config.idle_mode_value();
    let timer = sleep(idle);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            item = frames.next() => {
                let Some(item) = item else {
                    debug!("connection closed by peer: peer={:?}", session.peer_addr());
                    break;
                };
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        session.on_transport_error(&TransportError::Io(err));
                        break;
                    }
                };
                if mode.tracks_reads() {
                    timer.as_mut().reset(Instant::now() + idle);
                }
                match Frame::from_bytes(&bytes) {
                    Ok((Frame::Response(response), _)) => session.on_response(response),
                    Ok((Frame::Heartbeat, _)) => session.on_heartbeat(),
                    Ok((Frame::Request(request), _)) => warn!(
                        "ignoring request frame from server: request_id={}",
                        request.request_id()
                    ),
                    Err(err) => {
                        session.on_transport_error(&TransportError::Decode(err));
                        break;
                    }
                }
            }
            () = written.notified() => {
                if mode.tracks_writes() {
                    timer.as_mut().reset(Instant::now() + idle);
                }
            }
            () = &mut timer => {
                session.on_idle_timeout();
                timer.as_mut().reset(Instant::now() + idle);
            }
        }
    }

    shutdown.cancel();
    session.on_connection_lost();
}
