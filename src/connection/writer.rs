//! Writer task owning the outbound half of a framed connection.

use std::{io, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::{Sink, SinkExt};
use log::{debug, warn};
use tokio::{
    sync::{Notify, mpsc},
    time::{Instant, sleep, timeout_at},
};
use tokio_util::sync::CancellationToken;

use super::transport::WriteRequest;
use crate::{
    message::{Frame, Message},
    transport::TransportError,
};

/// Serve queued writes until the connection closes.
///
/// `written` is signalled after every successful flush so the event loop can
/// track writer idleness. An I/O failure closes the connection; an encoding
/// failure only fails the offending write.
///
/// Once the connection is closed, writes that were already queued are still
/// flushed for up to `flush_timeout`. A write in progress at close time gets
/// the same allowance. Anything left afterwards fails with
/// [`TransportError::Closed`].
pub(super) async fn run<W>(
    mut sink: W,
    mut rx: mpsc::Receiver<WriteRequest>,
    shutdown: CancellationToken,
    written: Arc<Notify>,
    flush_timeout: Duration,
) where
    W: Sink<Bytes, Error = io::Error> + Unpin,
{
    let mut broken = false;
    loop {
        let request = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        let result = tokio::select! {
            result = write_frame(&mut sink, &request.frame) => result,
            () = expire_after_close(&shutdown, flush_timeout) => Err(TransportError::Closed),
        };
        broken = complete(result, request, &written, &shutdown);
        if broken {
            break;
        }
    }

    rx.close();
    let deadline = Instant::now() + flush_timeout;
    if !broken {
        while let Ok(request) = rx.try_recv() {
            let result = timeout_at(deadline, write_frame(&mut sink, &request.frame))
                .await
                .unwrap_or_else(|_| {
                    debug!("flush on close timed out: timeout={flush_timeout:?}");
                    Err(TransportError::Closed)
                });
            if complete(result, request, &written, &shutdown) {
                break;
            }
        }
    }
    while let Ok(request) = rx.try_recv() {
        let _ = request.ack.send(Err(TransportError::Closed));
    }
    match timeout_at(deadline, sink.close()).await {
        Ok(Err(err)) => warn!("failed to close connection cleanly: error={err}"),
        Err(_) => debug!("connection close timed out"),
        Ok(Ok(())) => {}
    }
}

/// Report `result` to the writer waiting on `request`. Returns `true` when the
/// sink is no longer usable.
fn complete(
    result: Result<(), TransportError>,
    request: WriteRequest,
    written: &Notify,
    shutdown: &CancellationToken,
) -> bool {
    let broken = match &result {
        Ok(()) => {
            written.notify_one();
            false
        }
        Err(TransportError::Io(err)) => {
            warn!("connection write failed: error={err}");
            shutdown.cancel();
            true
        }
        Err(TransportError::Closed) => true,
        Err(err) => {
            warn!("dropping unwritable frame: error={err}");
            false
        }
    };
    let _ = request.ack.send(result);
    broken
}

async fn expire_after_close(shutdown: &CancellationToken, flush_timeout: Duration) {
    shutdown.cancelled().await;
    sleep(flush_timeout).await;
}

async fn write_frame<W>(sink: &mut W, frame: &Frame) -> Result<(), TransportError>
where
    W: Sink<Bytes, Error = io::Error> + Unpin,
{
    let bytes = frame.to_bytes().map_err(TransportError::Encode)?;
    sink.send(Bytes::from(bytes)).await?;
    Ok(())
}
