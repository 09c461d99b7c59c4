//! Single-assignment completion handle for an in-flight request.
//!
//! [`RpcFuture`] is settled exactly once by the connection's inbound context
//! and may be awaited by any number of readers, either asynchronously via
//! [`RpcFuture::wait`] or from plain threads via [`RpcFuture::wait_blocking`].
//! Both waits take a deadline; expiry yields [`RpcError::Timeout`] and leaves
//! the handle untouched so a late settlement still succeeds harmlessly.

use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, OnceLock, PoisonError},
    time::{Duration, Instant},
};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::{
    error::{RpcError, RpcOutcome},
    message::RequestId,
};

struct Inner {
    request_id: RequestId,
    outcome: OnceLock<RpcOutcome>,
    notify: Notify,
    lock: Mutex<()>,
    cond: Condvar,
    started: Instant,
    slow_threshold: Option<Duration>,
}

/// Cloneable handle to the eventual outcome of one request.
#[derive(Clone)]
pub struct RpcFuture(Arc<Inner>);

impl RpcFuture {
    /// Create an unsettled handle bound to `request_id`.
    #[must_use]
    pub fn new(request_id: RequestId) -> Self { Self::with_slow_threshold(request_id, None) }

    /// Create an unsettled handle that warns when settled after `threshold`.
    #[must_use]
    pub fn with_slow_threshold(request_id: RequestId, threshold: Option<Duration>) -> Self {
        Self(Arc::new(Inner {
            request_id,
            outcome: OnceLock::new(),
            notify: Notify::new(),
            lock: Mutex::new(()),
            cond: Condvar::new(),
            started: Instant::now(),
            slow_threshold: threshold,
        }))
    }

    /// Identifier of the request this handle belongs to.
    #[must_use]
    pub fn request_id(&self) -> &RequestId { &self.0.request_id }

    /// Time elapsed since the handle was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration { self.0.started.elapsed() }

    /// Returns `true` once an outcome has been recorded.
    #[must_use]
    pub fn is_done(&self) -> bool { self.0.outcome.get().is_some() }

    /// Return the recorded outcome without waiting.
    #[must_use]
    pub fn try_result(&self) -> Option<RpcOutcome> { self.0.outcome.get().cloned() }

    /// Record `outcome` and wake every waiter.
    ///
    /// Only the first call has any effect; subsequent calls are ignored and
    /// return `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpclink::{future::RpcFuture, message::RpcResponse};
    ///
    /// let future = RpcFuture::new("req-1".into());
    /// assert!(future.complete(Ok(RpcResponse::ok("req-1", vec![1]))));
    /// assert!(!future.complete(Ok(RpcResponse::ok("req-1", vec![2]))));
    /// assert_eq!(future.try_result(), Some(Ok(RpcResponse::ok("req-1", vec![1]))));
    /// ```
    pub fn complete(&self, outcome: RpcOutcome) -> bool {
        if self.0.outcome.set(outcome).is_err() {
            debug!(request_id = %self.0.request_id, "ignoring second completion");
            return false;
        }
        let elapsed = self.elapsed();
        if let Some(threshold) = self.0.slow_threshold
            && elapsed > threshold
        {
            warn!(
                request_id = %self.0.request_id,
                elapsed_ms = elapsed.as_millis(),
                "slow response"
            );
        }
        // Taking the lock orders this wakeup after any blocking waiter's check.
        drop(self.0.lock.lock().unwrap_or_else(PoisonError::into_inner));
        self.0.cond.notify_all();
        self.0.notify.notify_waiters();
        true
    }

    /// Wait asynchronously for the outcome, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] when the deadline passes first, or the
    /// error the handle was settled with.
    pub async fn wait(&self, timeout: Duration) -> RpcOutcome {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if let Some(outcome) = self.try_result() {
            return outcome;
        }
        if tokio::time::timeout(timeout, notified).await.is_err() {
            return Err(RpcError::Timeout(timeout));
        }
        self.try_result().unwrap_or(Err(RpcError::Timeout(timeout)))
    }

    /// Block the current thread until the outcome is known or `timeout` passes.
    ///
    /// Must not be called from within an async runtime worker.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] when the deadline passes first, or the
    /// error the handle was settled with.
    pub fn wait_blocking(&self, timeout: Duration) -> RpcOutcome {
        let deadline = Instant::now() + timeout;
        let mut guard = self.0.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = self.try_result() {
                return outcome;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RpcError::Timeout(timeout));
            }
            guard = self
                .0
                .cond
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl fmt::Debug for RpcFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcFuture")
            .field("request_id", &self.0.request_id)
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}
