//! Count of connections whose event loop is still running.

use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

/// RAII guard held by a connection's event loop for its whole lifetime.
pub(super) struct LiveConnection;

impl LiveConnection {
    pub(super) fn acquire() -> Self {
        LIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        Self
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) { LIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed); }
}

/// Number of framed connections whose event loop has not yet exited.
#[must_use]
pub fn live_connection_count() -> u64 { LIVE_CONNECTIONS.load(Ordering::Relaxed) }
