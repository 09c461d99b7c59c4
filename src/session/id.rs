//! Process-unique session identifiers.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier assigned to every [`RpcSession`](super::RpcSession) when it is
/// created.
///
/// Distinguishes sessions that share an equal
/// [`RpcConnectionInfo`](crate::connection_info::RpcConnectionInfo), such as
/// a connection and its replacement after a reconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(super) fn next() -> Self { Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(self) -> u64 { self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "SessionId({})", self.0) }
}
