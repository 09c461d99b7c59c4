//! Registry of live RPC sessions.
//!
//! [`ConnectionRegistry`] is the interface a session uses to deregister itself
//! when its connection closes. [`SessionRegistry`] implements it with
//! non-owning weak references keyed by [`RpcConnectionInfo`], so a registered
//! session is not kept alive by the registry. Dead entries are pruned
//! opportunistically or lazily at lookup time.
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::{
    connection_info::RpcConnectionInfo,
    session::{RpcSession, SessionId},
    transport::Transport,
};

/// Connection registry collaborator as seen by a session.
pub trait ConnectionRegistry: Send + Sync + 'static {
    /// Forget the session `id` registered under `info`.
    ///
    /// An entry now held by a different session under an equal identity is
    /// left in place.
    fn remove_session(&self, info: &RpcConnectionInfo, id: SessionId);
}

/// Concurrent registry of sessions keyed by [`RpcConnectionInfo`].
pub struct SessionRegistry<T>(DashMap<RpcConnectionInfo, Weak<RpcSession<T>>>);

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self { Self(DashMap::new()) }
}

impl<T: Transport> SessionRegistry<T> {
    /// Retrieve the session for `info` if it is still alive.
    pub fn get(&self, info: &RpcConnectionInfo) -> Option<Arc<RpcSession<T>>> {
        let guard = self.0.get(info);
        let session = guard.as_ref().and_then(|weak| weak.upgrade());
        drop(guard);
        if session.is_none() {
            self.0.remove_if(info, |_, weak| weak.strong_count() == 0);
        }
        session
    }

    /// Register a session for a newly established connection.
    pub fn insert(&self, info: RpcConnectionInfo, session: &Arc<RpcSession<T>>) {
        self.0.insert(info, Arc::downgrade(session));
    }

    /// Remove a session, typically on connection teardown.
    pub fn remove(&self, info: &RpcConnectionInfo) { self.0.remove(info); }

    /// Number of registered entries, including ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns `true` when no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Remove all stale weak references without returning any sessions.
    ///
    /// Shards are locked one at a time while pruning.
    pub fn prune(&self) { self.0.retain(|_, weak| weak.strong_count() > 0); }

    /// Prune stale weak references, then collect the remaining live sessions.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<(RpcConnectionInfo, Arc<RpcSession<T>>)> {
        let mut sessions = Vec::with_capacity(self.0.len());
        self.0.retain(|info, weak| {
            if let Some(session) = weak.upgrade() {
                sessions.push((info.clone(), session));
                true
            } else {
                false
            }
        });
        sessions
    }
}

impl<T: Transport> ConnectionRegistry for SessionRegistry<T> {
    fn remove_session(&self, info: &RpcConnectionInfo, id: SessionId) {
        self.0.remove_if(info, |_, weak| {
            weak.upgrade().is_none_or(|session| session.id() == id)
        });
    }
}
