//! Per-connection table of requests awaiting a response.
//!
//! `PendingRequests` maps each in-flight [`RequestId`] to the
//! [`RpcFuture`] returned to its caller. Sends insert from arbitrary tasks
//! while the inbound context removes entries as responses arrive, so the map
//! is a [`DashMap`] with per-shard locking and no wider lock.

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{future::RpcFuture, message::RequestId, session::SessionError};

/// Concurrent map of outstanding completion handles.
#[derive(Default)]
pub struct PendingRequests(DashMap<RequestId, RpcFuture>);

impl PendingRequests {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert `future` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateRequestId`] if `id` is already
    /// pending; the existing entry is left untouched.
    pub fn register(&self, id: RequestId, future: RpcFuture) -> Result<(), SessionError> {
        match self.0.entry(id) {
            Entry::Occupied(entry) => Err(SessionError::DuplicateRequestId(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(future);
                Ok(())
            }
        }
    }

    /// Atomically remove and return the entry for `id`.
    ///
    /// A second `take` for the same identifier reports `None`.
    pub fn take(&self, id: &RequestId) -> Option<RpcFuture> { self.0.remove(id).map(|(_, f)| f) }

    /// Returns `true` if `id` is pending.
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool { self.0.contains_key(id) }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Remove every entry, returning the handles that were pending.
    ///
    /// Entries inserted concurrently with the drain may survive it.
    pub fn drain(&self) -> Vec<RpcFuture> {
        let ids: Vec<RequestId> = self.0.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter_map(|id| self.take(id)).collect()
    }
}
