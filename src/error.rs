//! Outcome errors delivered through an [`RpcFuture`](crate::future::RpcFuture).

use std::time::Duration;

use thiserror::Error;

/// Reasons an RPC did not produce a response.
///
/// The type is cloneable because a settled outcome is observed by every
/// reader of the completion handle.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// No response arrived before the caller's deadline.
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),
    /// The transport failed to write the request.
    #[error("failed to write request: {0}")]
    WriteFailed(String),
    /// The connection closed while the request was in flight.
    #[error("connection lost before a response arrived")]
    ConnectionLost,
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
    /// The peer answered with an error.
    #[error("remote error: {0}")]
    Remote(String),
}

/// Result observed by waiters on a completion handle.
pub type RpcOutcome = Result<crate::message::RpcResponse, RpcError>;
