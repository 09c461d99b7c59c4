//! Errors returned by [`RpcSession`](super::RpcSession) operations.

use thiserror::Error;

use super::SessionState;
use crate::{error::RpcError, message::RequestId};

/// Errors that prevent a request from being issued or answered.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session is not accepting requests.
    #[error("session is {0}, not active")]
    NotActive(SessionState),
    /// A request with the same identifier is already in flight.
    #[error("request id {0} is already pending")]
    DuplicateRequestId(RequestId),
    /// The request was issued but did not produce a response.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}
