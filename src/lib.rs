#![doc(html_root_url = "https://docs.rs/rpclink/latest")]
//! Public API for the `rpclink` library.
//!
//! This crate correlates requests and responses multiplexed over a single
//! persistent RPC connection. Each connection owns an [`RpcSession`] that
//! registers a single-assignment [`RpcFuture`] per outgoing request, settles
//! it when the matching response arrives, keeps the connection warm with
//! heartbeats when it goes idle, and deregisters itself from the connection
//! registry when the connection closes.

pub mod config;
pub mod connection;
pub mod connection_info;
pub mod correlation;
pub mod error;
pub mod future;
pub mod message;
pub mod metrics;
pub mod pending;
pub mod registry;
pub mod session;
pub mod test_helpers;
pub mod transport;

pub use config::{IdleMode, SessionConfig};
pub use connection::{Connection, ConnectionBuilder, FramedTransport};
pub use connection_info::{RpcConnectionInfo, RpcServiceInfo};
pub use correlation::CorrelatableFrame;
pub use error::{RpcError, RpcOutcome};
pub use future::RpcFuture;
pub use message::{Frame, RequestId, RpcRequest, RpcResponse};
pub use pending::PendingRequests;
pub use registry::{ConnectionRegistry, SessionRegistry};
pub use session::{RpcSession, SessionError, SessionId, SessionState};
pub use transport::{Transport, TransportError};
