//! Utilities for exercising `rpclink` sessions in integration tests.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rpclink::{connection::ConnectionBuilder, test_helpers::RecordingRegistry};
//! use rpclink_testing::{ServerMode, duplex_connection};
//!
//! # async fn example() {
//! let registry = Arc::new(RecordingRegistry::default());
//! let (connection, peer) = duplex_connection(ConnectionBuilder::new(registry), None);
//! tokio::spawn(peer.serve(ServerMode::Echo));
//! # drop(connection);
//! # }
//! ```

pub mod echo_server;
pub mod logging;

pub use echo_server::{
    ServerMode,
    TestPeer,
    duplex_connection,
    duplex_connection_with_capacity,
    process_frame,
};
pub use logging::{LoggerHandle, logger};
pub use rpclink::test_helpers::{RecordingRegistry, RecordingTransport};
