//! Metric helpers for `rpclink`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking active sessions.
pub const SESSIONS_ACTIVE: &str = "rpclink_sessions_active";
/// Name of the gauge tracking requests awaiting a response.
pub const PENDING_REQUESTS: &str = "rpclink_pending_requests";
/// Name of the counter tracking responses with no pending request.
pub const UNMATCHED_RESPONSES: &str = "rpclink_unmatched_responses_total";
/// Name of the counter tracking heartbeats written.
pub const HEARTBEATS_SENT: &str = "rpclink_heartbeats_sent_total";
/// Name of the counter tracking failed request writes.
pub const WRITE_FAILURES: &str = "rpclink_write_failures_total";

/// Increment the active sessions gauge.
pub fn inc_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).increment(1.0);
}

/// Decrement the active sessions gauge.
pub fn dec_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

/// Record a newly registered pending request.
pub fn inc_pending() {
    #[cfg(feature = "metrics")]
    gauge!(PENDING_REQUESTS).increment(1.0);
}

/// Record `count` pending requests leaving the table.
#[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "no-op without metrics"))]
pub fn dec_pending(count: usize) {
    #[cfg(feature = "metrics")]
    #[expect(clippy::cast_precision_loss, reason = "gauge values are approximate")]
    gauge!(PENDING_REQUESTS).decrement(count as f64);
}

/// Record a response that matched no pending request.
pub fn inc_unmatched() {
    #[cfg(feature = "metrics")]
    counter!(UNMATCHED_RESPONSES).increment(1);
}

/// Record a heartbeat written to the transport.
pub fn inc_heartbeats() {
    #[cfg(feature = "metrics")]
    counter!(HEARTBEATS_SENT).increment(1);
}

/// Record a request the transport failed to write.
pub fn inc_write_failures() {
    #[cfg(feature = "metrics")]
    counter!(WRITE_FAILURES).increment(1);
}
