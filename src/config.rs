//! Session configuration.
//!
//! [`SessionConfig`] collects the tunables of a [`RpcSession`] and of the
//! framed transport driving it.
//!
//! [`RpcSession`]: crate::session::RpcSession

use std::time::Duration;

/// Traffic direction watched by idle detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdleMode {
    /// Fire when nothing has been written for the idle interval.
    #[default]
    Writer,
    /// Fire when nothing has been read for the idle interval.
    Reader,
    /// Fire when nothing has been read or written for the idle interval.
    Both,
}

impl IdleMode {
    /// Returns `true` if outbound writes reset the idle timer.
    #[must_use]
    pub const fn tracks_writes(self) -> bool { matches!(self, Self::Writer | Self::Both) }

    /// Returns `true` if inbound reads reset the idle timer.
    #[must_use]
    pub const fn tracks_reads(self) -> bool { matches!(self, Self::Reader | Self::Both) }
}

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SLOW_RESPONSE: Duration = Duration::from_secs(5);
const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;
const MIN_FRAME_LENGTH: usize = 64;
const DEFAULT_WRITE_QUEUE: usize = 64;
const DEFAULT_CLOSE_FLUSH: Duration = Duration::from_secs(1);

/// Tunables for one RPC session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use rpclink::config::{IdleMode, SessionConfig};
///
/// let config = SessionConfig::default()
///     .idle_timeout(Duration::from_secs(10))
///     .idle_mode(IdleMode::Both)
///     .max_missed_heartbeats(Some(3));
/// assert_eq!(config.idle_timeout_value(), Duration::from_secs(10));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    idle_timeout: Duration,
    idle_mode: IdleMode,
    max_missed_heartbeats: Option<u32>,
    fail_pending_on_disconnect: bool,
    slow_response_threshold: Option<Duration>,
    max_frame_length: usize,
    write_queue_capacity: usize,
    close_flush_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_mode: IdleMode::default(),
            max_missed_heartbeats: None,
            fail_pending_on_disconnect: false,
            slow_response_threshold: Some(DEFAULT_SLOW_RESPONSE),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            write_queue_capacity: DEFAULT_WRITE_QUEUE,
            close_flush_timeout: DEFAULT_CLOSE_FLUSH,
        }
    }
}

impl SessionConfig {
    /// Interval without traffic after which a heartbeat is sent.
    ///
    /// Zero durations are raised to one millisecond.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Select which traffic resets the idle timer.
    #[must_use]
    pub fn idle_mode(mut self, mode: IdleMode) -> Self {
        self.idle_mode = mode;
        self
    }

    /// Close the connection after this many consecutive idle timeouts with no
    /// inbound traffic. `None` keeps the connection open indefinitely.
    #[must_use]
    pub fn max_missed_heartbeats(mut self, limit: Option<u32>) -> Self {
        self.max_missed_heartbeats = limit.map(|n| n.max(1));
        self
    }

    /// Settle still-pending requests with
    /// [`RpcError::ConnectionLost`](crate::error::RpcError::ConnectionLost)
    /// when the connection closes instead of leaving them unset.
    #[must_use]
    pub fn fail_pending_on_disconnect(mut self, enabled: bool) -> Self {
        self.fail_pending_on_disconnect = enabled;
        self
    }

    /// Warn about responses slower than `threshold`.
    #[must_use]
    pub fn slow_response_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_response_threshold = threshold;
        self
    }

    /// Maximum encoded frame size accepted by the framed transport.
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = length.max(MIN_FRAME_LENGTH);
        self
    }

    /// Number of writes that may queue for the writer task.
    #[must_use]
    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity.max(1);
        self
    }

    /// How long a closing connection may spend flushing writes that were
    /// already queued. Writes still unflushed afterwards fail with
    /// [`TransportError::Closed`](crate::transport::TransportError::Closed).
    #[must_use]
    pub fn close_flush_timeout(mut self, timeout: Duration) -> Self {
        self.close_flush_timeout = timeout;
        self
    }

    /// Configured idle interval.
    #[must_use]
    pub const fn idle_timeout_value(&self) -> Duration { self.idle_timeout }

    /// Configured idle mode.
    #[must_use]
    pub const fn idle_mode_value(&self) -> IdleMode { self.idle_mode }

    /// Configured missed-heartbeat limit.
    #[must_use]
    pub const fn max_missed_heartbeats_value(&self) -> Option<u32> { self.max_missed_heartbeats }

    /// Whether pending requests fail on disconnect.
    #[must_use]
    pub const fn fail_pending_on_disconnect_value(&self) -> bool {
        self.fail_pending_on_disconnect
    }

    /// Configured slow-response threshold.
    #[must_use]
    pub const fn slow_response_threshold_value(&self) -> Option<Duration> {
        self.slow_response_threshold
    }

    /// Configured maximum frame length.
    #[must_use]
    pub const fn max_frame_length_value(&self) -> usize { self.max_frame_length }

    /// Configured writer queue capacity.
    #[must_use]
    pub const fn write_queue_capacity_value(&self) -> usize { self.write_queue_capacity }

    /// Configured flush allowance on close.
    #[must_use]
    pub const fn close_flush_timeout_value(&self) -> Duration { self.close_flush_timeout }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, MIN_FRAME_LENGTH)]
    #[case(MIN_FRAME_LENGTH, MIN_FRAME_LENGTH)]
    #[case(4096, 4096)]
    fn max_frame_length_is_clamped(#[case] input: usize, #[case] expected: usize) {
        let config = SessionConfig::default().max_frame_length(input);
        assert_eq!(config.max_frame_length_value(), expected);
    }

    #[rstest]
    #[case(IdleMode::Writer, true, false)]
    #[case(IdleMode::Reader, false, true)]
    #[case(IdleMode::Both, true, true)]
    fn idle_mode_directions(#[case] mode: IdleMode, #[case] writes: bool, #[case] reads: bool) {
        assert_eq!(mode.tracks_writes(), writes);
        assert_eq!(mode.tracks_reads(), reads);
    }

    #[test]
    fn zero_missed_heartbeat_limit_is_raised() {
        let config = SessionConfig::default().max_missed_heartbeats(Some(0));
        assert_eq!(config.max_missed_heartbeats_value(), Some(1));
    }
}
