//! Shared capture of log records emitted by `rpclink`.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use log::Level;
use logtest::Logger;
use rstest::fixture;

/// Exclusive handle to the process-wide [`Logger`].
///
/// Tests capturing logs run one at a time while holding this guard, so
/// records from concurrent tests do not interleave.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the global logger and discard records left by earlier tests.
    #[must_use]
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let mut guard = logger.lock().unwrap_or_else(PoisonError::into_inner);
        while guard.pop().is_some() {}
        Self { guard }
    }

    /// Drain captured records as `(level, message)` pairs.
    pub fn drain(&mut self) -> Vec<(Level, String)> {
        std::iter::from_fn(|| self.guard.pop())
            .map(|record| (record.level(), record.args().to_string()))
            .collect()
    }

    /// Drain captured records and count those at `level` containing `fragment`.
    pub fn count(&mut self, level: Level, fragment: &str) -> usize {
        self.drain()
            .iter()
            .filter(|(lvl, msg)| *lvl == level && msg.contains(fragment))
            .count()
    }
}

impl Default for LoggerHandle {
    fn default() -> Self { Self::new() }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
