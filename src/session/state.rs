//! Session lifecycle state.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle of a session.
///
/// Transitions only move forward:
/// `Unregistered -> Active -> Inactive`, or straight to `Inactive` if the
/// connection closes before it was ever registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Created, but the connection has not been registered with its runtime.
    Unregistered = 0,
    /// The connection is registered and the peer address is known.
    Active = 1,
    /// The connection has closed. Terminal.
    Inactive = 2,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unregistered,
            1 => Self::Active,
            _ => Self::Inactive,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unregistered => "unregistered",
            Self::Active => "active",
            Self::Inactive => "inactive",
        };
        f.write_str(name)
    }
}

/// Atomic cell enforcing forward-only transitions.
pub(super) struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub(super) const fn new() -> Self { Self(AtomicU8::new(SessionState::Unregistered as u8)) }

    pub(super) fn load(&self) -> SessionState { SessionState::from_u8(self.0.load(Ordering::Acquire)) }

    /// Move `Unregistered -> Active`. Returns `false` from any other state.
    pub(super) fn activate(&self) -> bool {
        self.0
            .compare_exchange(
                SessionState::Unregistered as u8,
                SessionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Inactive`, returning the state that was replaced.
    pub(super) fn deactivate(&self) -> SessionState {
        SessionState::from_u8(self.0.swap(SessionState::Inactive as u8, Ordering::AcqRel))
    }
}
