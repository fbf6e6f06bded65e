//! Readiness gate: cross-task milestone signalling.
//!
//! A small shared bit-set of [`ReadinessFlag`]s plus a condition variable.
//! Producers (`set` / `clear`) run in event-dispatch contexts and only hold
//! the lock for a single bit operation; consumers block in [`ReadinessGate::wait`]
//! until every requested bit is set or the timeout elapses.
//!
//! ```text
//!  link-mon task ──set/clear LINK──┐
//!                                  ├──▶ ReadinessGate ──wait(mask, t)──▶ orchestrator
//!  mqtt dispatch ──set/clear MQTT──┘
//! ```
//!
//! Unlike a one-shot notify, observing a flag never consumes it: flags stay
//! set until their producer clears them on a disconnect.

use core::fmt;
use core::ops::BitOr;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// A single connectivity milestone.  Each flag has exactly one producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadinessFlag {
    /// Station associated and holds an IP address (producer: connectivity monitor).
    LinkConnected = 0b0000_0001,
    /// Protocol client connected to the broker (producer: protocol adapter).
    ProtocolConnected = 0b0000_0010,
}

impl ReadinessFlag {
    /// Return the bitmask for this flag.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// A set of [`ReadinessFlag`]s, used both as a wait mask and as the
/// observed state returned by a wait.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSet(u8);

impl FlagSet {
    pub const EMPTY: Self = Self(0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if every bit of `other` is set in `self`.
    pub const fn contains_all(self, other: FlagSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn contains(self, flag: ReadinessFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    const fn with(self, flag: ReadinessFlag) -> Self {
        Self(self.0 | flag.mask())
    }

    const fn without(self, flag: ReadinessFlag) -> Self {
        Self(self.0 & !flag.mask())
    }
}

impl From<ReadinessFlag> for FlagSet {
    fn from(flag: ReadinessFlag) -> Self {
        Self(flag.mask())
    }
}

impl BitOr for ReadinessFlag {
    type Output = FlagSet;

    fn bitor(self, rhs: Self) -> FlagSet {
        FlagSet(self.mask() | rhs.mask())
    }
}

impl BitOr<ReadinessFlag> for FlagSet {
    type Output = FlagSet;

    fn bitor(self, rhs: ReadinessFlag) -> FlagSet {
        self.with(rhs)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagSet(0b{:08b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Shared, thread-safe readiness bit-set.
///
/// Constructed once by the orchestrator and handed to every producer and
/// consumer behind an `Arc`.  No operation can fail: a poisoned lock is
/// recovered because a plain bit-set has no invariant a panicking holder
/// could leave half-updated.
pub struct ReadinessGate {
    bits: Mutex<FlagSet>,
    changed: Condvar,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub const fn new() -> Self {
        Self {
            bits: Mutex::new(FlagSet::EMPTY),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlagSet> {
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set `flag` and wake all waiters.  Idempotent.
    pub fn set(&self, flag: ReadinessFlag) {
        let mut bits = self.lock();
        let next = bits.with(flag);
        if next != *bits {
            *bits = next;
            self.changed.notify_all();
        }
    }

    /// Clear `flag`.  Idempotent.
    pub fn clear(&self, flag: ReadinessFlag) {
        let mut bits = self.lock();
        *bits = bits.without(flag);
    }

    /// Non-blocking snapshot of the current bits.
    pub fn bits(&self) -> FlagSet {
        *self.lock()
    }

    /// Block until every flag in `mask` is set, or until `timeout` elapses
    /// (`None` waits forever).
    ///
    /// Returns the bit-set observed at wake time.  A timeout is not an
    /// error: callers check the returned set with [`FlagSet::contains_all`].
    pub fn wait(&self, mask: impl Into<FlagSet>, timeout: Option<Duration>) -> FlagSet {
        let mask = mask.into();
        let guard = self.lock();
        let guard = match timeout {
            None => self
                .changed
                .wait_while(guard, |bits| !bits.contains_all(mask))
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.changed
                    .wait_timeout_while(guard, timeout, |bits| !bits.contains_all(mask))
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        *guard
    }
}
