//! Timestamps and the clock collaborator.
//!
//! The core never reads the wall clock itself. Every time-dependent call
//! receives a [`Timestamp`] from a [`Clock`], so tests and simulations can
//! drive time explicitly with [`ManualClock`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds since the UNIX epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// `self + secs`, saturating at the far future.
    #[must_use]
    pub fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn secs_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "t+{}s", self.0),
        }
    }
}

/// Source of the current time. Monotonic and owned by the host.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system time collapses to zero rather than panicking.
        Timestamp(u64::try_from(Utc::now().timestamp()).unwrap_or(0))
    }
}

/// Externally driven clock. Clones share the same underlying time, so a
/// test can keep one handle and hand another to the gate.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start.0)),
        }
    }

    pub fn set(&self, t: Timestamp) {
        self.secs.store(t.0, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta` seconds, saturating at the end of
    /// time. Returns the new time.
    pub fn advance_secs(&self, delta: u64) -> Timestamp {
        let step = |s: u64| Some(s.saturating_add(delta));
        match self.secs.fetch_update(Ordering::SeqCst, Ordering::SeqCst, step) {
            Ok(prev) | Err(prev) => Timestamp(prev.saturating_add(delta)),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
