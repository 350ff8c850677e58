//! # Clock Capabilities
//!
//! Timestamp sources consumed by the MVCC manager. The clock is passed to
//! the manager as a capability rather than read from a process-wide
//! singleton, so a process can host many tablets, each with a fully
//! isolated manager (and tests can pin time wherever they want).
//!
//! ## Contract
//!
//! - `now()` must be strictly monotonic within the process: every call
//!   returns a timestamp greater than every earlier `now()` result from the
//!   same clock instance. Cross-process monotonicity is NOT assumed.
//! - `now_latest()` returns a timestamp at or above anything any correct
//!   peer could currently observe, or `None` when no such bound can be
//!   produced.
//!
//! ## Implementations
//!
//! - [`HybridClock`]: wall-clock microseconds fused with a logical counter,
//!   for leader-side online traffic.
//! - [`ManualClock`]: a counter the caller advances explicitly, for tests
//!   and deterministic harnesses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{DEFAULT_MAX_CLOCK_ERROR_MICROS, HYBRID_CLOCK_LOGICAL_BITS};
use crate::mvcc::Timestamp;

/// Source of transaction timestamps for one tablet.
pub trait Clock: Send + Sync {
    /// Current timestamp. Strictly monotonic per clock instance.
    fn now(&self) -> Timestamp;

    /// A timestamp guaranteed to be at or above every timestamp any correct
    /// peer could currently observe, or `None` if the clock cannot produce
    /// such a bound.
    fn now_latest(&self) -> Option<Timestamp>;
}

/// Hybrid physical/logical clock.
///
/// The high bits carry microseconds since the UNIX epoch, the low
/// [`HYBRID_CLOCK_LOGICAL_BITS`] bits a logical counter that breaks ties
/// when several timestamps are requested within one microsecond. Strict
/// monotonicity is enforced with an atomic max, so the clock never runs
/// backwards even if the wall clock does.
pub struct HybridClock {
    last: AtomicU64,
    max_error_micros: u64,
}

impl HybridClock {
    /// Create a clock with the default maximum error bound.
    pub fn new() -> Self {
        Self::with_max_error_micros(DEFAULT_MAX_CLOCK_ERROR_MICROS)
    }

    /// Create a clock with an explicit maximum error bound in microseconds.
    ///
    /// A bound of zero makes [`Clock::now_latest`] return `None`.
    pub fn with_max_error_micros(max_error_micros: u64) -> Self {
        Self {
            last: AtomicU64::new(0),
            max_error_micros,
        }
    }

    fn physical_now() -> u64 {
        // Pre-epoch system time degrades to 0; the logical counter still
        // guarantees monotonicity.
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        micros << HYBRID_CLOCK_LOGICAL_BITS
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HybridClock {
    fn now(&self) -> Timestamp {
        let physical = Self::physical_now();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(last.saturating_add(1).max(physical))
            })
            .unwrap_or_else(|prev| prev);
        // The stored value is a pure function of the previous one, so it can
        // be recomputed without re-reading the atomic.
        Timestamp::new(prev.saturating_add(1).max(physical))
    }

    fn now_latest(&self) -> Option<Timestamp> {
        if self.max_error_micros == 0 {
            return None;
        }
        let bound = self.max_error_micros << HYBRID_CLOCK_LOGICAL_BITS;
        Some(Timestamp::new(self.now().value().saturating_add(bound)))
    }
}

/// Test clock holding a value the caller sets explicitly.
///
/// `now()` returns whatever was last set; callers are responsible for
/// advancing it between reservations, matching the controllable monotonic
/// counter used throughout the test suite.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock pinned at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            now: AtomicU64::new(initial),
        }
    }

    /// Pin the clock at `value`.
    pub fn set(&self, value: u64) {
        self.now.store(value, Ordering::SeqCst);
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now.load(Ordering::SeqCst))
    }

    fn now_latest(&self) -> Option<Timestamp> {
        Some(self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_clock_is_strictly_monotonic() {
        let clock = HybridClock::new();
        let mut prev = clock.now();
        for _ in 0..10_000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn hybrid_clock_latest_is_ahead_of_now() {
        let clock = HybridClock::new();
        let now = clock.now();
        let latest = clock.now_latest().unwrap();
        assert!(latest > now);
    }

    #[test]
    fn hybrid_clock_zero_error_has_no_latest() {
        let clock = HybridClock::with_max_error_micros(0);
        assert!(clock.now_latest().is_none());
    }

    #[test]
    fn manual_clock_follows_set_and_advance() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now(), Timestamp::new(10));

        clock.advance(5);
        assert_eq!(clock.now(), Timestamp::new(15));

        clock.set(100);
        assert_eq!(clock.now(), Timestamp::new(100));
        assert_eq!(clock.now_latest(), Some(Timestamp::new(100)));
    }
}
