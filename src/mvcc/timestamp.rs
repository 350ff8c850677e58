//! Logical transaction timestamps.
//!
//! A timestamp is a 64-bit totally ordered instant identifying one
//! transaction within a tablet. Timestamps are handed out by the manager
//! and never reused for the lifetime of the tablet.

use std::fmt;

/// Totally ordered logical instant assigned to a transaction.
///
/// Three sentinels exist: [`Timestamp::INVALID`] (zero, also the default),
/// [`Timestamp::MIN`], and [`Timestamp::MAX`]. Ordinary timestamps fall
/// strictly between `MIN` and `MAX`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Sentinel for "no timestamp". Equal to the default value.
    pub const INVALID: Self = Self(0);
    /// Least valid timestamp.
    pub const MIN: Self = Self(1);
    /// Greatest valid timestamp (used for open-ended bounds).
    pub const MAX: Self = Self(u64::MAX);

    /// Construct a timestamp from a raw `u64`.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw `u64` value backing this timestamp.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// True unless this is the [`Timestamp::INVALID`] sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Successor timestamp, saturating at [`Timestamp::MAX`].
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Predecessor timestamp, saturating at [`Timestamp::INVALID`].
    #[inline]
    pub const fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl From<u64> for Timestamp {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Timestamp").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_ordered() {
        assert!(Timestamp::INVALID < Timestamp::MIN);
        assert!(Timestamp::MIN < Timestamp::MAX);
        assert!(!Timestamp::INVALID.is_valid());
        assert!(Timestamp::MIN.is_valid());
        assert!(Timestamp::MAX.is_valid());
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(Timestamp::default(), Timestamp::INVALID);
    }

    #[test]
    fn successor_and_predecessor() {
        let ts = Timestamp::new(42);
        assert_eq!(ts.next(), Timestamp::new(43));
        assert_eq!(ts.prev(), Timestamp::new(41));

        assert_eq!(Timestamp::MAX.next(), Timestamp::MAX);
        assert_eq!(Timestamp::INVALID.prev(), Timestamp::INVALID);
    }

    #[test]
    fn ordering_matches_raw_value() {
        assert!(Timestamp::new(10) < Timestamp::new(11));
        assert_eq!(Timestamp::new(7), Timestamp::from(7u64));
        assert_eq!(u64::from(Timestamp::new(7)), 7);
    }

    #[test]
    fn display_prints_raw_value() {
        assert_eq!(Timestamp::new(6041797920884666368).to_string(), "6041797920884666368");
    }
}
