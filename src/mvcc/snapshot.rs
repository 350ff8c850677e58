//! MVCC snapshots.
//!
//! A snapshot is an immutable description of which transaction timestamps
//! were committed at the moment it was taken. Read iterators embed one and
//! consult [`MvccSnapshot::is_committed`] per record version.
//!
//! ## Representation
//!
//! ```text
//!   CCCCCCCCCCCCCCCCCUUUUUCUUUCU
//!                    |    \___\___ committed_timestamps
//!                    |
//!                    \- all_committed_before
//! ```
//!
//! Summary rule: a timestamp T is committed if and only if
//! `T < all_committed_before` or `committed_timestamps` contains T.
//!
//! `none_committed_at_or_after` caches `max(committed_timestamps) + 1` so
//! the common case is answered by two comparisons. The band itself stays a
//! flat unsorted vector: it is rarely consulted, almost always tiny, and a
//! linear scan over one cache line beats any tree or hash lookup at this
//! size.

use std::fmt;

use smallvec::SmallVec;

use crate::config::COMMITTED_TIMESTAMPS_INLINE;

use super::manager::MvccManager;
use super::timestamp::Timestamp;
use super::LOG_TARGET;

/// Immutable visibility oracle for one moment of a tablet's MVCC state.
#[derive(Clone, PartialEq, Eq)]
pub struct MvccSnapshot {
    /// Every timestamp strictly below this one is committed.
    all_committed_before: Timestamp,
    /// Every timestamp at or above this one is uncommitted. Cached as
    /// `max(committed_timestamps) + 1`, or equal to `all_committed_before`
    /// when the band is empty.
    none_committed_at_or_after: Timestamp,
    /// Timestamps above the watermark that are committed despite lying in
    /// the uncommitted region. Unsorted; raw values to keep the whole band
    /// on one cache line.
    committed_timestamps: SmallVec<[u64; COMMITTED_TIMESTAMPS_INLINE]>,
}

impl MvccSnapshot {
    /// Snapshot that considers no transaction committed.
    pub fn new() -> Self {
        Self::at_timestamp(Timestamp::MIN)
    }

    /// Snapshot of the manager's current state, copied under its lock.
    pub fn from_manager(manager: &MvccManager) -> Self {
        manager.take_snapshot()
    }

    /// Snapshot that considers exactly the timestamps below `ts` committed.
    pub fn at_timestamp(ts: Timestamp) -> Self {
        Self {
            all_committed_before: ts,
            none_committed_at_or_after: ts,
            committed_timestamps: SmallVec::new(),
        }
    }

    /// Snapshot that considers every transaction committed.
    pub fn including_all() -> Self {
        Self::at_timestamp(Timestamp::MAX)
    }

    /// Snapshot that considers no transaction committed.
    pub fn including_none() -> Self {
        Self::new()
    }

    /// Whether `ts` should be considered committed in this snapshot.
    #[inline]
    pub fn is_committed(&self, ts: Timestamp) -> bool {
        // The watermarks answer almost every probe; keep those two
        // comparisons inline and the loopy band scan out of line.
        if ts < self.all_committed_before {
            return true;
        }
        if ts >= self.none_committed_at_or_after {
            return false;
        }
        self.is_committed_fallback(ts)
    }

    #[inline(never)]
    fn is_committed_fallback(&self, ts: Timestamp) -> bool {
        self.committed_timestamps.contains(&ts.value())
    }

    /// Whether this snapshot may contain committed transactions at or above
    /// `ts`. When false, redo records above `ts` cannot be relevant and the
    /// storage engine can skip scanning them.
    pub fn may_have_committed_at_or_after(&self, ts: Timestamp) -> bool {
        self.none_committed_at_or_after > ts
    }

    /// Whether this snapshot may contain uncommitted transactions at or
    /// below `ts`. When false, undo records below `ts` are all committed
    /// and need no scanning. Conservative: any explicit band implies gaps
    /// exist above its minimum.
    pub fn may_have_uncommitted_at_or_before(&self, ts: Timestamp) -> bool {
        self.all_committed_before <= ts
            || self
                .committed_timestamps
                .iter()
                .min()
                .is_some_and(|&min| Timestamp::new(min) <= ts)
    }

    /// True when visibility is determined solely by the watermark.
    pub fn is_clean(&self) -> bool {
        self.committed_timestamps.is_empty()
    }

    /// Consider the given timestamps committed even though they were not
    /// when the snapshot was constructed.
    ///
    /// Used on the flush path, where the set of commits going into a
    /// flushed file is not a consistent MVCC snapshot, yet the scanner
    /// built over that file must see exactly those commits.
    pub fn add_committed_timestamps(&mut self, timestamps: &[Timestamp]) {
        for &ts in timestamps {
            self.add_committed_timestamp(ts);
        }
    }

    pub(crate) fn add_committed_timestamp(&mut self, ts: Timestamp) {
        if ts < self.all_committed_before || self.committed_timestamps.contains(&ts.value()) {
            return;
        }
        self.committed_timestamps.push(ts.value());
        if ts.next() > self.none_committed_at_or_after {
            self.none_committed_at_or_after = ts.next();
        }
    }

    /// Greatest committed timestamp of a clean snapshot.
    ///
    /// A band consisting of exactly `{all_committed_before}` is a
    /// degenerate clean snapshot (all below X, plus X itself) and yields
    /// `all_committed_before`. Genuinely dirty snapshots are invalid input;
    /// the call is answered with the watermark's predecessor and a warning,
    /// and explicit band entries above it are ignored.
    pub fn last_committed_timestamp(&self) -> Timestamp {
        if !self.is_clean() {
            if self.committed_timestamps.len() == 1
                && self.committed_timestamps[0] == self.all_committed_before.value()
            {
                return self.all_committed_before;
            }
            log::warn!(
                target: LOG_TARGET,
                "last_committed_timestamp called on a dirty snapshot: {self}"
            );
        }
        self.all_committed_before.prev()
    }

    /// The clean watermark: every timestamp below it is committed.
    pub fn all_committed_before(&self) -> Timestamp {
        self.all_committed_before
    }

    /// Slide the watermark up to `to`, dropping band entries it now covers.
    pub(crate) fn advance_watermark(&mut self, to: Timestamp) {
        debug_assert!(to >= self.all_committed_before);
        self.all_committed_before = to;
        self.committed_timestamps.retain(|raw| *raw >= to.value());
        if self.none_committed_at_or_after < to {
            self.none_committed_at_or_after = to;
        }
    }
}

impl Default for MvccSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MvccSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MvccSnapshot[committed={{T|T < {}", self.all_committed_before)?;
        if !self.committed_timestamps.is_empty() {
            write!(f, " or (T in {{")?;
            for (i, raw) in self.committed_timestamps.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{raw}")?;
            }
            write!(f, "}})")?;
        }
        write!(f, "}}]")
    }
}

impl fmt::Debug for MvccSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference predicate straight from the summary rule, bypassing the
    /// watermark fast paths.
    fn committed_by_definition(snap: &MvccSnapshot, ts: Timestamp) -> bool {
        ts < snap.all_committed_before || snap.committed_timestamps.contains(&ts.value())
    }

    #[test]
    fn empty_snapshot_commits_nothing() {
        let snap = MvccSnapshot::new();
        assert!(snap.is_clean());
        assert!(!snap.is_committed(Timestamp::MIN));
        assert!(!snap.is_committed(Timestamp::new(12345)));
    }

    #[test]
    fn snapshot_at_timestamp_commits_everything_below() {
        let snap = MvccSnapshot::at_timestamp(Timestamp::new(10));
        assert!(snap.is_clean());
        assert!(snap.is_committed(Timestamp::new(9)));
        assert!(!snap.is_committed(Timestamp::new(10)));
        assert!(!snap.is_committed(Timestamp::new(11)));
    }

    #[test]
    fn include_all_and_none() {
        let all = MvccSnapshot::including_all();
        assert!(all.is_committed(Timestamp::new(u64::MAX - 1)));

        let none = MvccSnapshot::including_none();
        assert!(!none.is_committed(Timestamp::MIN));
    }

    #[test]
    fn fallback_agrees_with_definition() {
        // Exercises both hot paths and the band scan across the whole
        // probe range (visibility totality).
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(30));
        snap.add_committed_timestamps(&[Timestamp::new(32), Timestamp::new(35)]);

        for raw in 0..40u64 {
            let ts = Timestamp::new(raw);
            assert_eq!(
                snap.is_committed(ts),
                committed_by_definition(&snap, ts),
                "disagreement at {raw}"
            );
        }
    }

    #[test]
    fn add_committed_timestamps_round_trip() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(50));
        let before: Vec<bool> = (0..70)
            .map(|raw| snap.is_committed(Timestamp::new(raw)))
            .collect();

        let added = [Timestamp::new(55), Timestamp::new(61)];
        snap.add_committed_timestamps(&added);

        for ts in added {
            assert!(snap.is_committed(ts));
        }
        // Membership outside the added list is unchanged.
        for raw in 0..70u64 {
            if !added.contains(&Timestamp::new(raw)) {
                assert_eq!(snap.is_committed(Timestamp::new(raw)), before[raw as usize]);
            }
        }
        assert!(!snap.is_clean());
    }

    #[test]
    fn add_committed_timestamps_dedupes_and_ignores_covered() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(50));
        snap.add_committed_timestamps(&[
            Timestamp::new(55),
            Timestamp::new(55),
            Timestamp::new(10), // already below the watermark
        ]);
        assert_eq!(snap.committed_timestamps.len(), 1);
        assert!(snap.is_committed(Timestamp::new(10)));
        assert!(snap.is_committed(Timestamp::new(55)));
    }

    #[test]
    fn may_have_committed_at_or_after() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(10));
        assert!(snap.may_have_committed_at_or_after(Timestamp::new(9)));
        assert!(!snap.may_have_committed_at_or_after(Timestamp::new(10)));

        snap.add_committed_timestamps(&[Timestamp::new(15)]);
        assert!(snap.may_have_committed_at_or_after(Timestamp::new(15)));
        assert!(!snap.may_have_committed_at_or_after(Timestamp::new(16)));
    }

    #[test]
    fn may_have_uncommitted_at_or_before() {
        let snap = MvccSnapshot::at_timestamp(Timestamp::new(10));
        assert!(!snap.may_have_uncommitted_at_or_before(Timestamp::new(9)));
        assert!(snap.may_have_uncommitted_at_or_before(Timestamp::new(10)));

        let mut dirty = MvccSnapshot::at_timestamp(Timestamp::new(10));
        dirty.add_committed_timestamps(&[Timestamp::new(12)]);
        // An explicit band implies gaps exist at or above its minimum.
        assert!(dirty.may_have_uncommitted_at_or_before(Timestamp::new(12)));
        assert!(!dirty.may_have_uncommitted_at_or_before(Timestamp::new(9)));
    }

    #[test]
    fn last_committed_timestamp_clean() {
        let snap = MvccSnapshot::at_timestamp(Timestamp::new(42));
        assert_eq!(snap.last_committed_timestamp(), Timestamp::new(41));
    }

    #[test]
    fn last_committed_timestamp_degenerate_clean() {
        let raw = 6041797920884666368u64;
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(raw));
        snap.add_committed_timestamps(&[Timestamp::new(raw)]);
        assert!(!snap.is_clean());
        assert_eq!(snap.last_committed_timestamp(), Timestamp::new(raw));
    }

    #[test]
    fn last_committed_timestamp_dirty_falls_back_to_watermark() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(42));
        snap.add_committed_timestamps(&[Timestamp::new(44), Timestamp::new(47)]);
        assert_eq!(snap.last_committed_timestamp(), Timestamp::new(41));
    }

    #[test]
    fn advance_watermark_drops_covered_band_entries() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(30));
        snap.add_committed_timestamps(&[Timestamp::new(31), Timestamp::new(34)]);

        snap.advance_watermark(Timestamp::new(32));
        assert!(snap.is_committed(Timestamp::new(31))); // via watermark now
        assert!(snap.is_committed(Timestamp::new(34))); // still explicit
        assert!(!snap.is_committed(Timestamp::new(33)));

        snap.advance_watermark(Timestamp::new(35));
        assert!(snap.is_clean());
    }

    #[test]
    fn display_rendering() {
        let mut snap = MvccSnapshot::at_timestamp(Timestamp::new(5));
        assert_eq!(snap.to_string(), "MvccSnapshot[committed={T|T < 5}]");

        snap.add_committed_timestamps(&[Timestamp::new(7)]);
        assert_eq!(snap.to_string(), "MvccSnapshot[committed={T|T < 5 or (T in {7})}]");
    }
}
