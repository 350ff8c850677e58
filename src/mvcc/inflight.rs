//! In-flight transaction table.
//!
//! Maps every currently reserved or applying timestamp to its state. All
//! wrong-state transitions are invariant violations: silently accepting
//! them would corrupt the committed/in-flight partition that snapshots are
//! built from, so they panic instead.

use hashbrown::HashMap;

use super::timestamp::Timestamp;

/// Lifecycle state of an in-flight transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Timestamp allocated; no in-memory writes yet. May be aborted.
    Reserved,
    /// Writes being applied to in-memory stores. Commit is mandatory.
    Applying,
}

/// Table of in-flight transactions, keyed by timestamp.
#[derive(Debug, Default)]
pub(crate) struct InFlightTable {
    entries: HashMap<u64, TxnState>,
}

impl InFlightTable {
    /// Insert `ts` as reserved. Returns false if it is already in flight.
    pub fn insert_reserved(&mut self, ts: Timestamp) -> bool {
        match self.entries.entry(ts.value()) {
            hashbrown::hash_map::Entry::Occupied(_) => false,
            hashbrown::hash_map::Entry::Vacant(slot) => {
                slot.insert(TxnState::Reserved);
                true
            }
        }
    }

    /// Transition `ts` from reserved to applying.
    pub fn begin_applying(&mut self, ts: Timestamp) {
        match self.entries.get_mut(&ts.value()) {
            Some(state @ TxnState::Reserved) => *state = TxnState::Applying,
            Some(TxnState::Applying) => {
                panic!("cannot start applying transaction {ts}: already applying")
            }
            None => panic!("cannot start applying transaction {ts}: not in flight"),
        }
    }

    /// Remove `ts` and return the state it was in.
    pub fn remove(&mut self, ts: Timestamp) -> TxnState {
        self.entries
            .remove(&ts.value())
            .unwrap_or_else(|| panic!("transaction {ts} is not in flight"))
    }

    /// Minimum in-flight timestamp, if any. The manager caches this across
    /// commits, so the linear scan runs only when the minimum is removed.
    pub fn min_timestamp(&self) -> Option<Timestamp> {
        self.entries.keys().min().map(|&raw| Timestamp::new(raw))
    }

    /// Whether any in-flight transaction has a timestamp at or below `ts`.
    pub fn any_at_or_before(&self, ts: Timestamp) -> bool {
        self.entries.keys().any(|&raw| raw <= ts.value())
    }

    /// Whether any applying transaction has a timestamp at or below `ts`.
    pub fn any_applying_at_or_before(&self, ts: Timestamp) -> bool {
        self.entries
            .iter()
            .any(|(&raw, &state)| state == TxnState::Applying && raw <= ts.value())
    }

    /// Timestamps of all transactions currently applying.
    pub fn applying_timestamps(&self) -> Vec<Timestamp> {
        self.entries
            .iter()
            .filter(|(_, &state)| state == TxnState::Applying)
            .map(|(&raw, _)| Timestamp::new(raw))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicates() {
        let mut table = InFlightTable::default();
        assert!(table.insert_reserved(Timestamp::new(10)));
        assert!(!table.insert_reserved(Timestamp::new(10)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reserved_to_applying_to_removed() {
        let mut table = InFlightTable::default();
        table.insert_reserved(Timestamp::new(10));
        table.begin_applying(Timestamp::new(10));
        assert_eq!(table.remove(Timestamp::new(10)), TxnState::Applying);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_reserved_reports_reserved() {
        let mut table = InFlightTable::default();
        table.insert_reserved(Timestamp::new(10));
        assert_eq!(table.remove(Timestamp::new(10)), TxnState::Reserved);
    }

    #[test]
    #[should_panic(expected = "already applying")]
    fn double_begin_applying_is_fatal() {
        let mut table = InFlightTable::default();
        table.insert_reserved(Timestamp::new(10));
        table.begin_applying(Timestamp::new(10));
        table.begin_applying(Timestamp::new(10));
    }

    #[test]
    #[should_panic(expected = "not in flight")]
    fn begin_applying_unknown_is_fatal() {
        let mut table = InFlightTable::default();
        table.begin_applying(Timestamp::new(10));
    }

    #[test]
    #[should_panic(expected = "is not in flight")]
    fn remove_unknown_is_fatal() {
        let mut table = InFlightTable::default();
        table.remove(Timestamp::new(10));
    }

    #[test]
    fn min_and_range_queries() {
        let mut table = InFlightTable::default();
        assert_eq!(table.min_timestamp(), None);

        table.insert_reserved(Timestamp::new(30));
        table.insert_reserved(Timestamp::new(20));
        table.insert_reserved(Timestamp::new(40));
        table.begin_applying(Timestamp::new(30));

        assert_eq!(table.min_timestamp(), Some(Timestamp::new(20)));
        assert!(table.any_at_or_before(Timestamp::new(20)));
        assert!(!table.any_at_or_before(Timestamp::new(19)));
        assert!(table.any_applying_at_or_before(Timestamp::new(30)));
        assert!(!table.any_applying_at_or_before(Timestamp::new(29)));
        assert_eq!(table.applying_timestamps(), vec![Timestamp::new(30)]);
    }
}
