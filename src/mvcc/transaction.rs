//! Scoped transaction handles.
//!
//! A [`ScopedTransaction`] reserves a timestamp on construction and
//! guarantees a terminal transition: dropping the handle commits unless the
//! caller already committed or aborted explicitly. The terminal methods
//! consume the handle, so committing or aborting twice is rejected at
//! compile time.

use super::error::MvccError;
use super::manager::MvccManager;
use super::timestamp::Timestamp;

/// How the transaction's timestamp was assigned; decides which commit path
/// the terminal transition takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assignment {
    /// Clock-driven reservation; commits online, pushing the watermark.
    Clocked,
    /// Caller-supplied timestamp (replay, follower catch-up); commits
    /// offline, leaving the watermark to explicit safe-time adjustments.
    PreAssigned,
}

/// A running transaction that cannot leak its timestamp.
///
/// The handle borrows its manager, so the manager is guaranteed to outlive
/// every transaction it issued.
pub struct ScopedTransaction<'a> {
    manager: &'a MvccManager,
    timestamp: Timestamp,
    assignment: Assignment,
    done: bool,
}

impl std::fmt::Debug for ScopedTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedTransaction")
            .field("manager", &(self.manager as *const MvccManager))
            .field("timestamp", &self.timestamp)
            .field("assignment", &self.assignment)
            .field("done", &self.done)
            .finish()
    }
}

impl<'a> ScopedTransaction<'a> {
    /// Start a transaction at the clock's current time.
    pub fn new(manager: &'a MvccManager) -> Self {
        Self {
            manager,
            timestamp: manager.start_transaction(),
            assignment: Assignment::Clocked,
            done: false,
        }
    }

    /// Start a transaction at the latest time the clock can vouch for, or
    /// `None` when the clock cannot produce that bound.
    pub fn new_at_latest(manager: &'a MvccManager) -> Option<Self> {
        Some(Self {
            manager,
            timestamp: manager.start_transaction_at_latest()?,
            assignment: Assignment::Clocked,
            done: false,
        })
    }

    /// Start a transaction at a pre-assigned timestamp. The terminal commit
    /// uses the offline path, so this is the handle to use when replaying a
    /// log or applying on a follower.
    pub fn new_at_timestamp(
        manager: &'a MvccManager,
        timestamp: Timestamp,
    ) -> Result<Self, MvccError> {
        manager.start_transaction_at_timestamp(timestamp)?;
        Ok(Self {
            manager,
            timestamp,
            assignment: Assignment::PreAssigned,
            done: false,
        })
    }

    /// Timestamp reserved for this transaction.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Mark that this transaction is about to apply its modifications to
    /// in-memory stores. Must precede the commit; forbids abort.
    pub fn start_applying(&mut self) {
        self.manager.start_applying(self.timestamp);
    }

    /// Commit the transaction. Requires [`start_applying`] was called.
    ///
    /// [`start_applying`]: Self::start_applying
    pub fn commit(mut self) {
        self.finish();
    }

    /// Abort the transaction. Requires [`start_applying`] was NOT called.
    ///
    /// [`start_applying`]: Self::start_applying
    pub fn abort(mut self) {
        self.manager.abort(self.timestamp);
        self.done = true;
    }

    fn finish(&mut self) {
        match self.assignment {
            Assignment::Clocked => self.manager.commit(self.timestamp),
            Assignment::PreAssigned => self.manager.offline_commit(self.timestamp),
        }
        self.done = true;
    }
}

impl Drop for ScopedTransaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;

    fn manager_at(initial: u64) -> (Arc<ManualClock>, MvccManager) {
        let clock = Arc::new(ManualClock::new(initial));
        let manager = MvccManager::new(clock.clone());
        (clock, manager)
    }

    #[test]
    fn drop_commits_an_applying_transaction() {
        let (_clock, mvcc) = manager_at(10);

        {
            let mut txn = ScopedTransaction::new(&mvcc);
            assert_eq!(txn.timestamp(), Timestamp::new(10));
            txn.start_applying();
        }

        assert!(mvcc.take_snapshot().is_committed(Timestamp::new(10)));
    }

    #[test]
    fn explicit_commit_consumes_the_handle() {
        let (_clock, mvcc) = manager_at(10);

        let mut txn = ScopedTransaction::new(&mvcc);
        txn.start_applying();
        txn.commit();

        assert!(mvcc.take_snapshot().is_committed(Timestamp::new(10)));
    }

    #[test]
    fn abort_leaves_timestamp_uncommitted() {
        let (_clock, mvcc) = manager_at(10);

        let txn = ScopedTransaction::new(&mvcc);
        txn.abort();

        assert!(!mvcc.take_snapshot().is_committed(Timestamp::new(10)));
        assert!(mvcc.applying_timestamps().is_empty());
    }

    #[test]
    fn pre_assigned_transaction_commits_offline() {
        let (_clock, mvcc) = manager_at(100);

        let mut txn = ScopedTransaction::new_at_timestamp(&mvcc, Timestamp::new(50)).unwrap();
        txn.start_applying();
        drop(txn);

        // Offline commit: the watermark does not chase the clock to 100.
        assert!(mvcc.clean_timestamp() < Timestamp::new(51));
        mvcc.offline_adjust_safe_time(Timestamp::new(50));
        assert_eq!(mvcc.clean_timestamp(), Timestamp::new(51));
    }

    #[test]
    fn pre_assigned_reserve_failure_surfaces_at_construction() {
        let (clock, mvcc) = manager_at(10);

        let mut txn = ScopedTransaction::new(&mvcc);
        txn.start_applying();
        clock.set(12);
        txn.commit();

        let err = ScopedTransaction::new_at_timestamp(&mvcc, Timestamp::new(5)).unwrap_err();
        assert!(matches!(err, MvccError::IllegalState(_)));
    }

    #[test]
    fn new_at_latest_uses_the_clock_bound() {
        let (_clock, mvcc) = manager_at(10);
        let txn = ScopedTransaction::new_at_latest(&mvcc).unwrap();
        assert_eq!(txn.timestamp(), Timestamp::new(10));
        txn.abort();
    }
}
