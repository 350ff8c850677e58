//! MVCC manager: timestamp reservation, the reserve/apply/commit state
//! machine, clean-watermark advancement, and the blocking snapshot APIs.
//!
//! ## State machine
//!
//! ```text
//!               reserve                 start_applying
//!    (absent) ───────────▶ Reserved ──────────────────▶ Applying
//!                            │                            │
//!                            │ abort                      │ commit / offline_commit
//!                            ▼                            ▼
//!                        (committed=no)              (committed=yes)
//! ```
//!
//! Once a transaction starts applying it must commit: in-memory edits have
//! no rollback. Every transition that violates the machine panics, because
//! recovering silently would corrupt the committed/in-flight partition and
//! with it every reader's view of the tablet.
//!
//! ## Lock discipline
//!
//! One short-held mutex protects the snapshot, the in-flight table, the
//! no-new-transactions bound, the cached earliest in-flight timestamp, and
//! the waiter registry. Clock reads happen outside the lock and are
//! reconciled under it; the blocking APIs park on per-waiter latches, never
//! on the mutex.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::clock::Clock;

use super::error::MvccError;
use super::inflight::{InFlightTable, TxnState};
use super::snapshot::MvccSnapshot;
use super::timestamp::Timestamp;
use super::waiters::{WaitFor, Waiter, WaiterRegistry};
use super::LOG_TARGET;

/// Coordinator of MVCC transactions for one tablet.
///
/// Writers obtain a unique timestamp (usually through
/// [`ScopedTransaction`](super::ScopedTransaction)), apply their edits, and
/// commit; readers take snapshots that decide per-record visibility. One
/// manager exists per tablet and owns all MVCC state.
pub struct MvccManager {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Snapshot reflecting every commit so far.
    cur_snap: MvccSnapshot,
    in_flight: InFlightTable,
    /// No new transaction may start at or below this timestamp. Bounds how
    /// far the clean watermark may advance.
    no_new_transactions_at_or_before: Timestamp,
    /// Cached minimum of the in-flight table, `Timestamp::MAX` when empty.
    earliest_in_flight: Timestamp,
    waiters: WaiterRegistry,
    shut_down: bool,
}

impl MvccManager {
    /// Create a manager for one tablet, driven by the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                cur_snap: MvccSnapshot::new(),
                in_flight: InFlightTable::default(),
                no_new_transactions_at_or_before: Timestamp::INVALID,
                earliest_in_flight: Timestamp::MAX,
                waiters: WaiterRegistry::default(),
                shut_down: false,
            }),
        }
    }

    /// Begin a new transaction at the clock's current time.
    ///
    /// The returned timestamp is strictly greater than that of every
    /// earlier clock-driven reservation from this manager.
    pub fn start_transaction(&self) -> Timestamp {
        loop {
            // Read the clock outside the lock; a racing reservation just
            // means another read of a strictly monotonic clock.
            let ts = self.clock.now();
            let mut inner = self.inner.lock();
            if inner.reserve_clocked(ts) {
                return ts;
            }
        }
    }

    /// Begin a new transaction at the latest possible time the clock can
    /// vouch for, or `None` when the clock cannot produce that bound.
    pub fn start_transaction_at_latest(&self) -> Option<Timestamp> {
        loop {
            let ts = self.clock.now_latest()?;
            let mut inner = self.inner.lock();
            if inner.reserve_clocked(ts) {
                return Some(ts);
            }
        }
    }

    /// Begin a new transaction at a caller-supplied timestamp (log replay
    /// and follower application).
    ///
    /// Fails with [`MvccError::IllegalState`] when the timestamp is already
    /// committed, already in flight, or at or below the bound past which no
    /// new transactions may start.
    pub fn start_transaction_at_timestamp(&self, ts: Timestamp) -> Result<(), MvccError> {
        self.inner.lock().reserve_at(ts)
    }

    /// Mark the transaction at `ts` as applying its in-memory edits.
    ///
    /// Mandatory before [`commit`](Self::commit); once called,
    /// [`abort`](Self::abort) is forbidden.
    pub fn start_applying(&self, ts: Timestamp) {
        self.inner.lock().in_flight.begin_applying(ts);
    }

    /// Commit the transaction at `ts` and push the clean watermark using
    /// the clock, for online leader-side traffic.
    ///
    /// Panics unless `ts` is in flight and applying.
    pub fn commit(&self, ts: Timestamp) {
        let now = self.clock.now();
        self.inner.lock().complete_commit(ts, Some(now));
    }

    /// Commit the transaction at `ts` without consulting the clock, for
    /// bootstrap replay and follower application where the local clock is
    /// not authoritative. The watermark advances only as far as the
    /// in-flight set and the safe-time bound allow.
    ///
    /// Panics unless `ts` is in flight and applying.
    pub fn offline_commit(&self, ts: Timestamp) {
        self.inner.lock().complete_commit(ts, None);
    }

    /// Abort the transaction at `ts`.
    ///
    /// The timestamp leaves the in-flight set, but the watermark is not
    /// advanced: a later reservation could still be granted a lower
    /// timestamp than one the clock already handed out.
    ///
    /// Panics unless `ts` is in flight and still reserved.
    pub fn abort(&self, ts: Timestamp) {
        let mut inner = self.inner.lock();
        let state = inner.in_flight.remove(ts);
        assert!(
            state == TxnState::Reserved,
            "cannot abort transaction {ts} in state {state:?}: applying transactions must commit"
        );
        if ts == inner.earliest_in_flight {
            inner.refresh_earliest_in_flight();
        }
        inner.notify_waiters();
    }

    /// Raise the bound past which no new transaction may start, allowing
    /// the watermark to advance during offline replay. Paired with
    /// [`offline_commit`](Self::offline_commit).
    pub fn offline_adjust_safe_time(&self, safe_time: Timestamp) {
        let mut inner = self.inner.lock();
        if safe_time > inner.no_new_transactions_at_or_before {
            inner.no_new_transactions_at_or_before = safe_time;
        }
        inner.adjust_clean_time(None);
    }

    /// Snapshot of the current MVCC state.
    pub fn take_snapshot(&self) -> MvccSnapshot {
        self.inner.lock().cur_snap.clone()
    }

    /// Earliest possible timestamp of an uncommitted transaction. Every
    /// timestamp below it is guaranteed committed.
    pub fn clean_timestamp(&self) -> Timestamp {
        self.inner.lock().cur_snap.all_committed_before()
    }

    /// Timestamps of all transactions currently applying. Transactions that
    /// only reserved a timestamp are not listed.
    pub fn applying_timestamps(&self) -> Vec<Timestamp> {
        self.inner.lock().in_flight.applying_timestamps()
    }

    /// Whether every transaction at or below `ts` is committed and no new
    /// transaction can start at or below it.
    pub fn are_all_transactions_committed(&self, ts: Timestamp) -> bool {
        let inner = self.inner.lock();
        inner.is_done_waiting(WaitFor::AllCommittedAtOrBefore, ts)
    }

    /// Block until every transaction at or below `ts` is committed, then
    /// return a clean snapshot at `ts` (its watermark is `ts + 1`, so `ts`
    /// itself is visible).
    ///
    /// `ts` must lie in the past of the configured clock. `deadline`
    /// bounds the wait; `None` waits until the condition holds or the
    /// manager shuts down.
    pub fn wait_for_clean_snapshot_at(
        &self,
        ts: Timestamp,
        deadline: Option<Instant>,
    ) -> Result<MvccSnapshot, MvccError> {
        debug_assert!(
            ts <= self.clock.now(),
            "cannot wait for a clean snapshot at future timestamp {ts}"
        );
        self.wait_until(WaitFor::AllCommittedAtOrBefore, ts, deadline)?;
        Ok(MvccSnapshot::at_timestamp(ts.next()))
    }

    /// Block until every transaction that was applying when this call began
    /// has committed.
    ///
    /// Makes no promise about transactions that start applying afterwards.
    pub fn wait_for_applying_to_commit(&self) -> Result<(), MvccError> {
        let target = {
            let inner = self.inner.lock();
            match inner.in_flight.applying_timestamps().into_iter().max() {
                Some(max) => max,
                None => return Ok(()),
            }
        };
        self.wait_until(WaitFor::NoneApplyingAtOrBefore, target, None)
    }

    /// Shut the manager down: every registered waiter, and every wait
    /// attempted afterwards, fails with [`MvccError::Aborted`].
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shut_down = true;
        inner.waiters.drain_all();
        log::debug!(target: LOG_TARGET, "mvcc manager shut down");
    }

    /// Number of registered waiters. Test visibility.
    pub fn num_waiters(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    fn wait_until(
        &self,
        wait_for: WaitFor,
        ts: Timestamp,
        deadline: Option<Instant>,
    ) -> Result<(), MvccError> {
        let waiter = {
            let mut inner = self.inner.lock();
            if inner.is_done_waiting(wait_for, ts) {
                return Ok(());
            }
            if inner.shut_down {
                return Err(MvccError::Aborted);
            }
            let waiter = Arc::new(Waiter::new(ts, wait_for));
            inner.waiters.register(Arc::clone(&waiter));
            waiter
        };

        let signaled = waiter.latch.wait(deadline);

        let mut inner = self.inner.lock();
        if !signaled && inner.waiters.cancel(&waiter) {
            return Err(MvccError::TimedOut { waited_for: ts });
        }
        // Signaled (possibly concurrently with the deadline). Shutdown
        // signals every waiter, so distinguish it from a satisfied wait.
        if inner.shut_down && !inner.is_done_waiting(wait_for, ts) {
            return Err(MvccError::Aborted);
        }
        Ok(())
    }
}

impl Inner {
    /// Reserve a clock-provided timestamp. Fails (for retry with a fresh
    /// clock reading) when the timestamp does not lie above the
    /// no-new-transactions bound or is already taken.
    fn reserve_clocked(&mut self, ts: Timestamp) -> bool {
        if ts <= self.no_new_transactions_at_or_before {
            return false;
        }
        if !self.in_flight.insert_reserved(ts) {
            return false;
        }
        self.no_new_transactions_at_or_before = ts;
        if ts < self.earliest_in_flight {
            self.earliest_in_flight = ts;
        }
        true
    }

    /// Reserve a caller-supplied timestamp. Unlike clock-driven
    /// reservations this leaves the no-new-transactions bound untouched:
    /// replay drives that bound explicitly via safe-time adjustments, and
    /// moving it here would let the watermark overtake timestamps the log
    /// has not applied yet.
    fn reserve_at(&mut self, ts: Timestamp) -> Result<(), MvccError> {
        if ts < self.cur_snap.all_committed_before() {
            return Err(MvccError::IllegalState(format!(
                "timestamp {ts} is already considered committed: {}",
                self.cur_snap
            )));
        }
        if ts <= self.no_new_transactions_at_or_before {
            return Err(MvccError::IllegalState(format!(
                "timestamp {ts} is at or below the no-new-transactions bound {}",
                self.no_new_transactions_at_or_before
            )));
        }
        if !self.in_flight.insert_reserved(ts) {
            return Err(MvccError::IllegalState(format!(
                "timestamp {ts} is already in flight"
            )));
        }
        if ts < self.earliest_in_flight {
            self.earliest_in_flight = ts;
        }
        Ok(())
    }

    fn complete_commit(&mut self, ts: Timestamp, now: Option<Timestamp>) {
        let state = self.in_flight.remove(ts);
        assert!(
            state == TxnState::Applying,
            "cannot commit transaction {ts} in state {state:?}: start_applying was never called"
        );
        self.cur_snap.add_committed_timestamp(ts);
        if ts == self.earliest_in_flight {
            self.refresh_earliest_in_flight();
        }
        self.adjust_clean_time(now);
    }

    fn refresh_earliest_in_flight(&mut self) {
        self.earliest_in_flight = self
            .in_flight
            .min_timestamp()
            .unwrap_or(Timestamp::MAX);
    }

    /// Slide the clean watermark as far as the in-flight set, the
    /// no-new-transactions bound, and (for online commits) the clock allow,
    /// then wake any waiter whose condition now holds.
    fn adjust_clean_time(&mut self, now: Option<Timestamp>) {
        let mut candidate = self
            .earliest_in_flight
            .min(self.no_new_transactions_at_or_before.next());
        if let Some(now) = now {
            candidate = candidate.min(now);
        }
        if candidate > self.cur_snap.all_committed_before() {
            log::trace!(target: LOG_TARGET, "clean watermark advanced to {candidate}");
            self.cur_snap.advance_watermark(candidate);
        }
        self.notify_waiters();
    }

    fn is_done_waiting(&self, wait_for: WaitFor, ts: Timestamp) -> bool {
        match wait_for {
            WaitFor::AllCommittedAtOrBefore => {
                !self.in_flight.any_at_or_before(ts)
                    && self.no_new_transactions_at_or_before >= ts
            }
            WaitFor::NoneApplyingAtOrBefore => !self.in_flight.any_applying_at_or_before(ts),
        }
    }

    fn notify_waiters(&mut self) {
        let in_flight = &self.in_flight;
        let no_new = self.no_new_transactions_at_or_before;
        self.waiters.signal_satisfied(|waiter| match waiter.wait_for {
            WaitFor::AllCommittedAtOrBefore => {
                !in_flight.any_at_or_before(waiter.timestamp) && no_new >= waiter.timestamp
            }
            WaitFor::NoneApplyingAtOrBefore => {
                !in_flight.any_applying_at_or_before(waiter.timestamp)
            }
        });
    }
}
