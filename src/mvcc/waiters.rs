//! Waiter registry for the blocking snapshot APIs.
//!
//! Readers that need the past to become stable park on a one-shot latch
//! while the manager's mutex stays free. Each commit, abort, or safe-time
//! adjustment re-evaluates the registered conditions under the lock and
//! signals whichever latches are now satisfied.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::timestamp::Timestamp;

/// Condition a waiter is parked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitFor {
    /// Every transaction at or below the waiter's timestamp is committed,
    /// and no new transaction can start at or below it.
    AllCommittedAtOrBefore,
    /// No applying transaction remains at or below the waiter's timestamp.
    NoneApplyingAtOrBefore,
}

/// One-shot latch: signaled exactly once, waited on at most once.
pub(crate) struct Latch {
    done: Mutex<bool>,
    cvar: Condvar,
}

impl Latch {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    pub fn signal(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cvar.notify_all();
    }

    /// Block until signaled or until `deadline`. Returns whether the latch
    /// was signaled.
    pub fn wait(&self, deadline: Option<Instant>) -> bool {
        let mut done = self.done.lock();
        while !*done {
            match deadline {
                Some(deadline) => {
                    if self.cvar.wait_until(&mut done, deadline).timed_out() {
                        return *done;
                    }
                }
                None => self.cvar.wait(&mut done),
            }
        }
        true
    }
}

/// A thread blocked until a timestamp condition holds.
pub(crate) struct Waiter {
    pub timestamp: Timestamp,
    pub wait_for: WaitFor,
    pub latch: Latch,
}

impl Waiter {
    pub fn new(timestamp: Timestamp, wait_for: WaitFor) -> Self {
        Self {
            timestamp,
            wait_for,
            latch: Latch::new(),
        }
    }
}

/// Set of registered waiters. Mutated only under the manager lock.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    waiters: Vec<Arc<Waiter>>,
}

impl WaiterRegistry {
    pub fn register(&mut self, waiter: Arc<Waiter>) {
        self.waiters.push(waiter);
    }

    /// Remove `waiter` if it is still registered. Returns false when a
    /// notifier already signaled and removed it, which the timeout path
    /// treats as the condition having been reached in time.
    pub fn cancel(&mut self, waiter: &Arc<Waiter>) -> bool {
        match self.waiters.iter().position(|w| Arc::ptr_eq(w, waiter)) {
            Some(idx) => {
                self.waiters.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Signal and deregister every waiter whose condition `done` reports
    /// satisfied.
    pub fn signal_satisfied(&mut self, mut done: impl FnMut(&Waiter) -> bool) {
        let mut idx = 0;
        while idx < self.waiters.len() {
            if done(&self.waiters[idx]) {
                let waiter = self.waiters.swap_remove(idx);
                waiter.latch.signal();
            } else {
                idx += 1;
            }
        }
    }

    /// Signal and deregister every waiter unconditionally (shutdown).
    pub fn drain_all(&mut self) {
        for waiter in self.waiters.drain(..) {
            waiter.latch.signal();
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn latch_wait_returns_after_signal() {
        let waiter = Arc::new(Waiter::new(Timestamp::new(1), WaitFor::AllCommittedAtOrBefore));
        let parked = Arc::clone(&waiter);

        let handle = std::thread::spawn(move || parked.latch.wait(None));
        std::thread::sleep(Duration::from_millis(20));
        waiter.latch.signal();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn latch_wait_times_out() {
        let latch = Latch::new();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(!latch.wait(Some(deadline)));
    }

    #[test]
    fn latch_signaled_before_wait_returns_immediately() {
        let latch = Latch::new();
        latch.signal();
        assert!(latch.wait(Some(Instant::now())));
    }

    #[test]
    fn cancel_reports_whether_still_registered() {
        let mut registry = WaiterRegistry::default();
        let waiter = Arc::new(Waiter::new(Timestamp::new(5), WaitFor::AllCommittedAtOrBefore));
        registry.register(Arc::clone(&waiter));

        assert!(registry.cancel(&waiter));
        assert!(!registry.cancel(&waiter));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn signal_satisfied_removes_only_matching() {
        let mut registry = WaiterRegistry::default();
        let low = Arc::new(Waiter::new(Timestamp::new(5), WaitFor::AllCommittedAtOrBefore));
        let high = Arc::new(Waiter::new(Timestamp::new(50), WaitFor::AllCommittedAtOrBefore));
        registry.register(Arc::clone(&low));
        registry.register(Arc::clone(&high));

        registry.signal_satisfied(|w| w.timestamp <= Timestamp::new(10));
        assert_eq!(registry.len(), 1);
        assert!(low.latch.wait(Some(Instant::now())));
        assert!(!registry.cancel(&low));
        assert!(registry.cancel(&high));
    }
}
