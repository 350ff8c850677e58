//! # Multi-Version Concurrency Control (MVCC)
//!
//! This module is the transaction core of a tablet: it assigns monotonic
//! timestamps to writes, tracks which transactions are in flight versus
//! committed, and hands readers immutable snapshots that decide per-record
//! visibility without blocking writers.
//!
//! ## Design Philosophy
//!
//! ### One Manager per Tablet
//!
//! Every tablet owns one [`MvccManager`]. The physical clock is injected as
//! a capability, so a process can host many tablets whose MVCC state is
//! fully isolated, and tests can pin time wherever they need it.
//!
//! ### Two-Phase Writes
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
//! A writer reserves a timestamp, does its in-memory work, declares
//! `start_applying` before touching shared stores, appends to the log, and
//! commits. There is no rollback of in-memory edits: once applying, the
//! transaction must commit, and the manager treats every deviation from
//! the state machine as a fatal invariant violation.
//!
//! ### Snapshots and the Clean Watermark
//!
//! ```text
//!   CCCCCCCCCCCCCCCCCUUUUUCUUUCU
//!                    |    \___\___ committed_timestamps
//!                    |
//!                    \- all_committed_before
//! ```
//!
//! A snapshot is a watermark plus a small band of out-of-order commits.
//! Commits of the earliest in-flight timestamp slide the watermark forward
//! and drain the band, so steady-state snapshots are *clean*: visibility
//! is a single comparison, and readers skip per-record checks entirely.
//!
//! ### Online versus Offline Commits
//!
//! Leader-side commits push the watermark using the clock, which keeps it
//! moving even without further write traffic. Followers and bootstrap
//! replay commit *offline*: the local clock is not authoritative there, so
//! the watermark advances only as far as explicit safe-time adjustments
//! driven by the log allow.
//!
//! ## Concurrency Model
//!
//! - One short-held `parking_lot::Mutex` per manager guards all MVCC state;
//!   every transition is atomic under it.
//! - Clock reads happen outside the lock and are reconciled under it.
//! - Blocking readers park on per-waiter one-shot latches; commits, aborts,
//!   and safe-time adjustments wake exactly the waiters whose condition now
//!   holds. Deadlines and manager shutdown bound every wait.
//!
//! ## Key Structures
//!
//! - [`Timestamp`]: totally ordered logical instant, unique per tablet
//! - [`MvccSnapshot`]: immutable visibility oracle
//! - [`TxnState`]: Reserved / Applying
//! - [`MvccManager`]: the coordinator
//! - [`ScopedTransaction`]: RAII handle guaranteeing a terminal transition
//! - [`MvccError`]: expected failures (`IllegalState`, `TimedOut`, `Aborted`)

mod error;
mod inflight;
mod manager;
mod snapshot;
mod timestamp;
mod transaction;
mod waiters;

pub use error::MvccError;
pub use inflight::TxnState;
pub use manager::MvccManager;
pub use snapshot::MvccSnapshot;
pub use timestamp::Timestamp;
pub use transaction::ScopedTransaction;

/// Logging target for all MVCC events.
pub(crate) const LOG_TARGET: &str = "tabletdb::mvcc";
