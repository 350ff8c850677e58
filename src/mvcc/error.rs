//! Typed failures returned by the MVCC manager.
//!
//! Only expected failures appear here; every wrong-state transition
//! (committing a timestamp that is not applying, aborting one that is,
//! double commit, double abort) is an invariant violation and panics
//! instead of being returned.

use thiserror::Error;

use super::timestamp::Timestamp;

/// Expected failures surfaced to callers of the MVCC manager.
#[derive(Debug, Error)]
pub enum MvccError {
    /// A caller-supplied timestamp cannot be reserved: it is already
    /// committed, already in flight, or at or below the bound past which no
    /// new transactions may start.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A wait API reached its deadline before the condition held.
    #[error("timed out waiting for timestamp {waited_for} to become clean")]
    TimedOut {
        /// Timestamp the waiter was parked on.
        waited_for: Timestamp,
    },

    /// The manager shut down while the caller was waiting.
    #[error("manager shut down while waiting")]
    Aborted,
}
