//! # TabletDB - MVCC Core for a Tablet-Sharded Key/Value Store
//!
//! TabletDB's transaction core coordinates multi-version concurrency
//! control for one tablet (one shard of the keyspace). It mediates between
//! a physical clock, which may return times with bounded error, and the
//! logical ordering of persisted writes, producing snapshots with no
//! visibility holes and a monotonically advancing clean watermark that
//! lets readers skip per-record checks.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tabletdb::{HybridClock, MvccManager, ScopedTransaction};
//!
//! let mvcc = MvccManager::new(Arc::new(HybridClock::new()));
//!
//! // Writer: reserve a timestamp, apply, commit on drop.
//! let mut txn = ScopedTransaction::new(&mvcc);
//! let version = txn.timestamp();
//! txn.start_applying();
//! // ... apply in-memory edits keyed by `version`, append to the log ...
//! drop(txn);
//!
//! // Reader: a snapshot decides visibility per record version.
//! let snap = mvcc.take_snapshot();
//! assert!(snap.is_committed(version));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │   Writers (leader)  Log replay (follower) │
//! ├───────────────────────────────────────────┤
//! │        MVCC Manager (per tablet)          │
//! │  reserve → apply → commit state machine   │
//! │  clean watermark · waiter protocol        │
//! ├─────────────────────┬─────────────────────┤
//! │   Snapshots         │  Clock capability   │
//! │   (read iterators)  │  (hybrid / manual)  │
//! ├─────────────────────┴─────────────────────┤
//! │  Versioned-key encoding · block codecs    │
//! │  (seams to the storage engine)            │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`mvcc`]: timestamps, snapshots, the manager, scoped transactions
//! - [`clock`]: clock capability trait and implementations
//! - [`encoding`]: byte-comparable versioned-key builder
//! - [`codec`]: block-codec capability sets and registry
//! - [`config`]: centralized tuning constants

pub mod clock;
pub mod codec;
pub mod config;
pub mod encoding;
pub mod mvcc;

pub use clock::{Clock, HybridClock, ManualClock};
pub use mvcc::{MvccError, MvccManager, MvccSnapshot, ScopedTransaction, Timestamp, TxnState};
