//! # TabletDB Configuration Constants
//!
//! This module centralizes all tuning constants, grouping interdependent
//! values together and documenting their relationships. Constants that depend
//! on each other are co-located to prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! COMMITTED_TIMESTAMPS_INLINE (8)
//!       │
//!       └─> Inline capacity of the committed-timestamp band inside a
//!           snapshot. 8 raw u64 values fill exactly one 64-byte cache
//!           line; the band rarely grows past this because the clean
//!           watermark continuously absorbs it.
//!
//! HYBRID_CLOCK_LOGICAL_BITS (12)
//!       │
//!       └─> Number of low bits of a hybrid timestamp reserved for the
//!           logical counter. The physical component is microseconds since
//!           the UNIX epoch shifted left by this amount, so up to 4096
//!           timestamps can be generated inside a single microsecond
//!           before the physical component must advance.
//!
//! DEFAULT_MAX_CLOCK_ERROR_MICROS (250_000)
//!       │
//!       └─> Bound used by HybridClock::now_latest(). Must cover the worst
//!           expected clock skew between peers; timestamps handed out by
//!           now_latest() are physical-now plus this bound.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `COMMITTED_TIMESTAMPS_INLINE * 8 <= 64` (band stays on one cache line)
//! 2. `HYBRID_CLOCK_LOGICAL_BITS <= 12` (microseconds shifted by this must
//!    not overflow u64 for any realistic wall-clock date)

// ============================================================================
// SNAPSHOT LAYOUT
// ============================================================================

/// Inline capacity of the committed-timestamp band carried by a snapshot.
///
/// The band holds timestamps committed out of order above the clean
/// watermark. It is consulted only on the slow path of the visibility
/// predicate, and the watermark continuously drains it, so it is kept
/// small enough to live on a single cache line.
pub const COMMITTED_TIMESTAMPS_INLINE: usize = 8;

const _: () = assert!(
    COMMITTED_TIMESTAMPS_INLINE * core::mem::size_of::<u64>() <= 64,
    "the committed-timestamp band must fit one cache line"
);

// ============================================================================
// HYBRID CLOCK
// ============================================================================

/// Low bits of a hybrid timestamp reserved for the logical counter.
///
/// The physical component (microseconds since the UNIX epoch) occupies the
/// remaining high bits. 12 bits allow 4096 distinct timestamps per
/// microsecond before the clock has to wait for physical time to move.
pub const HYBRID_CLOCK_LOGICAL_BITS: u32 = 12;

const _: () = assert!(
    HYBRID_CLOCK_LOGICAL_BITS <= 12,
    "microseconds << HYBRID_CLOCK_LOGICAL_BITS must not overflow u64"
);

/// Default maximum clock error assumed by `HybridClock::now_latest()`, in
/// microseconds. A value of zero disables latest-time reservation entirely.
pub const DEFAULT_MAX_CLOCK_ERROR_MICROS: u64 = 250_000;
