//! # Big-Endian Versioned-Key Encoding
//!
//! Byte-comparable key encoding for the storage engine's sorted stores.
//! Encoded keys compare with a single `memcmp`, so no type-specific logic
//! runs at comparison time.
//!
//! ## Design Goals
//!
//! 1. **Byte-comparable**: encoded keys preserve sort order when compared
//!    lexicographically
//! 2. **Type-aware ordering**: NULL < booleans < numbers < strings/blobs
//! 3. **Versioned**: a key may end with exactly one terminal timestamp,
//!    encoded so that *newer versions of the same key sort first*
//!
//! ## Type Prefix Scheme
//!
//! Each item starts with a prefix byte that fixes the order between types:
//!
//! ```text
//! 0x01       NULL
//! 0x02-0x03  Booleans (FALSE < TRUE)
//! 0x12-0x16  Integers (negatives < ZERO < positives)
//! 0x20-0x21  Strings (TEXT < BLOB)
//! 0xF0       Terminal timestamp (always last, at most once)
//! ```
//!
//! ## Integer Encoding Strategy
//!
//! Sign-split encoding keeps numeric order:
//!
//! - Negative integers: NEG_INT prefix + two's complement big-endian
//!   (so -2 sorts before -1)
//! - Zero: ZERO prefix only
//! - Positive integers: POS_INT prefix + big-endian magnitude
//!
//! ## Text Encoding Strategy
//!
//! Text and blob items use escape encoding to handle embedded bytes that
//! would otherwise collide with the terminator:
//!
//! ```text
//! 0x00 -> 0x00 0xFF  (escape null byte)
//! 0xFF -> 0xFF 0x00  (escape 0xFF byte)
//! Terminator: 0x00 0x00
//! ```
//!
//! ## Terminal Timestamp
//!
//! Write batches embed their reserved MVCC timestamp as the last component
//! of every key they write. The timestamp's bits are inverted before the
//! big-endian append, so within one user key the newest version sorts
//! first and a scan positioned at the key's prefix reads versions from
//! newest to oldest. Setting the timestamp twice, or appending any item
//! after it, is a precondition violation.

use crate::mvcc::Timestamp;

pub mod type_prefix {
    pub const NULL: u8 = 0x01;
    pub const FALSE: u8 = 0x02;
    pub const TRUE: u8 = 0x03;

    pub const NEG_INT: u8 = 0x12;
    pub const ZERO: u8 = 0x14;
    pub const POS_INT: u8 = 0x16;

    pub const TEXT: u8 = 0x20;
    pub const BLOB: u8 = 0x21;

    pub const TIMESTAMP: u8 = 0xF0;
}

/// Builder for byte-comparable, optionally versioned keys.
pub struct KeyBuilder {
    buf: Vec<u8>,
    has_timestamp: bool,
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            has_timestamp: false,
        }
    }

    pub fn push_null(&mut self) -> &mut Self {
        self.ensure_no_timestamp_yet();
        self.buf.push(type_prefix::NULL);
        self
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.ensure_no_timestamp_yet();
        self.buf.push(if value {
            type_prefix::TRUE
        } else {
            type_prefix::FALSE
        });
        self
    }

    pub fn push_int(&mut self, value: i64) -> &mut Self {
        self.ensure_no_timestamp_yet();
        match value {
            0 => self.buf.push(type_prefix::ZERO),
            v if v > 0 => {
                self.buf.push(type_prefix::POS_INT);
                self.buf.extend_from_slice(&(v as u64).to_be_bytes());
            }
            v => {
                // Two's complement big-endian keeps negative order:
                // -2 (…FE) sorts before -1 (…FF).
                self.buf.push(type_prefix::NEG_INT);
                self.buf.extend_from_slice(&(v as u64).to_be_bytes());
            }
        }
        self
    }

    pub fn push_text(&mut self, value: &str) -> &mut Self {
        self.ensure_no_timestamp_yet();
        self.buf.push(type_prefix::TEXT);
        self.push_escaped(value.as_bytes());
        self
    }

    pub fn push_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.ensure_no_timestamp_yet();
        self.buf.push(type_prefix::BLOB);
        self.push_escaped(value);
        self
    }

    /// Append the terminal version timestamp. May be called at most once,
    /// and nothing may be appended after it.
    pub fn append_timestamp(&mut self, ts: Timestamp) -> &mut Self {
        self.ensure_no_timestamp_yet();
        assert!(ts.is_valid(), "cannot append the invalid timestamp to a key");
        self.buf.push(type_prefix::TIMESTAMP);
        // Inverted so newer versions of the same key sort first.
        self.buf.extend_from_slice(&(!ts.value()).to_be_bytes());
        self.has_timestamp = true;
        self
    }

    pub fn has_timestamp(&self) -> bool {
        self.has_timestamp
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn push_escaped(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match b {
                0x00 => self.buf.extend_from_slice(&[0x00, 0xFF]),
                0xFF => self.buf.extend_from_slice(&[0xFF, 0x00]),
                b => self.buf.push(b),
            }
        }
        self.buf.extend_from_slice(&[0x00, 0x00]);
    }

    fn ensure_no_timestamp_yet(&self) {
        assert!(
            !self.has_timestamp,
            "no key component may follow the terminal timestamp"
        );
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
