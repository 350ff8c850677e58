//! # Key Encoding
//!
//! Byte-comparable encoding for the sorted stores surrounding the MVCC
//! core. The single entry point is [`key::KeyBuilder`], which write batches
//! use to embed their reserved MVCC timestamp as the terminal component of
//! every key they produce.

pub mod key;

pub use key::KeyBuilder;
