//! # TabletDB Configuration Module
//!
//! This module centralizes all configuration constants for TabletDB.
//! Constants are grouped by their functional area and interdependencies are
//! documented and enforced through compile-time assertions.
//!
//! ## Why Centralization?
//!
//! Scattered constants across multiple files lead to bugs where
//! interdependent values become mismatched. Co-locating them with their
//! dependency notes keeps, for example, the snapshot band capacity and its
//! cache-line budget in one place.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation

pub mod constants;
pub use constants::*;
