//! Version analysis for scraped repository output.
//!
//! `VersionAnalyzer` is split by concern: `extract` pulls a candidate out of
//! free-form tool output, `compare` validates and orders two version strings,
//! and `classify` decides whether a detected upgrade needs confirmation.

pub mod classify;
pub mod compare;
pub mod extract;

pub use classify::{Classification, Verdict};

/// Stateless entry point for version extraction, validation and comparison.
pub struct VersionAnalyzer;
