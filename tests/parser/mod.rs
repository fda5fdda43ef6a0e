//! Parser layer tests
//!
//! - Full-fidelity round-trip of arbitrary text
//! - Fast and slow scanner agreement
//! - Incremental reparsing against full parses

pub mod tests_incremental;
pub mod tests_round_trip;
pub mod tests_scanner;
