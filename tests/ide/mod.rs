//! IDE feature tests
//!
//! Tests for:
//! - Session edits through the analysis host
//! - Go to definition
//! - Code completion
//! - Hover
//! - Document and workspace symbols
//! - Diagnostics

pub mod tests_completion;
pub mod tests_diagnostics;
pub mod tests_goto;
pub mod tests_hover;
pub mod tests_session;
pub mod tests_symbols;
