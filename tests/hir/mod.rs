//! HIR layer tests
//!
//! Tests for the semantic model:
//! - Declaration binding and merging
//! - Type resolution, including circular declarations
//! - Semantic chain updates and cancellation

pub mod tests_binding;
pub mod tests_chain;
pub mod tests_resolution;
