//! Syntax layer tests: lowering the concrete tree into the arena AST.

pub mod tests_lowering;
