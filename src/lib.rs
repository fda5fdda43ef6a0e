//! # typefront-base
//!
//! Incremental front-end for a typed ECMAScript superset: lossless parsing,
//! lowering, declaration binding, type resolution and editor queries.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → Editor queries (completion, hover, goto-def, outline)
//!   ↓
//! hir       → Declarations, symbol tables, semantic chain, type resolution
//!   ↓
//! syntax    → Arena AST lowered from the concrete tree
//!   ↓
//! parser    → Scanner, recursive-descent parser, rowan trees, incremental reparse
//! ```

// ============================================================================
// MODULES (dependency order: parser → syntax → hir → ide)
// ============================================================================

/// Parser: scanner with logos fast path, recursive-descent parser, rowan trees
pub mod parser;

/// Syntax: arena AST, lowering from the concrete tree
pub mod syntax;

/// High-level IR: declarations, binding, semantic chain, resolver
pub mod hir;

/// IDE features: completion, hover, goto-definition, symbols, diagnostics
pub mod ide;

// Re-export foundation types
pub use parser::{ParseOptions, SyntaxTree, TextEdit, parse};
pub use text_size::{TextRange, TextSize};
