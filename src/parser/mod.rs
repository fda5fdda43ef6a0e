//! Lossless, incremental parser
//!
//! This module turns source text into a full-fidelity rowan tree:
//! - **chars** classifies code points (identifier parts, whitespace, line breaks)
//! - **scanner** produces one token at a time with packed trivia; ASCII runs
//!   go through the **logos** fast path in `lexer`
//! - **parser** + **grammar** are a recursive descent parser emitting events
//! - **sink** builds rowan green nodes from the events
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Scanner (logos fast path, slow path fallback) → Tokens with packed trivia
//!     ↓
//! Parser → events → GreenNode tree (immutable, position-free, shared)
//!     ↓
//! SyntaxNode (rowan) → CST with parent pointers and derived offsets
//!     ↓
//! ast → typed views over SyntaxNode
//! ```
//!
//! ## Incremental Reparsing
//!
//! Every statement, class element and type member the parser completes is
//! recorded with how far the scanner looked while parsing it. After an edit,
//! [`incremental_parse`] splices those green nodes into the new tree whenever
//! the parser reaches the same position and the edit lies outside the
//! recorded extent.

#[allow(clippy::module_inception)]
mod parser;

pub mod ast;
pub mod chars;
mod grammar;
pub mod incremental;
mod lexer;
pub mod scanner;
mod sink;
mod syntax_kind;
mod tree;

pub use incremental::{IncrementalParse, IncrementalStats, TextEdit, UnsupportedEdit, incremental_parse};
pub use lexer::scan_fast;
pub use parser::parse;
pub use scanner::{
    ScanMode, Scanner, Token, TokenFlags, TriviaInfo, TriviaPiece, number_value, scan_trivia,
    string_value, tokenize, tokenize_with_mode,
};
pub use syntax_kind::{
    SyntaxElement, SyntaxKind, SyntaxNode, SyntaxNodeChildren, SyntaxToken, TypeFrontLanguage,
};
pub use tree::{
    LanguageVersion, ParseOptions, ReusableNode, ReuseCategory, SyntaxError, SyntaxTree,
    is_separated_list, separated_item_count,
};

/// Re-export rowan types for convenience
pub use rowan::{GreenNode, TextRange, TextSize};
