//! IDE features: high-level queries for editor integrations.
//!
//! This module is the interface between the semantic model (HIR) and
//! whatever protocol layer sits on top of it. Each function corresponds to
//! one editor request and works in byte offsets.
//!
//! ## Design Principles
//!
//! 1. **Data in, data out**: no protocol types, converted at the boundary
//! 2. **Built on HIR queries**: nothing here resolves names on its own
//!
//! ## Usage
//!
//! ```ignore
//! use typefront::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! host.add_unit("a.ts", "module M { export var x = 1; }")?;
//!
//! let mut analysis = host.analysis();
//! let symbols = analysis.document_symbols("a.ts")?;
//! ```

mod analysis;
mod completion;
mod goto;
mod hover;
mod symbols;

pub use analysis::{Analysis, AnalysisError, AnalysisHost, AnalysisResult};
pub use completion::{CompletionItem, CompletionKind, completions};
pub use goto::{GotoResult, GotoTarget, goto_definition};
pub use hover::{HoverResult, hover};
pub use symbols::{SymbolInfo, document_symbols, workspace_symbols};
