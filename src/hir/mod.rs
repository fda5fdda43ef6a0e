//! Semantic model: declarations, symbols and types.
//!
//! Everything here is derived from lowered ASTs and owned by a
//! [`SemanticChain`]. Facts are computed on demand and kept in side tables
//! keyed by ids, with explicit invalidation when a unit changes.
//!
//! ## Layers
//!
//! ```text
//! Ast (per unit)
//!     │
//!     ▼
//! collect_decls(ast)        ← DeclForest with stable keys
//!     │
//!     ▼
//! BindTxn::bind_unit        ← symbols, merged across units
//!     │      ▲
//!     │      └── diff_forests(old, new) on update
//!     ▼
//! Resolver                  ← names → symbols → TypeIds, memoized
//!     │
//!     ▼
//! SemanticChain::diagnostics
//! ```

mod binder;
mod chain;
mod decls;
mod diagnostics;
mod diff;
mod resolve;
mod symbols;
mod types;

pub use binder::{
    BindOutcome, BindTxn, Cancelled, UnitBinding, module_name, normalize_module_path, seed_globals,
};
pub use chain::{AnalysisOptions, ChainStats, CompilationUnit, GLOBAL_UNIT_PATH, SemanticChain};
pub use decls::{DeclFlags, DeclForest, DeclId, DeclKind, Declaration, collect_decls};
pub use diagnostics::{Diagnostic, DiagnosticCollector, SemanticChecker, Severity, codes};
pub use diff::{DeclChange, DeclDiff, diff_forests};
pub use resolve::{
    MemberInfo, PositionInfo, ResolutionContext, Resolver, ResolverCache, Space, is_expression,
    space_at,
};
pub use symbols::{DeclRef, Symbol, SymbolFlags, SymbolId, SymbolKind, SymbolTable, SymbolTableKind, UnitId};
pub use types::{FnParam, FnSig, ObjectShape, Primitive, Type, TypeId, TypeTable};
