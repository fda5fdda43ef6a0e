//! Semantic diagnostics.
//!
//! Syntax errors live on the tree; this module carries everything found
//! later (lowering, binding, resolution, checking) as plain data keyed by
//! unit and source range.

use std::sync::Arc;

use rowan::TextRange;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::binder::Cancelled;
use super::chain::SemanticChain;
use super::resolve::ResolutionContext;
use super::symbols::UnitId;
use crate::syntax::{Ast, AstId, AstKind, ImportTarget, dotted_name};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub unit: UnitId,
    pub range: TextRange,
    pub severity: Severity,
    /// Error/warning code (e.g., "E0004").
    pub code: Option<&'static str>,
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(unit: UnitId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            unit,
            range,
            severity: Severity::Error,
            code: None,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(unit: UnitId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(unit, range, message)
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn start(&self) -> u32 {
        self.range.start().into()
    }

    pub fn length(&self) -> u32 {
        self.range.len().into()
    }

    /// `(unit index, start, end, message)`
    pub fn to_tuple(&self) -> (u32, u32, u32, String) {
        (
            self.unit.0,
            self.range.start().into(),
            self.range.end().into(),
            self.message.to_string(),
        )
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes.
///
/// - **E0001-E0099**: semantic errors
/// - **W0001-W0099**: warnings
pub mod codes {
    /// Syntax error carried over from the tree.
    pub const SYNTAX: &str = "E0000";
    /// Type name not found.
    pub const UNDEFINED_REFERENCE: &str = "E0001";
    /// Production the AST cannot represent yet.
    pub const NOT_LOWERED: &str = "E0002";
    /// Name declared twice with incompatible kinds.
    pub const DUPLICATE_DEFINITION: &str = "E0004";
    /// Type depends on itself.
    pub const CIRCULAR_DEPENDENCY: &str = "E0007";
    /// Import of an unknown external module.
    pub const INVALID_IMPORT: &str = "E0014";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during a pass.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn duplicate_identifier(&mut self, unit: UnitId, range: TextRange, name: &str) {
        self.add(
            Diagnostic::error(unit, range, format!("Duplicate identifier '{}'.", name))
                .with_code(codes::DUPLICATE_DEFINITION),
        );
    }

    pub fn undefined_type(&mut self, unit: UnitId, range: TextRange, name: &str) {
        self.add(
            Diagnostic::error(unit, range, format!("Could not find symbol '{}'.", name))
                .with_code(codes::UNDEFINED_REFERENCE),
        );
    }

    pub fn unknown_module(&mut self, unit: UnitId, range: TextRange, path: &str) {
        self.add(
            Diagnostic::error(unit, range, format!("Unable to resolve external module '{}'.", path))
                .with_code(codes::INVALID_IMPORT),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

// ============================================================================
// SEMANTIC CHECKER
// ============================================================================

/// Checks one unit: every type name must resolve and every declared type
/// must be resolvable without running into itself.
pub struct SemanticChecker<'a> {
    chain: &'a mut SemanticChain,
    unit: UnitId,
    collector: DiagnosticCollector,
}

impl<'a> SemanticChecker<'a> {
    pub fn new(chain: &'a mut SemanticChain, unit: UnitId) -> Self {
        Self {
            chain,
            unit,
            collector: DiagnosticCollector::new(),
        }
    }

    /// Walk the unit one top-level statement at a time, stopping early when
    /// `cancel` fires.
    pub fn check(mut self, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, Cancelled> {
        let Some(ast) = self.chain.unit(self.unit).and_then(|u| u.ast().cloned()) else {
            return Ok(Vec::new());
        };
        let statements = match ast.kind(ast.root()) {
            AstKind::Script { statements } => statements.clone(),
            _ => Vec::new(),
        };
        for stmt in statements {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            for node in ast.preorder(stmt) {
                self.check_node(&ast, node);
            }
        }
        debug!(unit = self.unit.0, found = self.collector.diagnostics().len(), "checked unit");
        Ok(self.collector.take())
    }

    fn check_node(&mut self, ast: &Ast, node: AstId) {
        match ast.kind(node) {
            AstKind::TypeRef { name, .. } => {
                let ctx = ResolutionContext::types();
                let mut resolver = self.chain.resolver();
                if resolver.resolve_ast(self.unit, *name, &ctx).is_none() {
                    let text = dotted_name(ast, *name).unwrap_or_default();
                    if !text.is_empty() {
                        self.collector.undefined_type(self.unit, ast.range(*name), &text);
                    }
                }
            }
            AstKind::Interface { .. } | AstKind::TypeAlias { .. } | AstKind::Class { .. } => {
                let ctx = ResolutionContext::types();
                let mut resolver = self.chain.resolver();
                if let Some(symbol) = resolver.resolve_ast(self.unit, node, &ctx) {
                    // Cycles are recorded by the resolver itself
                    resolver.resolve_declared_symbol(symbol, &ctx);
                }
            }
            AstKind::ImportAlias { .. } => {
                let ctx = ResolutionContext::values();
                let mut resolver = self.chain.resolver();
                let resolved = resolver.resolve_ast(self.unit, node, &ctx);
                let target = resolved.and_then(|s| resolver.alias_target(s));
                if let (None, AstKind::ImportAlias { target: ImportTarget::External(path), .. }) = (target, ast.kind(node)) {
                    self.collector.unknown_module(self.unit, ast.range(node), path);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowan::TextSize;

    #[test]
    fn test_tuple_conversion() {
        let diag = Diagnostic::error(
            UnitId(3),
            TextRange::new(TextSize::new(4), TextSize::new(9)),
            "Duplicate identifier 'x'.",
        );
        assert_eq!(diag.to_tuple(), (3, 4, 9, "Duplicate identifier 'x'.".to_string()));
        assert_eq!(diag.length(), 5);
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.duplicate_identifier(UnitId(1), TextRange::default(), "a");
        collector.add(Diagnostic::warning(UnitId(1), TextRange::default(), "w"));
        assert_eq!(collector.error_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.take().len(), 2);
        assert!(!collector.has_errors());
    }
}
