//! AnalysisHost and Analysis: session state and the queries over it.
//!
//! The `AnalysisHost` owns the semantic chain and applies edits to it.
//! `Analysis` borrows the host for a burst of queries.
//!
//! ## Usage
//!
//! ```ignore
//! let mut host = AnalysisHost::new();
//! host.add_unit("a.ts", "var x = 1;")?;
//! host.update_unit("a.ts", "var x = 2;")?;
//!
//! let mut analysis = host.analysis();
//! let hover = analysis.hover("a.ts", TextSize::new(4))?;
//! ```

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::hir::{AnalysisOptions, Cancelled, Diagnostic, PositionInfo, SemanticChain, UnitId};
use crate::parser::{SyntaxTree, TextEdit, TextSize, UnsupportedEdit, incremental_parse, parse};

use super::{
    CompletionItem, GotoResult, HoverResult, SymbolInfo, completions, document_symbols, goto_definition, hover,
    workspace_symbols,
};

/// Errors of the session surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("operation was cancelled")]
    Cancelled(#[from] Cancelled),
    #[error("no unit named '{0}'")]
    UnknownUnit(String),
    #[error("a unit named '{0}' already exists")]
    DuplicateUnit(String),
    #[error(transparent)]
    InvalidEdit(#[from] UnsupportedEdit),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Owns all mutable state for the IDE layer.
///
/// Apply changes via `add_unit()`, `update_unit()`, `edit_unit()` and
/// `remove_unit()`, then query through `analysis()`.
pub struct AnalysisHost {
    chain: SemanticChain,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisHost {
    pub fn new() -> Self {
        Self::with_options(AnalysisOptions::default())
    }

    pub fn with_options(options: AnalysisOptions) -> Self {
        Self {
            chain: SemanticChain::new(options),
        }
    }

    pub fn options(&self) -> &AnalysisOptions {
        self.chain.options()
    }

    pub fn chain(&self) -> &SemanticChain {
        &self.chain
    }

    pub fn has_unit(&self, path: &str) -> bool {
        self.chain.unit_id(path).is_some()
    }

    /// Current text of a unit.
    pub fn text(&self, path: &str) -> Option<&str> {
        let id = self.chain.unit_id(path)?;
        self.chain.unit(id).map(|u| u.tree().text())
    }

    fn unit_id(&self, path: &str) -> AnalysisResult<UnitId> {
        self.chain
            .unit_id(path)
            .ok_or_else(|| AnalysisError::UnknownUnit(path.to_string()))
    }

    fn tree(&self, path: &str) -> AnalysisResult<(UnitId, SyntaxTree)> {
        let id = self.unit_id(path)?;
        let tree = self
            .chain
            .unit(id)
            .map(|u| u.tree().clone())
            .ok_or_else(|| AnalysisError::UnknownUnit(path.to_string()))?;
        Ok((id, tree))
    }

    /// Parse and bind a new unit.
    pub fn add_unit(&mut self, path: &str, text: &str) -> AnalysisResult<UnitId> {
        if self.has_unit(path) {
            return Err(AnalysisError::DuplicateUnit(path.to_string()));
        }
        let tree = parse(text, path, &self.chain.options().parse);
        let id = self.chain.add_unit(path, tree, &CancellationToken::new())?;
        Ok(id)
    }

    /// Replace the text of a unit.
    ///
    /// The difference to the current text is turned into a single edit and
    /// parsed incrementally; `Ok(false)` means the edit could not be applied
    /// incrementally and the unit was parsed from scratch.
    pub fn update_unit(&mut self, path: &str, text: &str) -> AnalysisResult<bool> {
        self.update_unit_cancellable(path, text, &CancellationToken::new())
    }

    /// [`update_unit`](Self::update_unit), abandoned without any effect when
    /// `cancel` fires before binding finishes.
    pub fn update_unit_cancellable(
        &mut self,
        path: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<bool> {
        let (_, old) = self.tree(path)?;
        let edit = TextEdit::from_diff(old.text(), text);
        self.reparse(path, &old, &edit, text, cancel)
    }

    /// Apply one edit to a unit.
    pub fn edit_unit(&mut self, path: &str, edit: &TextEdit) -> AnalysisResult<bool> {
        let (_, old) = self.tree(path)?;
        let text = edit.apply(old.text())?;
        self.reparse(path, &old, edit, &text, &CancellationToken::new())
    }

    fn reparse(
        &mut self,
        path: &str,
        old: &SyntaxTree,
        edit: &TextEdit,
        text: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<bool> {
        let id = self.unit_id(path)?;
        let (tree, incremental) = match incremental_parse(old, edit, text) {
            Ok(reparsed) => {
                debug!(
                    path,
                    reused = reparsed.stats.reused_subtrees,
                    rate = reparsed.stats.reuse_rate(),
                    "incremental parse"
                );
                (reparsed.tree, true)
            }
            Err(err) => {
                debug!(path, error = %err, "falling back to full parse");
                (parse(text, path, &self.chain.options().parse), false)
            }
        };
        self.chain.update_unit(id, tree, cancel)?;
        Ok(incremental)
    }

    /// Drop a unit and everything it declared.
    pub fn remove_unit(&mut self, path: &str) -> AnalysisResult<()> {
        let id = self.unit_id(path)?;
        self.chain.remove_unit(id);
        Ok(())
    }

    /// Drop every cached resolution.
    pub fn reset_caches(&mut self) {
        self.chain.update();
    }

    /// Borrow the session for queries.
    pub fn analysis(&mut self) -> Analysis<'_> {
        Analysis { chain: &mut self.chain }
    }
}

/// Query access to a session.
///
/// Queries fill resolution caches, so they need the chain mutably; nothing
/// a query does is observable except through later answers.
pub struct Analysis<'a> {
    chain: &'a mut SemanticChain,
}

impl<'a> Analysis<'a> {
    fn unit_id(&self, path: &str) -> AnalysisResult<UnitId> {
        self.chain
            .unit_id(path)
            .ok_or_else(|| AnalysisError::UnknownUnit(path.to_string()))
    }

    pub fn chain(&mut self) -> &mut SemanticChain {
        self.chain
    }

    /// Symbol, type and context of the innermost node at `offset`.
    pub fn resolve_position(&mut self, path: &str, offset: TextSize) -> AnalysisResult<Option<PositionInfo>> {
        let id = self.unit_id(path)?;
        Ok(self.chain.resolver().resolve_position(id, offset))
    }

    pub fn goto_definition(&mut self, path: &str, offset: TextSize) -> AnalysisResult<GotoResult> {
        let id = self.unit_id(path)?;
        Ok(goto_definition(self.chain, id, offset))
    }

    /// Completion candidates at `offset`; members of the expression before
    /// the dot when `is_member_access` is set.
    pub fn completions_at(
        &mut self,
        path: &str,
        offset: TextSize,
        is_member_access: bool,
    ) -> AnalysisResult<Vec<CompletionItem>> {
        let id = self.unit_id(path)?;
        Ok(completions(self.chain, id, offset, is_member_access))
    }

    pub fn hover(&mut self, path: &str, offset: TextSize) -> AnalysisResult<Option<HoverResult>> {
        let id = self.unit_id(path)?;
        Ok(hover(self.chain, id, offset))
    }

    pub fn document_symbols(&self, path: &str) -> AnalysisResult<Vec<SymbolInfo>> {
        let id = self.unit_id(path)?;
        Ok(document_symbols(self.chain, id))
    }

    pub fn workspace_symbols(&self, query: Option<&str>) -> Vec<SymbolInfo> {
        workspace_symbols(self.chain, query)
    }

    pub fn diagnostics(&mut self, path: &str) -> AnalysisResult<Vec<Diagnostic>> {
        self.diagnostics_cancellable(path, &CancellationToken::new())
    }

    pub fn diagnostics_cancellable(
        &mut self,
        path: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<Vec<Diagnostic>> {
        let id = self.unit_id(path)?;
        Ok(self.chain.diagnostics(id, cancel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_unit_twice_is_rejected() {
        let mut host = AnalysisHost::new();
        host.add_unit("a.ts", "var a;").unwrap();
        assert_eq!(
            host.add_unit("a.ts", "var b;"),
            Err(AnalysisError::DuplicateUnit("a.ts".to_string()))
        );
    }

    #[test]
    fn test_update_is_incremental() {
        let mut host = AnalysisHost::new();
        host.add_unit("a.ts", "var x = 1;").unwrap();
        assert_eq!(host.update_unit("a.ts", "var x = 2;"), Ok(true));
        assert_eq!(host.text("a.ts"), Some("var x = 2;"));
    }

    #[test]
    fn test_edit_unit_applies_edit() {
        let mut host = AnalysisHost::new();
        host.add_unit("a.ts", "var x = 1;").unwrap();
        let edit = TextEdit::new(TextSize::new(8), TextSize::new(1), "2");
        assert_eq!(host.edit_unit("a.ts", &edit), Ok(true));
        assert_eq!(host.text("a.ts"), Some("var x = 2;"));
    }

    #[test]
    fn test_out_of_bounds_edit_is_an_error() {
        let mut host = AnalysisHost::new();
        host.add_unit("a.ts", "var x;").unwrap();
        let edit = TextEdit::new(TextSize::new(40), TextSize::new(1), "2");
        assert!(matches!(host.edit_unit("a.ts", &edit), Err(AnalysisError::InvalidEdit(_))));
        assert_eq!(host.text("a.ts"), Some("var x;"));
    }

    #[test]
    fn test_unknown_unit() {
        let mut host = AnalysisHost::new();
        assert_eq!(
            host.update_unit("nope.ts", ""),
            Err(AnalysisError::UnknownUnit("nope.ts".to_string()))
        );
        assert!(host.analysis().diagnostics("nope.ts").is_err());
    }

    #[test]
    fn test_cancelled_update_is_reported() {
        let mut host = AnalysisHost::new();
        host.add_unit("a.ts", "var a = 1;").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            host.update_unit_cancellable("a.ts", "var b = 1;", &cancel),
            Err(AnalysisError::Cancelled(Cancelled))
        );
        assert_eq!(host.text("a.ts"), Some("var a = 1;"));
    }
}
