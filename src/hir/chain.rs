//! The semantic chain: every compilation unit of a session together with the
//! symbols, types and caches derived from them.
//!
//! Units are replaced whole. A new tree is lowered, its declarations are
//! collected and bound in a [`BindTxn`], and only when binding finishes is
//! anything in the chain touched. Cancellation therefore leaves the chain
//! exactly as it was.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::binder::{BindTxn, Cancelled, UnitBinding, seed_globals};
use super::decls::{DeclForest, collect_decls};
use super::diagnostics::{Diagnostic, SemanticChecker, codes};
use super::diff::diff_forests;
use super::resolve::{Resolver, ResolverCache};
use super::symbols::{SymbolId, SymbolTable, UnitId};
use super::types::TypeTable;
use crate::parser::{ParseOptions, SyntaxTree, parse};
use crate::syntax::{Ast, LowerError, lower};

/// Path of the unit that owns the global declarations.
pub const GLOBAL_UNIT_PATH: &str = "<global>";

// ============================================================================
// OPTIONS
// ============================================================================

/// Session-wide analysis settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub parse: ParseOptions,
    /// Nested symbol resolutions allowed before giving up with `Unresolved`
    pub max_resolution_depth: usize,
    /// Record "circularly references itself" diagnostics
    pub report_circularity: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            max_resolution_depth: 256,
            report_circularity: true,
        }
    }
}

// ============================================================================
// UNITS
// ============================================================================

/// One source file and everything derived from it.
#[derive(Debug)]
pub struct CompilationUnit {
    path: Arc<str>,
    tree: SyntaxTree,
    ast: Result<Arc<Ast>, LowerError>,
    decls: DeclForest,
    binding: UnitBinding,
}

impl CompilationUnit {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// The lowered AST, unless lowering failed
    pub fn ast(&self) -> Option<&Arc<Ast>> {
        self.ast.as_ref().ok()
    }

    pub fn lower_error(&self) -> Option<&LowerError> {
        self.ast.as_ref().err()
    }

    pub fn decls(&self) -> &DeclForest {
        &self.decls
    }

    pub fn binding(&self) -> &UnitBinding {
        &self.binding
    }
}

/// Counters for one chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub units_added: usize,
    pub units_updated: usize,
    pub units_removed: usize,
    /// Updates that kept the symbols of unchanged declarations
    pub incremental_binds: usize,
    pub full_binds: usize,
    pub cancelled: usize,
    /// Symbol types dropped by targeted invalidation
    pub invalidated_types: usize,
    /// Times every symbol type was dropped at once
    pub type_cache_resets: usize,
}

// ============================================================================
// CHAIN
// ============================================================================

pub struct SemanticChain {
    options: AnalysisOptions,
    units: Vec<Option<CompilationUnit>>,
    paths: IndexMap<Arc<str>, UnitId>,
    symbols: SymbolTable,
    global: SymbolId,
    external_modules: FxHashMap<SmolStr, SymbolId>,
    types: TypeTable,
    cache: ResolverCache,
    /// Checker results per unit, dropped on any change
    checked: FxHashMap<UnitId, Vec<Diagnostic>>,
    stats: ChainStats,
}

impl Default for SemanticChain {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl SemanticChain {
    pub fn new(options: AnalysisOptions) -> Self {
        let mut symbols = SymbolTable::new();
        let global = seed_globals(&mut symbols);
        let mut chain = Self {
            options,
            units: Vec::new(),
            paths: IndexMap::new(),
            symbols,
            global,
            external_modules: FxHashMap::default(),
            types: TypeTable::new(),
            cache: ResolverCache::new(),
            checked: FxHashMap::default(),
            stats: ChainStats::default(),
        };
        let tree = parse("", GLOBAL_UNIT_PATH, &chain.options.parse);
        // A fresh token is never cancelled
        if let Err(err) = chain.add_unit(GLOBAL_UNIT_PATH, tree, &CancellationToken::new()) {
            debug!(error = %err, "seeding the global unit failed");
        }
        chain
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    pub fn global(&self) -> SymbolId {
        self.global
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn unit_id(&self, path: &str) -> Option<UnitId> {
        self.paths.get(path).copied()
    }

    pub fn unit(&self, id: UnitId) -> Option<&CompilationUnit> {
        self.units.get(id.index())?.as_ref()
    }

    /// Live units in insertion order
    pub fn units(&self) -> impl Iterator<Item = (UnitId, &CompilationUnit)> {
        self.paths
            .values()
            .filter_map(|&id| self.unit(id).map(|unit| (id, unit)))
    }

    pub fn external_module(&self, name: &str) -> Option<SymbolId> {
        self.external_modules.get(name).copied()
    }

    /// Borrow the chain for a burst of resolution queries.
    pub fn resolver(&mut self) -> Resolver<'_> {
        Resolver {
            units: &self.units,
            symbols: &self.symbols,
            external_modules: &self.external_modules,
            global: self.global,
            types: &mut self.types,
            cache: &mut self.cache,
            max_depth: self.options.max_resolution_depth,
            report_circularity: self.options.report_circularity,
            aggressive: false,
        }
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Add a unit, or replace the unit already registered under `path`.
    pub fn add_unit(
        &mut self,
        path: &str,
        tree: SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<UnitId, Cancelled> {
        if let Some(id) = self.unit_id(path) {
            self.update_unit(id, tree, cancel)?;
            return Ok(id);
        }
        let id = UnitId(self.units.len() as u32);
        let path: Arc<str> = Arc::from(path);
        self.install(id, path.clone(), tree, cancel)?;
        self.paths.insert(path, id);
        self.stats.units_added += 1;
        Ok(id)
    }

    /// Replace the tree of an existing unit.
    pub fn update_unit(&mut self, id: UnitId, tree: SyntaxTree, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let Some(path) = self.unit(id).map(|u| u.path.clone()) else {
            return Ok(());
        };
        self.install(id, path, tree, cancel)?;
        self.stats.units_updated += 1;
        Ok(())
    }

    /// Drop a unit and every declaration it contributed.
    pub fn remove_unit(&mut self, id: UnitId) -> bool {
        let Some(old) = self.units.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        let never = CancellationToken::new();
        let mut txn = BindTxn::begin(&self.symbols, &self.external_modules, self.global, &never);
        txn.unbind_unit(id, &old.decls, &old.binding);
        self.commit(txn);
        self.paths.shift_remove(&old.path);
        self.stats.units_removed += 1;
        debug!(path = %old.path, "removed unit");
        true
    }

    /// Drop every cached resolution and start a fresh type table.
    pub fn update(&mut self) {
        self.cache = ResolverCache::new();
        self.types = TypeTable::new();
        self.checked.clear();
        self.stats.type_cache_resets += 1;
        trace!("reset resolution caches");
    }

    /// Re-run binding for a unit from its current tree.
    pub fn invalidate_unit(&mut self, path: &str, cancel: &CancellationToken) -> Result<bool, Cancelled> {
        let Some(id) = self.unit_id(path) else {
            return Ok(false);
        };
        let Some(tree) = self.unit(id).map(|u| u.tree.clone()) else {
            return Ok(false);
        };
        self.update_unit(id, tree, cancel)?;
        Ok(true)
    }

    fn install(&mut self, id: UnitId, path: Arc<str>, tree: SyntaxTree, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let ast = lower(&tree).map(Arc::new);
        let decls = match &ast {
            Ok(ast) => collect_decls(ast),
            Err(err) => {
                debug!(path = %path, error = %err, "lowering failed");
                DeclForest::empty()
            }
        };

        let mut txn = BindTxn::begin(&self.symbols, &self.external_modules, self.global, cancel);
        let previous = self.units.get(id.index()).and_then(Option::as_ref);
        let (binding, incremental) = match previous {
            Some(old) => match (old.ast(), &ast) {
                (Some(old_ast), Ok(new_ast)) => {
                    let diff = diff_forests(old_ast, &old.decls, new_ast, &decls);
                    let rebound = txn.rebind_unit(id, &path, &old.decls, &old.binding, &decls, &diff);
                    (rebound, true)
                }
                _ => {
                    txn.unbind_unit(id, &old.decls, &old.binding);
                    (txn.bind_unit(id, &path, &decls), false)
                }
            },
            None => (txn.bind_unit(id, &path, &decls), false),
        };
        let binding = match binding {
            Ok(binding) => binding,
            Err(cancelled) => {
                self.stats.cancelled += 1;
                return Err(cancelled);
            }
        };
        if incremental {
            self.stats.incremental_binds += 1;
        } else {
            self.stats.full_binds += 1;
        }
        self.commit(txn);

        let unit = CompilationUnit {
            path,
            tree,
            ast,
            decls,
            binding,
        };
        debug!(
            path = %unit.path,
            decls = unit.decls.len(),
            symbols = self.symbols.len(),
            incremental,
            "installed unit"
        );
        if id.index() >= self.units.len() {
            self.units.resize_with(id.index() + 1, || None);
        }
        self.units[id.index()] = Some(unit);
        Ok(())
    }

    fn commit(&mut self, txn: BindTxn<'_>) {
        let outcome = txn.into_outcome();
        self.symbols = outcome.symbols;
        self.external_modules = outcome.external_modules;
        if outcome.names_changed {
            self.cache.clear_types();
            self.stats.type_cache_resets += 1;
        } else {
            self.stats.invalidated_types += self.cache.invalidate_symbols(outcome.touched);
        }
        self.cache.clear_queries();
        self.checked.clear();
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Every diagnostic of a unit, ordered by position.
    pub fn diagnostics(&mut self, id: UnitId, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, Cancelled> {
        let Some(unit) = self.unit(id) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Diagnostic> = unit
            .tree
            .errors()
            .iter()
            .map(|e| Diagnostic::error(id, e.range, e.message.as_str()).with_code(codes::SYNTAX))
            .collect();
        if let Some(err) = unit.lower_error() {
            let range = match err {
                LowerError::NotYetLowered { range, .. } => *range,
            };
            out.push(Diagnostic::error(id, range, err.to_string()).with_code(codes::NOT_LOWERED));
        }
        out.extend(unit.binding.diagnostics.iter().cloned());

        let checked = match self.checked.get(&id) {
            Some(found) => found.clone(),
            None => {
                let found = SemanticChecker::new(self, id).check(cancel)?;
                self.checked.insert(id, found.clone());
                found
            }
        };
        out.extend(checked);
        out.extend(self.cache.circularities_in(id).cloned());
        out.sort_by_key(|d| (d.range.start(), d.range.end()));
        out.dedup();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::resolve::ResolutionContext;
    use crate::hir::symbols::SymbolKind;
    use crate::hir::types::TypeId;

    fn chain_with(files: &[(&str, &str)]) -> SemanticChain {
        let mut chain = SemanticChain::default();
        let cancel = CancellationToken::new();
        for (path, text) in files {
            let tree = parse(text, path, &ParseOptions::default());
            chain.add_unit(path, tree, &cancel).unwrap();
        }
        chain
    }

    fn global_member(chain: &SemanticChain, name: &str) -> SymbolId {
        chain.symbols().member(chain.global(), name).unwrap()
    }

    #[test]
    fn test_global_unit_is_first() {
        let chain = SemanticChain::default();
        assert_eq!(chain.unit_id(GLOBAL_UNIT_PATH), Some(UnitId(0)));
        assert!(chain.symbols().local(chain.global(), "number").is_some());
        assert_eq!(chain.stats().units_added, 1);
    }

    #[test]
    fn test_module_declarations_merge() {
        let chain = chain_with(&[("a.ts", "module M { var a; }\nmodule M { var b; }")]);
        let m = global_member(&chain, "M");
        assert_eq!(chain.symbols().get(m).kind, SymbolKind::Module);
        assert_eq!(chain.symbols().get(m).decls.len(), 2);
    }

    #[test]
    fn test_declarations_merge_across_units() {
        let chain = chain_with(&[("a.ts", "interface I { a: number; }"), ("b.ts", "interface I { b: string; }")]);
        let i = global_member(&chain, "I");
        assert_eq!(chain.symbols().get(i).decls.len(), 2);
        assert!(chain.symbols().member(i, "a").is_some());
        assert!(chain.symbols().member(i, "b").is_some());
    }

    #[test]
    fn test_self_referencing_alias_is_unresolved() {
        let mut chain = chain_with(&[("a.ts", "type T = T;")]);
        let t = global_member(&chain, "T");
        let ty = chain.resolver().resolve_declared_symbol(t, &ResolutionContext::types());
        assert_eq!(ty, TypeId::UNRESOLVED);

        let id = chain.unit_id("a.ts").unwrap();
        let diagnostics = chain.diagnostics(id, &CancellationToken::new()).unwrap();
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.as_ref() == "Type alias 'T' circularly references itself.")
        );
    }

    #[test]
    fn test_circular_interfaces_are_unresolved() {
        let mut chain = chain_with(&[("a.ts", "interface A extends B {}\ninterface B extends A {}")]);
        let a = global_member(&chain, "A");
        let b = global_member(&chain, "B");
        let mut resolver = chain.resolver();
        assert!(resolver.resolve_declared_symbol(a, &ResolutionContext::types()).is_unresolved());
        assert!(resolver.resolve_declared_symbol(b, &ResolutionContext::types()).is_unresolved());
    }

    #[test]
    fn test_aggressive_resolution_records_nothing() {
        let mut chain = chain_with(&[("a.ts", "type T = T;")]);
        let t = global_member(&chain, "T");
        let ctx = ResolutionContext::types().aggressive();
        assert!(chain.resolver().resolve_declared_symbol(t, &ctx).is_unresolved());
        let id = chain.unit_id("a.ts").unwrap();
        assert_eq!(chain.cache.circularities_in(id).count(), 0);
    }

    #[test]
    fn test_cancelled_update_keeps_previous_state() {
        let mut chain = chain_with(&[("a.ts", "var a = 1;")]);
        let id = chain.unit_id("a.ts").unwrap();
        let before = chain.symbols().len();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let tree = parse("var b = 1;", "a.ts", &ParseOptions::default());
        assert_eq!(chain.update_unit(id, tree, &cancel), Err(Cancelled));

        assert_eq!(chain.unit(id).unwrap().tree().text(), "var a = 1;");
        assert!(chain.symbols().member(chain.global(), "a").is_some());
        assert!(chain.symbols().member(chain.global(), "b").is_none());
        assert_eq!(chain.symbols().len(), before);
        assert_eq!(chain.stats().cancelled, 1);
    }

    #[test]
    fn test_update_keeps_unchanged_symbols() {
        let mut chain = chain_with(&[("a.ts", "var a = 1;\nvar b = 2;")]);
        let id = chain.unit_id("a.ts").unwrap();
        let a = global_member(&chain, "a");
        let tree = parse("var a = 1;\nvar b = 'x';", "a.ts", &ParseOptions::default());
        chain.update_unit(id, tree, &CancellationToken::new()).unwrap();
        assert_eq!(global_member(&chain, "a"), a);
        assert_eq!(chain.stats().incremental_binds, 1);

        let b = global_member(&chain, "b");
        let ty = chain.resolver().resolve_declared_symbol(b, &ResolutionContext::values());
        assert_eq!(ty, TypeId::STRING);
    }

    #[test]
    fn test_modified_declaration_invalidates_dependents() {
        let mut chain = chain_with(&[("a.ts", "var a = 1;\nvar b = a;")]);
        let id = chain.unit_id("a.ts").unwrap();
        let b = global_member(&chain, "b");
        assert_eq!(
            chain.resolver().resolve_declared_symbol(b, &ResolutionContext::values()),
            TypeId::NUMBER
        );
        let tree = parse("var a = 'one';\nvar b = a;", "a.ts", &ParseOptions::default());
        chain.update_unit(id, tree, &CancellationToken::new()).unwrap();
        assert_eq!(
            chain.resolver().resolve_declared_symbol(b, &ResolutionContext::values()),
            TypeId::STRING
        );
    }

    #[test]
    fn test_remove_unit_drops_its_symbols() {
        let mut chain = chain_with(&[("a.ts", "class C {}")]);
        let id = chain.unit_id("a.ts").unwrap();
        assert!(chain.remove_unit(id));
        assert!(chain.symbols().member(chain.global(), "C").is_none());
        assert!(chain.unit_id("a.ts").is_none());
        assert!(!chain.remove_unit(id));
    }

    #[test]
    fn test_external_module_import() {
        let mut chain = chain_with(&[
            ("lib/util.ts", "export function twice(n: number) { return n * 2; }"),
            ("lib/main.ts", "import u = require('./util');\nvar r = u.twice(2);"),
        ]);
        let main = chain.unit_id("lib/main.ts").unwrap();
        let diagnostics = chain.diagnostics(main, &CancellationToken::new()).unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let module = chain.external_module("lib/main").unwrap();
        let r = chain.symbols().local(module, "r").unwrap();
        let ty = chain.resolver().resolve_declared_symbol(r, &ResolutionContext::values());
        assert_eq!(ty, TypeId::NUMBER);
    }

    #[test]
    fn test_unknown_external_module_is_reported() {
        let mut chain = chain_with(&[("main.ts", "import u = require('./missing');")]);
        let id = chain.unit_id("main.ts").unwrap();
        let diagnostics = chain.diagnostics(id, &CancellationToken::new()).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(codes::INVALID_IMPORT));
    }

    #[test]
    fn test_undefined_type_is_reported() {
        let mut chain = chain_with(&[("a.ts", "var x: Missing;")]);
        let id = chain.unit_id("a.ts").unwrap();
        let diagnostics = chain.diagnostics(id, &CancellationToken::new()).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message.as_ref(), "Could not find symbol 'Missing'.");
        assert_eq!(diagnostics[0].to_tuple(), (1, 7, 14, "Could not find symbol 'Missing'.".to_string()));
    }
}
