//! Symbol binding.
//!
//! Binding attaches every declaration of a unit to a symbol, merging
//! declarations that are allowed to share one. All changes go through a
//! [`BindTxn`], which works on a staged copy of the symbol table and is
//! either committed as a whole or dropped.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::decls::{DeclFlags, DeclForest, DeclId, DeclKind};
use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::diff::{DeclChange, DeclDiff};
use super::symbols::{
    DeclRef, Symbol, SymbolFlags, SymbolId, SymbolKind, SymbolTable, SymbolTableKind, UnitId,
};
use super::types::Primitive;

/// The operation was cancelled and its partial work discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// Declaration to symbol links of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitBinding {
    /// Indexed by `DeclId`
    pub decl_symbols: Vec<Option<SymbolId>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitBinding {
    pub fn symbol_of(&self, decl: DeclId) -> Option<SymbolId> {
        self.decl_symbols.get(decl.index()).copied().flatten()
    }

    fn link(&mut self, decl: DeclId, symbol: SymbolId) {
        if let Some(slot) = self.decl_symbols.get_mut(decl.index()) {
            *slot = Some(symbol);
        }
    }

    fn linked(&self) -> FxHashSet<SymbolId> {
        self.decl_symbols.iter().flatten().copied().collect()
    }
}

/// Allocate the global symbol and the primitive types it holds.
pub fn seed_globals(symbols: &mut SymbolTable) -> SymbolId {
    let global = symbols.alloc(Symbol::new(SmolStr::default(), SymbolKind::Global, None));
    for primitive in Primitive::ALL {
        let name = SmolStr::new_static(primitive.name());
        let symbol = symbols.alloc(Symbol::new(name.clone(), SymbolKind::Primitive, Some(global)));
        symbols.insert_in(global, SymbolTableKind::Locals, name, symbol);
    }
    global
}

/// Name an external module file is imported by: its path without extension.
pub fn module_name(path: &str) -> SmolStr {
    let stem = [".d.ts", ".ts", ".js"]
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path);
    SmolStr::new(stem)
}

/// Resolve a `require` path against the importing unit. Non-relative paths
/// are returned as written.
pub fn normalize_module_path(importer: &str, spec: &str) -> SmolStr {
    if !(spec.starts_with("./") || spec.starts_with("../")) {
        return module_name(spec);
    }
    let mut parts: Vec<&str> = importer.split('/').collect();
    parts.pop();
    for segment in spec.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    module_name(&parts.join("/"))
}

fn can_merge(existing: SymbolKind, incoming: DeclKind) -> bool {
    matches!(
        (existing, incoming),
        (SymbolKind::Module, DeclKind::Module)
            | (SymbolKind::Class | SymbolKind::Function | SymbolKind::Enum, DeclKind::Module)
            | (SymbolKind::Interface, DeclKind::Interface)
            | (SymbolKind::Function, DeclKind::Function)
            | (SymbolKind::Variable, DeclKind::Variable)
            | (SymbolKind::Parameter, DeclKind::Variable)
            | (SymbolKind::Method, DeclKind::Method)
            | (SymbolKind::Constructor, DeclKind::Constructor)
            | (SymbolKind::Accessor, DeclKind::GetAccessor | DeclKind::SetAccessor)
    )
}

fn symbol_flags(flags: DeclFlags) -> SymbolFlags {
    let mut out = SymbolFlags::empty();
    for (from, to) in [
        (DeclFlags::EXPORTED, SymbolFlags::EXPORTED),
        (DeclFlags::AMBIENT, SymbolFlags::AMBIENT),
        (DeclFlags::STATIC, SymbolFlags::STATIC),
        (DeclFlags::PRIVATE, SymbolFlags::PRIVATE),
        (DeclFlags::OPTIONAL, SymbolFlags::OPTIONAL),
    ] {
        if flags.contains(from) {
            out |= to;
        }
    }
    out
}

// ============================================================================
// Transaction
// ============================================================================

/// Staged binder state.
pub struct BindTxn<'c> {
    symbols: SymbolTable,
    external_modules: FxHashMap<SmolStr, SymbolId>,
    global: SymbolId,
    cancel: &'c CancellationToken,
    /// Symbols whose declarations changed
    touched: FxHashSet<SymbolId>,
    /// A name table gained or lost an entry
    names_changed: bool,
}

/// What a committed transaction changed.
#[derive(Debug, Clone, Default)]
pub struct BindOutcome {
    pub symbols: SymbolTable,
    pub external_modules: FxHashMap<SmolStr, SymbolId>,
    pub touched: FxHashSet<SymbolId>,
    pub names_changed: bool,
}

impl<'c> BindTxn<'c> {
    pub fn begin(
        symbols: &SymbolTable,
        external_modules: &FxHashMap<SmolStr, SymbolId>,
        global: SymbolId,
        cancel: &'c CancellationToken,
    ) -> Self {
        Self {
            symbols: symbols.clone(),
            external_modules: external_modules.clone(),
            global,
            cancel,
            touched: FxHashSet::default(),
            names_changed: false,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_outcome(self) -> BindOutcome {
        BindOutcome {
            symbols: self.symbols,
            external_modules: self.external_modules,
            touched: self.touched,
            names_changed: self.names_changed,
        }
    }

    fn check_cancel(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            debug!("binding cancelled");
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Bind every declaration of a unit that has no previous binding.
    pub fn bind_unit(&mut self, unit: UnitId, path: &str, forest: &DeclForest) -> Result<UnitBinding, Cancelled> {
        let mut binding = UnitBinding {
            decl_symbols: vec![None; forest.len()],
            diagnostics: Vec::new(),
        };
        let Some(root) = forest.root() else {
            return Ok(binding);
        };
        let root_symbol = self.root_symbol(unit, path, forest, root);
        binding.link(root, root_symbol);
        for &top in forest.top_level() {
            self.check_cancel()?;
            for id in subtree(forest, top) {
                self.bind_decl(unit, forest, id, &mut binding);
            }
        }
        binding.diagnostics = self.duplicate_diagnostics(unit, forest, &binding);
        debug!(path, decls = forest.len(), symbols = self.symbols.len(), "bound unit");
        Ok(binding)
    }

    /// Rebind a unit after a reparse, keeping the symbols of declarations
    /// that survived.
    pub fn rebind_unit(
        &mut self,
        unit: UnitId,
        path: &str,
        old_forest: &DeclForest,
        old_binding: &UnitBinding,
        forest: &DeclForest,
        diff: &DeclDiff,
    ) -> Result<UnitBinding, Cancelled> {
        let (Some(old_root), Some(root)) = (old_forest.root(), forest.root()) else {
            self.unbind_unit(unit, old_forest, old_binding);
            return self.bind_unit(unit, path, forest);
        };
        if old_forest.is_external_module() != forest.is_external_module() {
            trace!(path, "module kind changed, binding from scratch");
            self.unbind_unit(unit, old_forest, old_binding);
            return self.bind_unit(unit, path, forest);
        }

        let old_symbols = old_binding.linked();
        for &symbol in &old_symbols {
            self.symbols.remove_decls_of_unit(symbol, unit);
        }

        let mut binding = UnitBinding {
            decl_symbols: vec![None; forest.len()],
            diagnostics: Vec::new(),
        };
        let root_symbol = old_binding.symbol_of(old_root).unwrap_or(self.global);
        if root_symbol != self.global {
            self.symbols.get_mut(root_symbol).decls.push(DeclRef { unit, decl: root });
        }
        binding.link(root, root_symbol);

        // Matched declarations keep their symbol when their parent kept its
        // own and nothing that decides the symbol table changed.
        let mut reused = vec![false; forest.len()];
        reused[root.index()] = true;
        for id in forest.preorder() {
            let decl = forest.get(id);
            let Some(parent) = decl.parent else {
                continue;
            };
            let Some(old_id) = diff.old_for(id) else {
                continue;
            };
            let Some(symbol) = old_binding.symbol_of(old_id) else {
                continue;
            };
            let keep = reused[parent.index()]
                && old_forest.get(old_id).flags == decl.flags
                && !self.symbols.get(symbol).flags.contains(SymbolFlags::DUPLICATE)
                && !self.symbols.get(symbol).tombstoned;
            if keep {
                reused[id.index()] = true;
                self.symbols.get_mut(symbol).decls.push(DeclRef { unit, decl: id });
                binding.link(id, symbol);
            }
        }

        for &top in forest.top_level() {
            self.check_cancel()?;
            for id in subtree(forest, top) {
                if !reused[id.index()] {
                    self.bind_decl(unit, forest, id, &mut binding);
                }
            }
        }

        let mut dropped = 0;
        for &symbol in &old_symbols {
            if self.tombstone_if_empty(symbol) {
                dropped += 1;
            }
        }

        for change in &diff.changes {
            match *change {
                DeclChange::Modified { new, .. } => {
                    if let Some(symbol) = binding.symbol_of(new) {
                        self.touched.insert(symbol);
                    }
                }
                DeclChange::Added(new) => {
                    self.names_changed = true;
                    self.touch_with_container(binding.symbol_of(new));
                }
                DeclChange::Removed(old) => {
                    self.names_changed = true;
                    self.touch_with_container(old_binding.symbol_of(old));
                }
                DeclChange::Unchanged { .. } => {}
            }
        }

        binding.diagnostics = self.duplicate_diagnostics(unit, forest, &binding);
        debug!(
            path,
            reused = reused.iter().filter(|r| **r).count(),
            tombstoned = dropped,
            touched = self.touched.len(),
            "rebound unit"
        );
        Ok(binding)
    }

    /// Drop every declaration of a unit.
    pub fn unbind_unit(&mut self, unit: UnitId, forest: &DeclForest, binding: &UnitBinding) {
        let symbols = binding.linked();
        for &symbol in &symbols {
            self.symbols.remove_decls_of_unit(symbol, unit);
            self.touched.insert(symbol);
        }
        for &symbol in &symbols {
            self.tombstone_if_empty(symbol);
        }
        self.names_changed = true;
        debug!(unit = unit.0, decls = forest.len(), "unbound unit");
    }

    fn touch_with_container(&mut self, symbol: Option<SymbolId>) {
        if let Some(symbol) = symbol {
            self.touched.insert(symbol);
            if let Some(container) = self.symbols.get(symbol).container {
                self.touched.insert(container);
            }
        }
    }

    fn tombstone_if_empty(&mut self, symbol: SymbolId) -> bool {
        let target = self.symbols.get(symbol);
        if target.tombstoned
            || !target.decls.is_empty()
            || matches!(target.kind, SymbolKind::Primitive | SymbolKind::Global)
        {
            return false;
        }
        trace!(name = %target.name, "tombstoning symbol");
        self.symbols.tombstone(symbol);
        self.external_modules.retain(|_, s| *s != symbol);
        self.touched.insert(symbol);
        self.names_changed = true;
        true
    }

    fn root_symbol(&mut self, unit: UnitId, path: &str, forest: &DeclForest, root: DeclId) -> SymbolId {
        if !forest.is_external_module() {
            return self.global;
        }
        let name = module_name(path);
        let mut module = Symbol::new(name.clone(), SymbolKind::Module, None);
        module.flags |= SymbolFlags::EXTERNAL;
        module.decls.push(DeclRef { unit, decl: root });
        let symbol = self.symbols.alloc(module);
        self.external_modules.insert(name, symbol);
        self.touched.insert(symbol);
        symbol
    }

    /// Container and table a declaration is registered in.
    fn table_for(&self, forest: &DeclForest, id: DeclId) -> SymbolTableKind {
        let decl = forest.get(id);
        let Some(parent) = decl.parent.map(|p| forest.get(p)) else {
            return SymbolTableKind::Locals;
        };
        if decl.kind.is_signature() && matches!(parent.kind, DeclKind::Class | DeclKind::Interface) {
            return SymbolTableKind::Signatures;
        }
        if decl.kind == DeclKind::TypeParameter {
            return SymbolTableKind::Locals;
        }
        match parent.kind {
            DeclKind::Class | DeclKind::Interface | DeclKind::Enum => SymbolTableKind::Members,
            DeclKind::Module => {
                if decl.flags.contains(DeclFlags::EXPORTED) || parent.flags.contains(DeclFlags::AMBIENT) {
                    SymbolTableKind::Members
                } else {
                    SymbolTableKind::Locals
                }
            }
            DeclKind::Script => {
                if !forest.is_external_module() || decl.flags.contains(DeclFlags::EXPORTED) {
                    SymbolTableKind::Members
                } else {
                    SymbolTableKind::Locals
                }
            }
            _ => SymbolTableKind::Locals,
        }
    }

    fn bind_decl(&mut self, unit: UnitId, forest: &DeclForest, id: DeclId, binding: &mut UnitBinding) {
        let decl = forest.get(id);
        let Some(container) = decl.parent.and_then(|p| binding.symbol_of(p)) else {
            return;
        };
        let kind = SymbolKind::from_decl(decl.kind);
        let table = self.table_for(forest, id);

        let symbol = if decl.flags.contains(DeclFlags::EXTERNAL_NAME) {
            self.bind_quoted_module(decl.name.clone(), container)
        } else if decl.name.is_empty() || table == SymbolTableKind::Signatures {
            let symbol = self.symbols.alloc(Symbol::new(decl.name.clone(), kind, Some(container)));
            if table == SymbolTableKind::Signatures {
                self.symbols.insert_in(container, table, decl.name.clone(), symbol);
            }
            symbol
        } else {
            let existing = match self.symbols.lookup_in(container, table, &decl.name) {
                // Left over from a declaration this rebind removed
                Some(stale) if self.tombstone_if_empty(stale) => None,
                other => other,
            };
            match existing {
                Some(existing) if can_merge(self.symbols.get(existing).kind, decl.kind) => {
                    let target = self.symbols.get_mut(existing);
                    if decl.kind == DeclKind::Module && target.kind != SymbolKind::Module {
                        target.flags |= SymbolFlags::HAS_NAMESPACE;
                    }
                    trace!(name = %decl.name, kind = decl.kind.as_str(), "merged declaration");
                    existing
                }
                Some(_) => {
                    trace!(name = %decl.name, kind = decl.kind.as_str(), "duplicate declaration");
                    let mut duplicate = Symbol::new(decl.name.clone(), kind, Some(container));
                    duplicate.flags |= SymbolFlags::DUPLICATE;
                    self.symbols.alloc(duplicate)
                }
                None => {
                    let symbol = self.symbols.alloc(Symbol::new(decl.name.clone(), kind, Some(container)));
                    self.symbols.insert_in(container, table, decl.name.clone(), symbol);
                    self.names_changed = true;
                    symbol
                }
            }
        };

        let target = self.symbols.get_mut(symbol);
        target.flags |= symbol_flags(decl.flags);
        target.decls.push(DeclRef { unit, decl: id });
        binding.link(id, symbol);
        self.touched.insert(symbol);
    }

    /// `declare module "name" { ... }` registers an external module rather
    /// than a name in its container.
    fn bind_quoted_module(&mut self, name: SmolStr, container: SymbolId) -> SymbolId {
        if let Some(&existing) = self.external_modules.get(&name) {
            return existing;
        }
        let mut module = Symbol::new(name.clone(), SymbolKind::Module, Some(container));
        module.flags |= SymbolFlags::EXTERNAL;
        let symbol = self.symbols.alloc(module);
        self.external_modules.insert(name, symbol);
        self.names_changed = true;
        symbol
    }

    fn duplicate_diagnostics(&self, unit: UnitId, forest: &DeclForest, binding: &UnitBinding) -> Vec<Diagnostic> {
        let mut collector = DiagnosticCollector::new();
        for (id, decl) in forest.iter() {
            let Some(symbol) = binding.symbol_of(id) else {
                continue;
            };
            if self.symbols.get(symbol).flags.contains(SymbolFlags::DUPLICATE) {
                collector.duplicate_identifier(unit, decl.name_span, &decl.name);
            }
        }
        collector.take()
    }
}

/// Declarations under `top` in pre-order, `top` included
fn subtree(forest: &DeclForest, top: DeclId) -> Vec<DeclId> {
    let mut out = Vec::new();
    let mut stack = vec![top];
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(forest.get(id).children.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::decls::collect_decls;
    use crate::hir::diff::diff_forests;
    use crate::parser::{ParseOptions, parse};
    use crate::syntax::{Ast, lower};

    fn ast(text: &str, path: &str) -> Ast {
        lower(&parse(text, path, &ParseOptions::default())).unwrap()
    }

    fn fresh() -> (SymbolTable, SymbolId) {
        let mut symbols = SymbolTable::new();
        let global = seed_globals(&mut symbols);
        (symbols, global)
    }

    #[test]
    fn test_modules_merge() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        let forest = collect_decls(&ast("module M {} module M {}", "a.ts"));
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        let binding = txn.bind_unit(UnitId(1), "a.ts", &forest).unwrap();
        let symbols = txn.into_outcome().symbols;
        let m = symbols.member(global, "M").unwrap();
        assert_eq!(symbols.get(m).decls.len(), 2);
        assert!(binding.diagnostics.is_empty());
    }

    #[test]
    fn test_incompatible_collision_is_duplicate() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        let forest = collect_decls(&ast("var x; class x {}", "a.ts"));
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        let binding = txn.bind_unit(UnitId(1), "a.ts", &forest).unwrap();
        assert_eq!(binding.diagnostics.len(), 1);
        assert_eq!(&*binding.diagnostics[0].message, "Duplicate identifier 'x'.");
        assert_eq!(binding.diagnostics[0].start(), 13);
    }

    #[test]
    fn test_module_after_class_merges() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        let forest = collect_decls(&ast("class C {} module C { export var x; }", "a.ts"));
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        txn.bind_unit(UnitId(1), "a.ts", &forest).unwrap();
        let symbols = txn.into_outcome().symbols;
        let c = symbols.member(global, "C").unwrap();
        assert!(symbols.get(c).flags.contains(SymbolFlags::HAS_NAMESPACE));
        assert!(symbols.member(c, "x").is_some());
    }

    #[test]
    fn test_cancelled_bind_leaves_original_untouched() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        token.cancel();
        let forest = collect_decls(&ast("var a;", "a.ts"));
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        assert_eq!(txn.bind_unit(UnitId(1), "a.ts", &forest), Err(Cancelled));
        assert!(symbols.member(global, "a").is_none());
    }

    #[test]
    fn test_rebind_keeps_surviving_symbols() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        let old_ast = ast("var a = 1; var b;", "a.ts");
        let old = collect_decls(&old_ast);
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        let old_binding = txn.bind_unit(UnitId(1), "a.ts", &old).unwrap();
        let first = txn.into_outcome();
        let a = first.symbols.member(global, "a").unwrap();
        let b = first.symbols.member(global, "b").unwrap();

        let new_ast = ast("var a = 2;", "a.ts");
        let new = collect_decls(&new_ast);
        let diff = diff_forests(&old_ast, &old, &new_ast, &new);
        let mut txn = BindTxn::begin(&first.symbols, &first.external_modules, global, &token);
        txn.rebind_unit(UnitId(1), "a.ts", &old, &old_binding, &new, &diff).unwrap();
        let second = txn.into_outcome();

        assert_eq!(second.symbols.member(global, "a"), Some(a));
        assert!(second.symbols.member(global, "b").is_none());
        assert!(second.symbols.get(b).tombstoned);
        assert!(second.touched.contains(&a));
        assert!(second.names_changed);
    }

    #[test]
    fn test_external_module_root() {
        let (symbols, global) = fresh();
        let token = CancellationToken::new();
        let forest = collect_decls(&ast("export var x; var hidden;", "lib/util.ts"));
        let mut txn = BindTxn::begin(&symbols, &FxHashMap::default(), global, &token);
        txn.bind_unit(UnitId(1), "lib/util.ts", &forest).unwrap();
        let outcome = txn.into_outcome();
        let module = outcome.external_modules["lib/util"];
        assert!(outcome.symbols.member(module, "x").is_some());
        assert!(outcome.symbols.local(module, "hidden").is_some());
        assert!(outcome.symbols.member(global, "x").is_none());
    }

    #[test]
    fn test_normalize_module_path() {
        assert_eq!(normalize_module_path("src/a.ts", "./b"), "src/b");
        assert_eq!(normalize_module_path("src/x/a.ts", "../b.ts"), "src/b");
        assert_eq!(normalize_module_path("a.ts", "fs"), "fs");
    }
}
