//! Type resolution: demand-driven, memoized answers to "what does this
//! name mean" and "what type does this have".
//!
//! # Architecture
//!
//! Nothing is resolved up front. Every query starts from an AST node or a
//! symbol and pulls in exactly what it needs:
//!
//! 1. **Names** resolve by walking the AST ancestors of the use site and
//!    consulting the tables of each enclosing declaration's symbol, then the
//!    global symbol.
//! 2. **Symbols** resolve to their declared type, memoized per symbol. A
//!    symbol that is reached again while it is being resolved yields
//!    [`TypeId::UNRESOLVED`]; the cycle is reported unless the query is
//!    aggressive.
//! 3. **Expressions** are typed bottom-up, with a contextual type flowing
//!    down from declarations, assignments, call arguments and returns.
//!
//! ## Key Data Structures
//!
//! - [`ResolverCache`] - memoized symbol types, the in-progress guard,
//!   dependency edges and per-unit query caches
//! - [`Resolver`] - a borrow of the chain's state for one burst of queries

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::trace;

use super::binder::normalize_module_path;
use super::chain::CompilationUnit;
use super::diagnostics::{Diagnostic, codes};
use super::symbols::{DeclRef, SymbolFlags, SymbolId, SymbolKind, SymbolTable, SymbolTableKind, UnitId};
use super::types::{FnParam, FnSig, ObjectShape, Primitive, Type, TypeId, TypeTable};
use crate::parser::TextSize;
use crate::syntax::{
    Ast, AstFlags, AstId, AstKind, BinaryOp, ArithOp, ImportTarget, PredefinedType, Signature, UnaryOp,
};

// ============================================================================
// CONTEXT
// ============================================================================

/// Which declaration space a name is looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Space {
    Type,
    Value,
    /// Left of a dot in a type or import name
    Namespace,
}

impl Space {
    fn admits(self, kind: SymbolKind) -> bool {
        match self {
            Space::Type => kind.is_type(),
            Space::Value => kind.is_value(),
            Space::Namespace => kind.is_namespace(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionContext {
    pub space: Space,
    /// Type expected at the position, if any
    pub contextual_type: Option<TypeId>,
    /// Resolve without recording circularity diagnostics
    pub aggressive: bool,
}

impl ResolutionContext {
    pub fn types() -> Self {
        Self {
            space: Space::Type,
            contextual_type: None,
            aggressive: false,
        }
    }

    pub fn values() -> Self {
        Self {
            space: Space::Value,
            ..Self::types()
        }
    }

    pub fn namespaces() -> Self {
        Self {
            space: Space::Namespace,
            ..Self::types()
        }
    }

    pub fn in_space(space: Space) -> Self {
        Self {
            space,
            ..Self::types()
        }
    }

    pub fn with_contextual_type(mut self, ty: Option<TypeId>) -> Self {
        self.contextual_type = ty;
        self
    }

    pub fn aggressive(mut self) -> Self {
        self.aggressive = true;
        self
    }
}

/// Everything known about one source position.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionInfo {
    /// Symbol the innermost node refers to or declares
    pub symbol: Option<SymbolId>,
    /// Innermost AST node containing the offset
    pub ast: Option<AstId>,
    pub enclosing_declaration: Option<SymbolId>,
    pub ty: TypeId,
    pub contextual_type: Option<TypeId>,
}

/// A member reachable through a type.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Members of anonymous object types have no symbol
    pub symbol: Option<SymbolId>,
    pub ty: TypeId,
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Clone, Debug, Default)]
struct UnitQueries {
    symbols: FxHashMap<(AstId, Space), Option<SymbolId>>,
    types: FxHashMap<AstId, TypeId>,
}

/// Memoized resolution state, owned by the semantic chain.
#[derive(Clone, Debug, Default)]
pub struct ResolverCache {
    symbol_types: FxHashMap<SymbolId, TypeId>,
    in_progress: FxHashSet<SymbolId>,
    aliases_in_progress: FxHashSet<SymbolId>,
    stack: Vec<SymbolId>,
    /// symbol -> symbols whose type was computed from it
    dependents: FxHashMap<SymbolId, FxHashSet<SymbolId>>,
    units: FxHashMap<UnitId, UnitQueries>,
    circularities: FxHashMap<SymbolId, Diagnostic>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_type(&self, symbol: SymbolId) -> Option<TypeId> {
        self.symbol_types.get(&symbol).copied()
    }

    /// Forget the types of `touched` and of everything computed from them.
    pub fn invalidate_symbols(&mut self, touched: impl IntoIterator<Item = SymbolId>) -> usize {
        let mut worklist: Vec<SymbolId> = touched.into_iter().collect();
        let mut seen = FxHashSet::default();
        let mut dropped = 0;
        while let Some(symbol) = worklist.pop() {
            if !seen.insert(symbol) {
                continue;
            }
            if self.symbol_types.remove(&symbol).is_some() {
                dropped += 1;
            }
            self.circularities.remove(&symbol);
            if let Some(dependents) = self.dependents.remove(&symbol) {
                worklist.extend(dependents);
            }
        }
        trace!(dropped, "invalidated symbol types");
        dropped
    }

    /// Forget every symbol type.
    pub fn clear_types(&mut self) {
        self.symbol_types.clear();
        self.dependents.clear();
        self.circularities.clear();
    }

    /// Forget the AST query caches of one unit.
    pub fn clear_unit(&mut self, unit: UnitId) {
        self.units.remove(&unit);
    }

    /// Forget the AST query caches of every unit.
    pub fn clear_queries(&mut self) {
        self.units.clear();
    }

    /// Circularity diagnostics recorded for declarations in `unit`
    pub fn circularities_in(&self, unit: UnitId) -> impl Iterator<Item = &Diagnostic> {
        self.circularities.values().filter(move |d| d.unit == unit)
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Query-time resolution over a borrowed semantic chain.
pub struct Resolver<'a> {
    pub(super) units: &'a [Option<CompilationUnit>],
    pub(super) symbols: &'a SymbolTable,
    pub(super) external_modules: &'a FxHashMap<SmolStr, SymbolId>,
    pub(super) global: SymbolId,
    pub(super) types: &'a mut TypeTable,
    pub(super) cache: &'a mut ResolverCache,
    pub(super) max_depth: usize,
    pub(super) report_circularity: bool,
    pub(super) aggressive: bool,
}

/// Name node of a declaring AST node
fn decl_name_node(kind: &AstKind) -> Option<AstId> {
    match kind {
        AstKind::Module { name, .. }
        | AstKind::Class { name, .. }
        | AstKind::Interface { name, .. }
        | AstKind::Enum { name, .. }
        | AstKind::EnumMember { name, .. }
        | AstKind::Function { name, .. }
        | AstKind::TypeAlias { name, .. }
        | AstKind::ImportAlias { name, .. }
        | AstKind::VarDecl { name, .. }
        | AstKind::Param { name, .. }
        | AstKind::TypeParam { name, .. }
        | AstKind::Property { name, .. }
        | AstKind::Method { name, .. }
        | AstKind::GetAccessor { name, .. }
        | AstKind::SetAccessor { name, .. }
        | AstKind::PropertySignature { name, .. }
        | AstKind::MethodSignature { name, .. }
        | AstKind::Catch { name, .. } => Some(*name),
        AstKind::FunctionExpr { name, .. } => *name,
        _ => None,
    }
}

fn signature_of(kind: &AstKind) -> Option<&Signature> {
    match kind {
        AstKind::Function { signature, .. }
        | AstKind::Method { signature, .. }
        | AstKind::Constructor { signature, .. }
        | AstKind::GetAccessor { signature, .. }
        | AstKind::SetAccessor { signature, .. }
        | AstKind::MethodSignature { signature, .. }
        | AstKind::CallSignature { signature }
        | AstKind::ConstructSignature { signature }
        | AstKind::FunctionExpr { signature, .. }
        | AstKind::Arrow { signature, .. } => Some(signature),
        _ => None,
    }
}

fn is_function_like(kind: &AstKind) -> bool {
    matches!(
        kind,
        AstKind::Function { .. }
            | AstKind::Method { .. }
            | AstKind::Constructor { .. }
            | AstKind::GetAccessor { .. }
            | AstKind::SetAccessor { .. }
            | AstKind::FunctionExpr { .. }
            | AstKind::Arrow { .. }
    )
}

/// Nodes whose type is computed by [`Resolver::type_of_expr`]
pub fn is_expression(kind: &AstKind) -> bool {
    matches!(
        kind,
        AstKind::Identifier(_)
            | AstKind::NumberLiteral(_)
            | AstKind::StringLiteral(_)
            | AstKind::RegexLiteral(_)
            | AstKind::True
            | AstKind::False
            | AstKind::Null
            | AstKind::This
            | AstKind::Super
            | AstKind::ArrayLiteral { .. }
            | AstKind::ObjectLiteral { .. }
            | AstKind::FunctionExpr { .. }
            | AstKind::Arrow { .. }
            | AstKind::Call { .. }
            | AstKind::New { .. }
            | AstKind::Member { .. }
            | AstKind::Index { .. }
            | AstKind::Unary { .. }
            | AstKind::Postfix { .. }
            | AstKind::Binary { .. }
            | AstKind::Conditional { .. }
            | AstKind::TypeAssertion { .. }
    )
}

/// Declaration space a node at `node` is read in.
pub fn space_at(ast: &Ast, node: AstId) -> Space {
    let mut child = node;
    for parent in ast.ancestors(node) {
        match ast.kind(parent) {
            AstKind::TypeRef { .. } => return Space::Type,
            AstKind::QualifiedName { left, .. } if *left == child => return Space::Namespace,
            AstKind::QualifiedName { .. } => child = parent,
            AstKind::ImportAlias { .. } => return Space::Namespace,
            _ => return Space::Value,
        }
    }
    Space::Value
}

impl<'a> Resolver<'a> {
    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn unit(&self, id: UnitId) -> Option<&'a CompilationUnit> {
        let units: &'a [Option<CompilationUnit>] = self.units;
        units.get(id.index())?.as_ref()
    }

    fn ast(&self, id: UnitId) -> Option<&'a Ast> {
        self.unit(id)?.ast().map(|ast| &**ast)
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        self.symbols
    }

    pub fn types(&self) -> &TypeTable {
        self.types
    }

    pub fn global(&self) -> SymbolId {
        self.global
    }

    /// Display a type the way it would be written in source.
    pub fn display_type(&self, ty: TypeId) -> String {
        self.types.display(ty, self.symbols)
    }

    fn nested(&self) -> ResolutionContext {
        ResolutionContext {
            aggressive: self.aggressive,
            ..ResolutionContext::values()
        }
    }

    fn enter(&mut self, ctx: &ResolutionContext) {
        if self.cache.stack.is_empty() {
            self.aggressive = ctx.aggressive;
        }
    }

    /// Symbol declared by an AST node
    fn decl_node_symbol(&self, unit: UnitId, node: AstId) -> Option<SymbolId> {
        let u = self.unit(unit)?;
        let decl = u.decls().decl_for_ast(node)?;
        u.binding().symbol_of(decl)
    }

    /// Unit, AST and declaring node of a declaration
    pub fn decl_site(&self, decl: DeclRef) -> Option<(UnitId, &'a Ast, AstId)> {
        let u = self.unit(decl.unit)?;
        let ast = u.ast().map(|a| &**a)?;
        (decl.decl.index() < u.decls().len()).then(|| (decl.unit, ast, u.decls().get(decl.decl).ast))
    }

    /// Range of a declaration's name
    pub fn decl_name_range(&self, decl: DeclRef) -> Option<rowan::TextRange> {
        let u = self.unit(decl.unit)?;
        (decl.decl.index() < u.decls().len()).then(|| u.decls().get(decl.decl).name_span)
    }

    fn admits(&self, space: Space, symbol: SymbolId) -> bool {
        let kind = self.symbols.get(symbol).kind;
        kind == SymbolKind::ImportAlias || space.admits(kind)
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    /// Symbol an AST node refers to or declares.
    pub fn resolve_ast(&mut self, unit: UnitId, node: AstId, ctx: &ResolutionContext) -> Option<SymbolId> {
        self.enter(ctx);
        if let Some(cached) = self
            .cache
            .units
            .get(&unit)
            .and_then(|q| q.symbols.get(&(node, ctx.space)))
        {
            return *cached;
        }
        let result = self.compute_ast_symbol(unit, node, ctx);
        self.cache
            .units
            .entry(unit)
            .or_default()
            .symbols
            .insert((node, ctx.space), result);
        result
    }

    fn compute_ast_symbol(&mut self, unit: UnitId, node: AstId, ctx: &ResolutionContext) -> Option<SymbolId> {
        let ast = self.ast(unit)?;
        if let Some(symbol) = self.decl_node_symbol(unit, node) {
            return Some(symbol);
        }
        match ast.kind(node) {
            AstKind::Identifier(name) => {
                if let Some(parent) = ast.parent(node) {
                    if decl_name_node(ast.kind(parent)) == Some(node)
                        && let Some(symbol) = self.decl_node_symbol(unit, parent)
                    {
                        return Some(symbol);
                    }
                    match ast.kind(parent) {
                        AstKind::Member { object, name: member } if *member == node => {
                            let object_ty = self.type_of_expr(unit, *object, &self.nested());
                            return self.member_symbol(object_ty, name);
                        }
                        AstKind::QualifiedName { left, right } if *right == node => {
                            let container = self.resolve_ast(unit, *left, &ResolutionContext::namespaces())?;
                            return self.namespace_member(container, name, ctx.space);
                        }
                        AstKind::PropertyAssignment { name: key, .. } if *key == node => {
                            let literal = ast.parent(parent)?;
                            let expected = self.contextual_type(unit, literal)?;
                            return self.member_symbol(expected, name);
                        }
                        _ => {}
                    }
                }
                self.resolve_name(unit, node, name, ctx.space)
            }
            AstKind::QualifiedName { right, .. } | AstKind::Member { name: right, .. } => {
                self.resolve_ast(unit, *right, ctx)
            }
            AstKind::TypeRef { name, .. } => self.resolve_ast(unit, *name, &ResolutionContext::types()),
            AstKind::TypeQuery { name } => self.resolve_ast(unit, *name, &ResolutionContext::values()),
            AstKind::Call { callee, .. } | AstKind::New { callee, .. } => {
                self.resolve_ast(unit, *callee, &ResolutionContext::values())
            }
            AstKind::This => self.enclosing_class(unit, node),
            _ => None,
        }
    }

    /// Tables consulted for bare names inside a declaration of `kind`
    fn scope_tables(kind: SymbolKind) -> &'static [SymbolTableKind] {
        match kind {
            SymbolKind::Global | SymbolKind::Module => &[SymbolTableKind::Locals, SymbolTableKind::Members],
            SymbolKind::Enum => &[SymbolTableKind::Members],
            SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Function
            | SymbolKind::Method
            | SymbolKind::Constructor
            | SymbolKind::Accessor
            | SymbolKind::FunctionExpression
            | SymbolKind::CallSignature
            | SymbolKind::ConstructSignature
            | SymbolKind::IndexSignature => &[SymbolTableKind::Locals],
            _ => &[],
        }
    }

    /// Scope symbols enclosing `at`, innermost first, ending with the global
    fn scopes(&self, unit: UnitId, at: AstId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        if let (Some(u), Some(ast)) = (self.unit(unit), self.ast(unit)) {
            for ancestor in std::iter::once(at).chain(ast.ancestors(at)) {
                let Some(decl) = u.decls().decl_for_ast(ancestor) else {
                    continue;
                };
                if let Some(symbol) = u.binding().symbol_of(decl)
                    && out.last() != Some(&symbol)
                {
                    out.push(symbol);
                }
            }
        }
        if out.last() != Some(&self.global) {
            out.push(self.global);
        }
        out
    }

    /// Look a bare name up from a use site outwards.
    pub fn resolve_name(&mut self, unit: UnitId, at: AstId, name: &str, space: Space) -> Option<SymbolId> {
        let symbols = self.symbols;
        let start = self.ast(unit).and_then(|ast| ast.parent(at)).unwrap_or(at);
        for scope in self.scopes(unit, start) {
            let tables = if scope == self.global {
                &[SymbolTableKind::Members, SymbolTableKind::Locals][..]
            } else {
                Self::scope_tables(symbols.get(scope).kind)
            };
            for &table in tables {
                if let Some(found) = symbols.lookup_in(scope, table, name)
                    && self.admits(space, found)
                {
                    return Some(found);
                }
            }
        }
        trace!(name, ?space, "unresolved name");
        None
    }

    /// Every name visible at `at`, innermost declarations shadowing outer ones.
    pub fn visible_symbols(&mut self, unit: UnitId, at: AstId) -> Vec<SymbolId> {
        let symbols = self.symbols;
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for scope in self.scopes(unit, at) {
            let tables = if scope == self.global {
                &[SymbolTableKind::Members, SymbolTableKind::Locals][..]
            } else {
                Self::scope_tables(symbols.get(scope).kind)
            };
            for &table in tables {
                let entries = match table {
                    SymbolTableKind::Members => &symbols.get(scope).members,
                    _ => &symbols.get(scope).locals,
                };
                for (name, &symbol) in entries {
                    if seen.insert(name.clone()) {
                        out.push(symbol);
                    }
                }
            }
        }
        out
    }

    fn namespace_member(&mut self, container: SymbolId, name: &str, space: Space) -> Option<SymbolId> {
        let container = self.follow_alias(container).unwrap_or(container);
        let found = self.symbols.member(container, name)?;
        self.admits(space, found).then_some(found)
    }

    fn enclosing_class(&self, unit: UnitId, node: AstId) -> Option<SymbolId> {
        let ast = self.ast(unit)?;
        ast.ancestors(node)
            .find(|&a| matches!(ast.kind(a), AstKind::Class { .. }))
            .and_then(|class| self.decl_node_symbol(unit, class))
    }

    /// Target of an import alias: an external module or an entity.
    pub fn alias_target(&mut self, alias: SymbolId) -> Option<SymbolId> {
        let decl = self.symbols.get(alias).first_decl()?;
        let (unit, ast, node) = self.decl_site(decl)?;
        let AstKind::ImportAlias { target, .. } = ast.kind(node) else {
            return None;
        };
        match target {
            ImportTarget::External(spec) => {
                let importer = self.unit(unit)?.path();
                let name = normalize_module_path(importer, spec);
                self.external_modules.get(&name).copied()
            }
            ImportTarget::Entity(entity) => {
                if !self.cache.aliases_in_progress.insert(alias) {
                    trace!(alias = %self.symbols.get(alias).name, "alias cycle");
                    return None;
                }
                let resolved = [Space::Namespace, Space::Type, Space::Value]
                    .into_iter()
                    .find_map(|space| self.resolve_ast(unit, *entity, &ResolutionContext::in_space(space)));
                self.cache.aliases_in_progress.remove(&alias);
                resolved
            }
        }
    }

    fn follow_alias(&mut self, symbol: SymbolId) -> Option<SymbolId> {
        let mut current = symbol;
        for _ in 0..self.max_depth {
            if self.symbols.get(current).kind != SymbolKind::ImportAlias {
                return Some(current);
            }
            current = self.alias_target(current)?;
        }
        None
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    /// Declared type of a symbol, memoized.
    pub fn resolve_declared_symbol(&mut self, symbol: SymbolId, ctx: &ResolutionContext) -> TypeId {
        self.enter(ctx);
        if let Some(&dependent) = self.cache.stack.last()
            && dependent != symbol
        {
            self.cache.dependents.entry(symbol).or_default().insert(dependent);
        }
        if let Some(&ty) = self.cache.symbol_types.get(&symbol) {
            return ty;
        }
        if self.cache.in_progress.contains(&symbol) {
            trace!(symbol = %self.symbols.get(symbol).name, "resolution cycle");
            if !self.aggressive {
                self.record_circularity(symbol);
            }
            return TypeId::UNRESOLVED;
        }
        if self.cache.stack.len() >= self.max_depth {
            trace!(depth = self.cache.stack.len(), "resolution depth limit");
            return TypeId::UNRESOLVED;
        }

        self.cache.in_progress.insert(symbol);
        self.cache.stack.push(symbol);
        let ty = self.compute_declared_type(symbol);
        self.cache.stack.pop();
        self.cache.in_progress.remove(&symbol);
        self.cache.symbol_types.insert(symbol, ty);
        ty
    }

    fn record_circularity(&mut self, symbol: SymbolId) {
        if !self.report_circularity || self.cache.circularities.contains_key(&symbol) {
            return;
        }
        let target = self.symbols.get(symbol);
        let message = match target.kind {
            SymbolKind::TypeAlias => format!("Type alias '{}' circularly references itself.", target.name),
            SymbolKind::Interface | SymbolKind::Class => {
                format!("Type '{}' recursively references itself as a base type.", target.name)
            }
            _ => return,
        };
        let Some(decl) = target.first_decl() else {
            return;
        };
        let Some(range) = self.decl_name_range(decl) else {
            return;
        };
        let diagnostic = Diagnostic::error(decl.unit, range, message).with_code(codes::CIRCULAR_DEPENDENCY);
        self.cache.circularities.insert(symbol, diagnostic);
    }

    fn compute_declared_type(&mut self, symbol: SymbolId) -> TypeId {
        let symbols = self.symbols;
        let target = symbols.get(symbol);
        match target.kind {
            SymbolKind::Global => TypeId::UNRESOLVED,
            SymbolKind::Primitive => Primitive::from_name(&target.name)
                .map(Primitive::type_id)
                .unwrap_or(TypeId::UNRESOLVED),
            SymbolKind::Module => self.types.intern(Type::Namespace(symbol)),
            SymbolKind::Enum => self.types.intern(Type::Namespace(symbol)),
            SymbolKind::EnumMember => match target.container {
                Some(e) => self.types.intern(Type::Enum(e)),
                None => TypeId::NUMBER,
            },
            SymbolKind::TypeParameter => self.types.intern(Type::TypeParameter(symbol)),
            SymbolKind::Class => {
                if self.bases_unresolved(symbol) {
                    return TypeId::UNRESOLVED;
                }
                self.types.intern(Type::Constructor(symbol))
            }
            SymbolKind::Interface => {
                if self.bases_unresolved(symbol) {
                    return TypeId::UNRESOLVED;
                }
                self.types.intern(Type::Instance(symbol))
            }
            SymbolKind::TypeAlias => {
                let Some((unit, ast, node)) = target.first_decl().and_then(|d| self.decl_site(d)) else {
                    return TypeId::UNRESOLVED;
                };
                match ast.kind(node) {
                    AstKind::TypeAlias { ty, .. } => self.type_of_type_node(unit, *ty),
                    _ => TypeId::UNRESOLVED,
                }
            }
            SymbolKind::ImportAlias => match self.alias_target(symbol) {
                Some(module) if symbols.get(module).flags.contains(SymbolFlags::EXTERNAL) => {
                    self.types.intern(Type::Namespace(module))
                }
                Some(entity) => self.resolve_declared_symbol(entity, &self.nested()),
                None => TypeId::UNRESOLVED,
            },
            SymbolKind::Accessor => self.accessor_type(symbol),
            SymbolKind::Function
            | SymbolKind::Method
            | SymbolKind::Constructor
            | SymbolKind::FunctionExpression
            | SymbolKind::CallSignature
            | SymbolKind::ConstructSignature => {
                let Some((unit, ast, node)) = target.first_decl().and_then(|d| self.decl_site(d)) else {
                    return TypeId::UNRESOLVED;
                };
                let sig = self.signature_type(unit, ast, node, target.container);
                self.types.function(sig)
            }
            SymbolKind::IndexSignature => {
                let Some((unit, ast, node)) = target.first_decl().and_then(|d| self.decl_site(d)) else {
                    return TypeId::UNRESOLVED;
                };
                match ast.kind(node) {
                    AstKind::IndexSignature { ty: Some(ty), .. } => self.type_of_type_node(unit, *ty),
                    _ => TypeId::ANY,
                }
            }
            SymbolKind::Property | SymbolKind::Variable | SymbolKind::Parameter => {
                let Some((unit, ast, node)) = target.first_decl().and_then(|d| self.decl_site(d)) else {
                    return TypeId::UNRESOLVED;
                };
                self.variable_type(unit, ast, node)
            }
        }
    }

    /// Resolve every base of a class or interface; true when one of them
    /// runs into a cycle.
    fn bases_unresolved(&mut self, symbol: SymbolId) -> bool {
        let decls = self.symbols.get(symbol).decls.clone();
        for decl in decls {
            let Some((unit, ast, node)) = self.decl_site(decl) else {
                continue;
            };
            let bases: Vec<AstId> = match ast.kind(node) {
                AstKind::Class { extends, .. } => extends.iter().copied().collect(),
                AstKind::Interface { extends, .. } => extends.clone(),
                _ => continue,
            };
            for base in bases {
                let Some(base_symbol) = self.resolve_ast(unit, base, &ResolutionContext::types()) else {
                    continue;
                };
                if matches!(
                    self.symbols.get(base_symbol).kind,
                    SymbolKind::Class | SymbolKind::Interface
                ) && self.resolve_declared_symbol(base_symbol, &self.nested()).is_unresolved()
                {
                    return true;
                }
            }
        }
        false
    }

    /// Symbols of the classes or interfaces `symbol` directly extends
    fn base_symbols(&mut self, symbol: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        for decl in self.symbols.get(symbol).decls.clone() {
            let Some((unit, ast, node)) = self.decl_site(decl) else {
                continue;
            };
            let bases: Vec<AstId> = match ast.kind(node) {
                AstKind::Class { extends, .. } => extends.iter().copied().collect(),
                AstKind::Interface { extends, .. } => extends.clone(),
                _ => continue,
            };
            for base in bases {
                if let Some(found) = self.resolve_ast(unit, base, &ResolutionContext::types()) {
                    out.push(self.follow_alias(found).unwrap_or(found));
                }
            }
        }
        out
    }

    fn accessor_type(&mut self, symbol: SymbolId) -> TypeId {
        for decl in self.symbols.get(symbol).decls.clone() {
            let Some((unit, ast, node)) = self.decl_site(decl) else {
                continue;
            };
            match ast.kind(node) {
                AstKind::GetAccessor { signature, .. } => {
                    if let Some(ret) = signature.return_type {
                        return self.type_of_type_node(unit, ret);
                    }
                }
                AstKind::SetAccessor { signature, .. } => {
                    if let Some(&param) = signature.params.first()
                        && let AstKind::Param { ty: Some(ty), .. } = ast.kind(param)
                    {
                        return self.type_of_type_node(unit, *ty);
                    }
                }
                _ => {}
            }
        }
        TypeId::ANY
    }

    fn variable_type(&mut self, unit: UnitId, ast: &'a Ast, node: AstId) -> TypeId {
        match ast.kind(node) {
            AstKind::VarDecl { ty, init, .. } | AstKind::Property { ty, init, .. } => {
                if let Some(ty) = ty {
                    return self.type_of_type_node(unit, *ty);
                }
                if let Some(init) = init {
                    return self.type_of_expr(unit, *init, &self.nested());
                }
                // `for (var k in o)` iterates over property names
                let loop_variable = |stmt: AstId| {
                    ast.parent(stmt)
                        .is_some_and(|p| matches!(ast.kind(p), AstKind::ForIn { variable, .. } if *variable == stmt))
                };
                if loop_variable(node) || ast.parent(node).is_some_and(loop_variable) {
                    TypeId::STRING
                } else {
                    TypeId::ANY
                }
            }
            AstKind::Param { .. } => {
                let Some(owner) = ast.parent(node) else {
                    return TypeId::ANY;
                };
                let index = signature_of(ast.kind(owner))
                    .and_then(|sig| sig.params.iter().position(|&p| p == node))
                    .unwrap_or(0);
                self.param_type(unit, ast, owner, index, node)
            }
            AstKind::PropertySignature { ty, .. } => match ty {
                Some(ty) => self.type_of_type_node(unit, *ty),
                None => TypeId::ANY,
            },
            _ => TypeId::ANY,
        }
    }

    fn param_type(&mut self, unit: UnitId, ast: &'a Ast, owner: AstId, index: usize, param: AstId) -> TypeId {
        let AstKind::Param { ty, init, .. } = ast.kind(param) else {
            return TypeId::ANY;
        };
        if let Some(ty) = ty {
            return self.type_of_type_node(unit, *ty);
        }
        if let Some(init) = init {
            return self.type_of_expr(unit, *init, &self.nested());
        }
        if matches!(ast.kind(owner), AstKind::Arrow { .. } | AstKind::FunctionExpr { .. })
            && let Some(expected) = self.contextual_type(unit, owner)
            && let Some(sig) = self.call_signatures(expected).into_iter().next()
            && let Some(ty) = sig.param_type(index)
        {
            return ty;
        }
        TypeId::ANY
    }

    fn signature_type(&mut self, unit: UnitId, ast: &'a Ast, node: AstId, container: Option<SymbolId>) -> FnSig {
        let Some(sig) = signature_of(ast.kind(node)) else {
            return FnSig {
                params: Vec::new(),
                ret: TypeId::UNRESOLVED,
            };
        };
        let params = self.params(unit, ast, node, sig);
        let ret = match (ast.kind(node), sig.return_type) {
            (_, Some(ret)) => self.type_of_type_node(unit, ret),
            (AstKind::Constructor { .. }, None) => match container {
                Some(class) => self.types.intern(Type::Instance(class)),
                None => TypeId::ANY,
            },
            (AstKind::Arrow { body, .. }, None) if !matches!(ast.kind(*body), AstKind::Block { .. }) => {
                self.type_of_expr(unit, *body, &self.nested())
            }
            (
                AstKind::Function { body: Some(body), .. }
                | AstKind::Method { body: Some(body), .. }
                | AstKind::GetAccessor { body: Some(body), .. }
                | AstKind::FunctionExpr { body, .. }
                | AstKind::Arrow { body, .. },
                None,
            ) => self.infer_return(unit, ast, *body),
            _ => TypeId::ANY,
        };
        FnSig { params, ret }
    }

    fn params(&mut self, unit: UnitId, ast: &'a Ast, owner: AstId, sig: &Signature) -> Vec<FnParam> {
        let mut out = Vec::with_capacity(sig.params.len());
        for (index, &param) in sig.params.iter().enumerate() {
            let AstKind::Param { name, .. } = ast.kind(param) else {
                continue;
            };
            let flags = ast.flags(param);
            out.push(FnParam {
                name: ast.text(*name).cloned().unwrap_or_default(),
                ty: self.param_type(unit, ast, owner, index, param),
                optional: flags.contains(AstFlags::OPTIONAL),
                rest: flags.contains(AstFlags::REST),
            });
        }
        out
    }

    /// Type of the first `return` with a value, not looking into nested
    /// functions; `void` when there is none.
    fn infer_return(&mut self, unit: UnitId, ast: &'a Ast, body: AstId) -> TypeId {
        let mut stack = vec![body];
        while let Some(id) = stack.pop() {
            let kind = ast.kind(id);
            if id != body && (is_function_like(kind) || matches!(kind, AstKind::Class { .. })) {
                continue;
            }
            if let AstKind::Return { expr: Some(expr) } = kind {
                return self.type_of_expr(unit, *expr, &self.nested());
            }
            stack.extend(ast.children(id).into_iter().rev());
        }
        TypeId::VOID
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Type denoted by a symbol used in a type position.
    pub fn type_from_type_symbol(&mut self, symbol: SymbolId) -> TypeId {
        let Some(symbol) = self.follow_alias(symbol) else {
            return TypeId::UNRESOLVED;
        };
        match self.symbols.get(symbol).kind {
            SymbolKind::Class | SymbolKind::Interface => self.types.intern(Type::Instance(symbol)),
            SymbolKind::Enum => self.types.intern(Type::Enum(symbol)),
            SymbolKind::TypeParameter => self.types.intern(Type::TypeParameter(symbol)),
            SymbolKind::TypeAlias | SymbolKind::Primitive => self.resolve_declared_symbol(symbol, &self.nested()),
            _ => TypeId::UNRESOLVED,
        }
    }

    /// Type written by a type node.
    pub fn type_of_type_node(&mut self, unit: UnitId, node: AstId) -> TypeId {
        let Some(ast) = self.ast(unit) else {
            return TypeId::UNRESOLVED;
        };
        match ast.kind(node) {
            AstKind::Predefined(p) => match p {
                PredefinedType::Any => TypeId::ANY,
                PredefinedType::Number => TypeId::NUMBER,
                PredefinedType::String => TypeId::STRING,
                PredefinedType::Boolean => TypeId::BOOLEAN,
                PredefinedType::Void => TypeId::VOID,
            },
            AstKind::TypeRef { name, .. } => match self.resolve_ast(unit, *name, &ResolutionContext::types()) {
                Some(symbol) => self.type_from_type_symbol(symbol),
                None => TypeId::UNRESOLVED,
            },
            AstKind::Identifier(_) | AstKind::QualifiedName { .. } => {
                match self.resolve_ast(unit, node, &ResolutionContext::types()) {
                    Some(symbol) => self.type_from_type_symbol(symbol),
                    None => TypeId::UNRESOLVED,
                }
            }
            AstKind::ArrayType { element } => {
                let element = self.type_of_type_node(unit, *element);
                self.types.array_of(element)
            }
            AstKind::ObjectType { members } => {
                let shape = self.object_shape(unit, ast, members);
                self.types.intern(Type::Object(shape))
            }
            AstKind::FunctionType { signature, result } => {
                let params = self.params(unit, ast, node, signature);
                let ret = self.type_of_type_node(unit, *result);
                self.types.function(FnSig { params, ret })
            }
            AstKind::ConstructorType { signature, result } => {
                let params = self.params(unit, ast, node, signature);
                let ret = self.type_of_type_node(unit, *result);
                self.types.intern(Type::Object(ObjectShape {
                    construct: vec![FnSig { params, ret }],
                    ..ObjectShape::default()
                }))
            }
            AstKind::TypeQuery { name } => match self.resolve_ast(unit, *name, &ResolutionContext::values()) {
                Some(symbol) => self.resolve_declared_symbol(symbol, &self.nested()),
                None => TypeId::UNRESOLVED,
            },
            _ => TypeId::UNRESOLVED,
        }
    }

    fn object_shape(&mut self, unit: UnitId, ast: &'a Ast, members: &[AstId]) -> ObjectShape {
        let mut shape = ObjectShape::default();
        for &member in members {
            match ast.kind(member) {
                AstKind::PropertySignature { name, ty } => {
                    let ty = match ty {
                        Some(ty) => self.type_of_type_node(unit, *ty),
                        None => TypeId::ANY,
                    };
                    shape.members.push((ast.text(*name).cloned().unwrap_or_default(), ty));
                }
                AstKind::MethodSignature { name, .. } => {
                    let sig = self.signature_type(unit, ast, member, None);
                    let ty = self.types.function(sig);
                    shape.members.push((ast.text(*name).cloned().unwrap_or_default(), ty));
                }
                AstKind::CallSignature { .. } => {
                    let sig = self.signature_type(unit, ast, member, None);
                    shape.call.push(sig);
                }
                AstKind::ConstructSignature { .. } => {
                    let sig = self.signature_type(unit, ast, member, None);
                    shape.construct.push(sig);
                }
                AstKind::IndexSignature { ty, .. } => {
                    shape.index = Some(match ty {
                        Some(ty) => self.type_of_type_node(unit, *ty),
                        None => TypeId::ANY,
                    });
                }
                _ => {}
            }
        }
        shape
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// Members of a type without their types: (name, kind, symbol, type if known)
    fn member_entries(&mut self, ty: TypeId) -> Vec<(SmolStr, SymbolKind, Option<SymbolId>, Option<TypeId>)> {
        let symbols = self.symbols;
        let mut out = Vec::new();
        match self.types.get(ty).clone() {
            Type::Instance(symbol) => {
                let mut seen_names = FxHashSet::default();
                let mut visited = FxHashSet::default();
                let mut pending = vec![symbol];
                while let Some(current) = pending.pop() {
                    if !visited.insert(current) || visited.len() > self.max_depth {
                        continue;
                    }
                    let target = symbols.get(current);
                    let is_class = target.kind == SymbolKind::Class;
                    for (name, &member) in &target.members {
                        let m = symbols.get(member);
                        let instance_side = matches!(
                            m.kind,
                            SymbolKind::Property | SymbolKind::Method | SymbolKind::Accessor
                        ) && !(is_class && m.flags.contains(SymbolFlags::STATIC));
                        if instance_side && seen_names.insert(name.clone()) {
                            out.push((name.clone(), m.kind, Some(member), None));
                        }
                    }
                    pending.extend(self.base_symbols(current));
                }
            }
            Type::Constructor(symbol) => {
                for (name, &member) in &symbols.get(symbol).members {
                    let m = symbols.get(member);
                    let static_side = m.flags.contains(SymbolFlags::STATIC)
                        || !matches!(
                            m.kind,
                            SymbolKind::Property | SymbolKind::Method | SymbolKind::Accessor | SymbolKind::Constructor
                        );
                    if static_side {
                        out.push((name.clone(), m.kind, Some(member), None));
                    }
                }
            }
            Type::Namespace(symbol) => {
                for (name, &member) in &symbols.get(symbol).members {
                    out.push((name.clone(), symbols.get(member).kind, Some(member), None));
                }
            }
            Type::Array(_) => out.push((SmolStr::new_static("length"), SymbolKind::Property, None, Some(TypeId::NUMBER))),
            Type::Object(shape) => {
                for (name, member_ty) in shape.members {
                    let kind = if matches!(self.types.get(member_ty), Type::Function(_)) {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Property
                    };
                    out.push((name, kind, None, Some(member_ty)));
                }
            }
            Type::TypeParameter(symbol) => {
                if let Some(constraint) = self.type_parameter_constraint(symbol) {
                    out = self.member_entries(constraint);
                }
            }
            Type::Unresolved | Type::Primitive(_) | Type::Enum(_) | Type::Function(_) => {}
        }
        out
    }

    fn type_parameter_constraint(&mut self, symbol: SymbolId) -> Option<TypeId> {
        let decl = self.symbols.get(symbol).first_decl()?;
        let (unit, ast, node) = self.decl_site(decl)?;
        let AstKind::TypeParam { constraint: Some(constraint), .. } = ast.kind(node) else {
            return None;
        };
        if !self.cache.in_progress.insert(symbol) {
            return None;
        }
        let ty = self.type_of_type_node(unit, *constraint);
        self.cache.in_progress.remove(&symbol);
        Some(ty)
    }

    /// Members reachable through a value of type `ty`, with their types.
    pub fn members_of(&mut self, ty: TypeId) -> Vec<MemberInfo> {
        let entries = self.member_entries(ty);
        entries
            .into_iter()
            .map(|(name, kind, symbol, known)| {
                let ty = match (known, symbol) {
                    (Some(ty), _) => ty,
                    (None, Some(symbol)) => self.resolve_declared_symbol(symbol, &self.nested()),
                    (None, None) => TypeId::UNRESOLVED,
                };
                MemberInfo { name, kind, symbol, ty }
            })
            .collect()
    }

    fn member_symbol(&mut self, ty: TypeId, name: &str) -> Option<SymbolId> {
        self.member_entries(ty)
            .into_iter()
            .find(|(n, ..)| n == name)
            .and_then(|(_, _, symbol, _)| symbol)
    }

    fn member_type(&mut self, ty: TypeId, name: &str) -> Option<TypeId> {
        let (_, _, symbol, known) = self.member_entries(ty).into_iter().find(|(n, ..)| n == name)?;
        match (known, symbol) {
            (Some(ty), _) => Some(ty),
            (None, Some(symbol)) => Some(self.resolve_declared_symbol(symbol, &self.nested())),
            (None, None) => None,
        }
    }

    /// Signatures a value of type `ty` can be called with.
    pub fn call_signatures(&mut self, ty: TypeId) -> Vec<FnSig> {
        match self.types.get(ty).clone() {
            Type::Instance(symbol) => self.signature_members(symbol, SymbolKind::CallSignature),
            _ => self.types.call_signatures(ty),
        }
    }

    /// Signatures `new` can be applied with, and the constructed type.
    fn construct_signatures(&mut self, ty: TypeId) -> Vec<FnSig> {
        match self.types.get(ty).clone() {
            Type::Constructor(class) => {
                let ctor = self.symbols.member(class, "constructor");
                match ctor.map(|c| self.resolve_declared_symbol(c, &self.nested())) {
                    Some(ctor_ty) => self.types.call_signatures(ctor_ty),
                    None => vec![FnSig {
                        params: Vec::new(),
                        ret: self.types.intern(Type::Instance(class)),
                    }],
                }
            }
            Type::Instance(symbol) => self.signature_members(symbol, SymbolKind::ConstructSignature),
            Type::Object(shape) => shape.construct,
            _ => Vec::new(),
        }
    }

    fn signature_members(&mut self, symbol: SymbolId, kind: SymbolKind) -> Vec<FnSig> {
        let signatures: Vec<SymbolId> = self
            .symbols
            .get(symbol)
            .signatures
            .iter()
            .copied()
            .filter(|&s| self.symbols.get(s).kind == kind)
            .collect();
        let mut out = Vec::new();
        for signature in signatures {
            let ty = self.resolve_declared_symbol(signature, &self.nested());
            out.extend(self.types.call_signatures(ty));
        }
        out
    }

    fn index_type(&mut self, ty: TypeId) -> Option<TypeId> {
        match self.types.get(ty).clone() {
            Type::Array(element) => Some(element),
            Type::Object(shape) => shape.index,
            Type::Instance(symbol) => {
                let index = self
                    .symbols
                    .get(symbol)
                    .signatures
                    .iter()
                    .copied()
                    .find(|&s| self.symbols.get(s).kind == SymbolKind::IndexSignature)?;
                Some(self.resolve_declared_symbol(index, &self.nested()))
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Type of an expression node.
    pub fn type_of_expr(&mut self, unit: UnitId, node: AstId, ctx: &ResolutionContext) -> TypeId {
        self.enter(ctx);
        let cacheable = ctx.contextual_type.is_none();
        if cacheable
            && let Some(&ty) = self.cache.units.get(&unit).and_then(|q| q.types.get(&node))
        {
            return ty;
        }
        let ty = self.compute_expr_type(unit, node, ctx);
        if cacheable {
            self.cache.units.entry(unit).or_default().types.insert(node, ty);
        }
        ty
    }

    /// Both branches agree, or one of them is unknown
    fn common_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b || b.is_unresolved() {
            a
        } else if a.is_unresolved() {
            b
        } else {
            TypeId::ANY
        }
    }

    fn compute_expr_type(&mut self, unit: UnitId, node: AstId, ctx: &ResolutionContext) -> TypeId {
        let Some(ast) = self.ast(unit) else {
            return TypeId::UNRESOLVED;
        };
        let nested = self.nested();
        match ast.kind(node) {
            AstKind::NumberLiteral(_) => TypeId::NUMBER,
            AstKind::StringLiteral(_) => TypeId::STRING,
            AstKind::RegexLiteral(_) => TypeId::ANY,
            AstKind::True | AstKind::False => TypeId::BOOLEAN,
            AstKind::Null => TypeId::NULL,
            AstKind::Identifier(name) => match self.resolve_ast(unit, node, &ResolutionContext::values()) {
                Some(symbol) => self.resolve_declared_symbol(symbol, &nested),
                None if name == "undefined" => TypeId::UNDEFINED,
                None => TypeId::UNRESOLVED,
            },
            AstKind::This => {
                let Some(class) = self.enclosing_class(unit, node) else {
                    return TypeId::ANY;
                };
                let in_static = ast
                    .ancestors(node)
                    .take_while(|&a| !matches!(ast.kind(a), AstKind::Class { .. }))
                    .any(|a| {
                        matches!(
                            ast.kind(a),
                            AstKind::Method { .. } | AstKind::Property { .. } | AstKind::GetAccessor { .. } | AstKind::SetAccessor { .. }
                        ) && ast.flags(a).contains(AstFlags::STATIC)
                    });
                if in_static {
                    self.types.intern(Type::Constructor(class))
                } else {
                    self.types.intern(Type::Instance(class))
                }
            }
            AstKind::Super => {
                let base = self
                    .enclosing_class(unit, node)
                    .and_then(|class| self.base_symbols(class).into_iter().next());
                match base {
                    Some(base) => self.types.intern(Type::Instance(base)),
                    None => TypeId::UNRESOLVED,
                }
            }
            AstKind::ArrayLiteral { elements } => {
                let expected = ctx.contextual_type.and_then(|t| match self.types.get(t) {
                    Type::Array(element) => Some(*element),
                    _ => None,
                });
                let first = elements
                    .iter()
                    .copied()
                    .find(|&e| !matches!(ast.kind(e), AstKind::Omitted));
                let element = match (first, expected) {
                    (_, Some(expected)) => expected,
                    (Some(first), None) => self.type_of_expr(unit, first, &nested),
                    (None, None) => TypeId::ANY,
                };
                self.types.array_of(element)
            }
            AstKind::ObjectLiteral { properties } => {
                let mut shape = ObjectShape::default();
                for &property in properties {
                    if let AstKind::PropertyAssignment { name, value } = ast.kind(property) {
                        let key = match ast.kind(*name) {
                            AstKind::NumberLiteral(n) => SmolStr::new(n.to_string()),
                            _ => ast.text(*name).cloned().unwrap_or_default(),
                        };
                        let ty = self.type_of_expr(unit, *value, &nested);
                        shape.members.push((key, ty));
                    }
                }
                self.types.intern(Type::Object(shape))
            }
            AstKind::FunctionExpr { .. } | AstKind::Arrow { .. } => match self.decl_node_symbol(unit, node) {
                Some(symbol) => self.resolve_declared_symbol(symbol, &nested),
                None => {
                    let sig = self.signature_type(unit, ast, node, None);
                    self.types.function(sig)
                }
            },
            AstKind::Call { callee, .. } => {
                if matches!(ast.kind(*callee), AstKind::Super) {
                    return TypeId::VOID;
                }
                let callee_ty = self.type_of_expr(unit, *callee, &nested);
                if callee_ty == TypeId::ANY {
                    return TypeId::ANY;
                }
                match self.call_signatures(callee_ty).into_iter().next() {
                    Some(sig) => sig.ret,
                    None => TypeId::UNRESOLVED,
                }
            }
            AstKind::New { callee, .. } => {
                let callee_ty = self.type_of_expr(unit, *callee, &nested);
                match self.construct_signatures(callee_ty).into_iter().next() {
                    Some(sig) => sig.ret,
                    None => TypeId::ANY,
                }
            }
            AstKind::Member { object, name } => {
                let object_ty = self.type_of_expr(unit, *object, &nested);
                if object_ty == TypeId::ANY {
                    return TypeId::ANY;
                }
                let Some(text) = ast.text(*name) else {
                    return TypeId::UNRESOLVED;
                };
                self.member_type(object_ty, text).unwrap_or(TypeId::UNRESOLVED)
            }
            AstKind::Index { object, index } => {
                let object_ty = self.type_of_expr(unit, *object, &nested);
                if let AstKind::StringLiteral(key) = ast.kind(*index)
                    && let Some(ty) = self.member_type(object_ty, key)
                {
                    return ty;
                }
                self.index_type(object_ty).unwrap_or(TypeId::ANY)
            }
            AstKind::Unary { op, operand } => {
                self.type_of_expr(unit, *operand, &nested);
                match op {
                    UnaryOp::Typeof => TypeId::STRING,
                    UnaryOp::Not | UnaryOp::Delete => TypeId::BOOLEAN,
                    UnaryOp::Void => TypeId::UNDEFINED,
                    _ => TypeId::NUMBER,
                }
            }
            AstKind::Postfix { .. } => TypeId::NUMBER,
            AstKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match op {
                    BinaryOp::Comma => self.type_of_expr(unit, rhs, &nested),
                    BinaryOp::Assign => {
                        let expected = self.type_of_expr(unit, lhs, &nested);
                        let ctx = nested.clone().with_contextual_type(Some(expected));
                        self.type_of_expr(unit, rhs, &ctx)
                    }
                    BinaryOp::Arith(ArithOp::Add) | BinaryOp::AssignOp(ArithOp::Add) => {
                        let l = self.type_of_expr(unit, lhs, &nested);
                        let r = self.type_of_expr(unit, rhs, &nested);
                        if l == TypeId::STRING || r == TypeId::STRING {
                            TypeId::STRING
                        } else if self.types.is_numeric(l) && self.types.is_numeric(r) {
                            TypeId::NUMBER
                        } else {
                            TypeId::ANY
                        }
                    }
                    BinaryOp::Arith(_) | BinaryOp::AssignOp(_) => TypeId::NUMBER,
                    BinaryOp::And => self.type_of_expr(unit, rhs, &nested),
                    BinaryOp::Or => {
                        let l = self.type_of_expr(unit, lhs, &nested);
                        let r = self.type_of_expr(unit, rhs, &nested);
                        self.common_type(l, r)
                    }
                    _ => TypeId::BOOLEAN,
                }
            }
            AstKind::Conditional { then_expr, else_expr, .. } => {
                let a = self.type_of_expr(unit, *then_expr, ctx);
                let b = self.type_of_expr(unit, *else_expr, ctx);
                self.common_type(a, b)
            }
            AstKind::TypeAssertion { ty, .. } => self.type_of_type_node(unit, *ty),
            _ => TypeId::UNRESOLVED,
        }
    }

    // ------------------------------------------------------------------
    // Contextual typing
    // ------------------------------------------------------------------

    /// Type the surrounding code expects `node` to have.
    pub fn contextual_type(&mut self, unit: UnitId, node: AstId) -> Option<TypeId> {
        let ast = self.ast(unit)?;
        let parent = ast.parent(node)?;
        let nested = self.nested();
        match ast.kind(parent) {
            AstKind::VarDecl {
                ty: Some(ty),
                init: Some(init),
                ..
            }
            | AstKind::Property {
                ty: Some(ty),
                init: Some(init),
                ..
            }
            | AstKind::Param {
                ty: Some(ty),
                init: Some(init),
                ..
            } if *init == node => Some(self.type_of_type_node(unit, *ty)),
            AstKind::Binary {
                op: BinaryOp::Assign,
                lhs,
                rhs,
            } if *rhs == node => Some(self.type_of_expr(unit, *lhs, &nested)),
            AstKind::Call { callee, args, .. } => {
                let index = args.iter().position(|&a| a == node)?;
                let callee_ty = self.type_of_expr(unit, *callee, &nested);
                self.call_signatures(callee_ty).into_iter().next()?.param_type(index)
            }
            AstKind::New { callee, args, .. } => {
                let index = args.iter().position(|&a| a == node)?;
                let callee_ty = self.type_of_expr(unit, *callee, &nested);
                self.construct_signatures(callee_ty).into_iter().next()?.param_type(index)
            }
            AstKind::PropertyAssignment { name, value } if *value == node => {
                let literal = ast.parent(parent)?;
                let expected = self.contextual_type(unit, literal)?;
                let key = ast.text(*name)?;
                self.member_type(expected, key)
            }
            AstKind::TypeAssertion { ty, expr } if *expr == node => Some(self.type_of_type_node(unit, *ty)),
            AstKind::Return { .. } => {
                let function = ast.ancestors(parent).find(|&a| is_function_like(ast.kind(a)))?;
                self.expected_return(unit, ast, function)
            }
            AstKind::ArrayLiteral { .. } => {
                let expected = self.contextual_type(unit, parent)?;
                match self.types.get(expected) {
                    Type::Array(element) => Some(*element),
                    _ => None,
                }
            }
            AstKind::Conditional { then_expr, else_expr, .. } if *then_expr == node || *else_expr == node => {
                self.contextual_type(unit, parent)
            }
            AstKind::Arrow { body, .. } if *body == node => self.expected_return(unit, ast, parent),
            _ => None,
        }
    }

    /// Declared return type of a function, or the return type its context
    /// expects for a lambda
    fn expected_return(&mut self, unit: UnitId, ast: &'a Ast, function: AstId) -> Option<TypeId> {
        if let Some(ret) = signature_of(ast.kind(function)).and_then(|s| s.return_type) {
            return Some(self.type_of_type_node(unit, ret));
        }
        if matches!(ast.kind(function), AstKind::Arrow { .. } | AstKind::FunctionExpr { .. }) {
            let expected = self.contextual_type(unit, function)?;
            return self.call_signatures(expected).into_iter().next().map(|s| s.ret);
        }
        None
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    /// Resolve the innermost node at `offset`.
    pub fn resolve_position(&mut self, unit: UnitId, offset: TextSize) -> Option<PositionInfo> {
        let ast = self.ast(unit)?;
        let path = ast.path_to_offset(offset);
        let node = *path.last()?;
        let space = space_at(ast, node);
        let ctx = ResolutionContext::in_space(space).aggressive();
        self.enter(&ctx);

        let enclosing_declaration = path
            .iter()
            .rev()
            .filter_map(|&n| self.decl_node_symbol(unit, n))
            .find(|&s| s != self.global);
        let symbol = self.resolve_ast(unit, node, &ctx);
        let contextual_type = self.contextual_type(unit, node);
        let kind = ast.kind(node);
        let ty = if kind.is_type() {
            self.type_of_type_node(unit, node)
        } else if space != Space::Value {
            match symbol {
                Some(symbol) => self.type_from_type_symbol(symbol),
                None => TypeId::UNRESOLVED,
            }
        } else if is_expression(kind) {
            let ctx = ResolutionContext::values()
                .aggressive()
                .with_contextual_type(contextual_type);
            self.type_of_expr(unit, node, &ctx)
        } else {
            match symbol {
                Some(symbol) => self.resolve_declared_symbol(symbol, &ctx),
                None => TypeId::UNRESOLVED,
            }
        };
        trace!(unit = unit.0, offset = u32::from(offset), node = kind.name(), "resolved position");
        Some(PositionInfo {
            symbol,
            ast: Some(node),
            enclosing_declaration,
            ty,
            contextual_type,
        })
    }
}
