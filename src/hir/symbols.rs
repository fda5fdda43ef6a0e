//! Symbols and the symbol arena.
//!
//! A symbol is what a name means: one or more declarations (possibly in
//! different units) merged under a container. Symbols are never freed;
//! removing the last declaration tombstones the symbol and takes it out of
//! its container's tables.

use bitflags::bitflags;
use indexmap::IndexMap;
use smol_str::SmolStr;

use super::decls::{DeclId, DeclKind};

/// Index of a compilation unit in the semantic chain. Unit 0 is the global
/// unit holding the primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

impl UnitId {
    pub const GLOBAL: UnitId = UnitId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A declaration in a specific unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub unit: UnitId,
    pub decl: DeclId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// The global scope shared by all non-module scripts
    Global,
    Primitive,
    Module,
    Class,
    Interface,
    Enum,
    EnumMember,
    Function,
    Method,
    Constructor,
    Property,
    Variable,
    Parameter,
    /// A getter, a setter or a pair of both
    Accessor,
    TypeAlias,
    TypeParameter,
    ImportAlias,
    FunctionExpression,
    CallSignature,
    ConstructSignature,
    IndexSignature,
}

impl SymbolKind {
    pub fn from_decl(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Script => SymbolKind::Module,
            DeclKind::Module => SymbolKind::Module,
            DeclKind::Class => SymbolKind::Class,
            DeclKind::Interface => SymbolKind::Interface,
            DeclKind::Enum => SymbolKind::Enum,
            DeclKind::EnumMember => SymbolKind::EnumMember,
            DeclKind::Function => SymbolKind::Function,
            DeclKind::Method => SymbolKind::Method,
            DeclKind::Constructor => SymbolKind::Constructor,
            DeclKind::Property => SymbolKind::Property,
            DeclKind::Variable | DeclKind::CatchVariable => SymbolKind::Variable,
            DeclKind::Parameter => SymbolKind::Parameter,
            DeclKind::GetAccessor | DeclKind::SetAccessor => SymbolKind::Accessor,
            DeclKind::TypeAlias => SymbolKind::TypeAlias,
            DeclKind::TypeParameter => SymbolKind::TypeParameter,
            DeclKind::ImportAlias => SymbolKind::ImportAlias,
            DeclKind::FunctionExpression => SymbolKind::FunctionExpression,
            DeclKind::CallSignature => SymbolKind::CallSignature,
            DeclKind::ConstructSignature => SymbolKind::ConstructSignature,
            DeclKind::IndexSignature => SymbolKind::IndexSignature,
        }
    }

    /// Names a type
    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Primitive
                | SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Enum
                | SymbolKind::TypeAlias
                | SymbolKind::TypeParameter
                | SymbolKind::ImportAlias
        )
    }

    /// Names a value
    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Module
                | SymbolKind::Class
                | SymbolKind::Enum
                | SymbolKind::EnumMember
                | SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::Property
                | SymbolKind::Variable
                | SymbolKind::Parameter
                | SymbolKind::Accessor
                | SymbolKind::ImportAlias
                | SymbolKind::FunctionExpression
        )
    }

    /// Owns a body whose locals are not reachable by a dotted path
    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::Constructor
                | SymbolKind::Accessor
                | SymbolKind::FunctionExpression
        )
    }

    /// May appear on the left of a dot in a type name
    pub fn is_namespace(self) -> bool {
        matches!(
            self,
            SymbolKind::Module | SymbolKind::Enum | SymbolKind::Class | SymbolKind::ImportAlias
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Global => "global",
            SymbolKind::Primitive => "primitive",
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum member",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "var",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Accessor => "accessor",
            SymbolKind::TypeAlias => "type",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::ImportAlias => "alias",
            SymbolKind::FunctionExpression => "function",
            SymbolKind::CallSignature => "call signature",
            SymbolKind::ConstructSignature => "construct signature",
            SymbolKind::IndexSignature => "index signature",
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u16 {
        const EXPORTED = 1 << 0;
        const AMBIENT = 1 << 1;
        const STATIC = 1 << 2;
        const PRIVATE = 1 << 3;
        const OPTIONAL = 1 << 4;
        /// A class, function or enum that a module declaration merged into
        const HAS_NAMESPACE = 1 << 5;
        /// External module (a file with top-level exports, or a quoted module)
        const EXTERNAL = 1 << 6;
        /// Created for a colliding declaration; not reachable by name
        const DUPLICATE = 1 << 7;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    pub decls: Vec<DeclRef>,
    pub container: Option<SymbolId>,
    /// Exported or instance-visible members
    pub members: IndexMap<SmolStr, SymbolId>,
    /// Names visible only inside the symbol's own body
    pub locals: IndexMap<SmolStr, SymbolId>,
    /// Call, construct and index signatures, in declaration order
    pub signatures: Vec<SymbolId>,
    pub tombstoned: bool,
}

impl Symbol {
    pub fn new(name: SmolStr, kind: SymbolKind, container: Option<SymbolId>) -> Self {
        Self {
            name,
            kind,
            flags: SymbolFlags::empty(),
            decls: Vec::new(),
            container,
            members: IndexMap::new(),
            locals: IndexMap::new(),
            signatures: Vec::new(),
            tombstoned: false,
        }
    }

    pub fn first_decl(&self) -> Option<DeclRef> {
        self.decls.first().copied()
    }
}

/// Where a symbol is registered in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolTableKind {
    Members,
    Locals,
    Signatures,
}

/// Arena of all symbols in a semantic chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Live (not tombstoned) symbols
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.tombstoned)
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn member(&self, container: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(container).members.get(name).copied()
    }

    pub fn local(&self, container: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(container).locals.get(name).copied()
    }

    pub fn lookup_in(&self, container: SymbolId, table: SymbolTableKind, name: &str) -> Option<SymbolId> {
        match table {
            SymbolTableKind::Members => self.member(container, name),
            SymbolTableKind::Locals => self.local(container, name),
            SymbolTableKind::Signatures => None,
        }
    }

    pub fn insert_in(&mut self, container: SymbolId, table: SymbolTableKind, name: SmolStr, symbol: SymbolId) {
        let target = self.get_mut(container);
        match table {
            SymbolTableKind::Members => {
                target.members.insert(name, symbol);
            }
            SymbolTableKind::Locals => {
                target.locals.insert(name, symbol);
            }
            SymbolTableKind::Signatures => target.signatures.push(symbol),
        }
    }

    /// Drop every declaration of `unit` from `symbol`; returns true when the
    /// symbol has no declarations left.
    pub fn remove_decls_of_unit(&mut self, symbol: SymbolId, unit: UnitId) -> bool {
        let target = self.get_mut(symbol);
        target.decls.retain(|d| d.unit != unit);
        target.decls.is_empty() && !matches!(target.kind, SymbolKind::Primitive | SymbolKind::Global)
    }

    /// Mark a symbol dead and unlink it from its container.
    pub fn tombstone(&mut self, symbol: SymbolId) {
        let (container, name) = {
            let target = self.get_mut(symbol);
            target.tombstoned = true;
            (target.container, target.name.clone())
        };
        let Some(container) = container else {
            return;
        };
        let parent = self.get_mut(container);
        if parent.members.get(&name) == Some(&symbol) {
            parent.members.shift_remove(&name);
        }
        if parent.locals.get(&name) == Some(&symbol) {
            parent.locals.shift_remove(&name);
        }
        parent.signatures.retain(|&s| s != symbol);
    }

    /// Dotted path from the outermost named container. Locals of a
    /// function body stop at the function and keep their bare name.
    pub fn qualified_name(&self, symbol: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(symbol);
        while let Some(id) = current {
            let sym = self.get(id);
            if matches!(sym.kind, SymbolKind::Global) || sym.name.is_empty() {
                break;
            }
            parts.push(sym.name.as_str());
            current = sym
                .container
                .filter(|&container| !self.get(container).kind.is_function_like());
        }
        parts.reverse();
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_unlinks_from_container() {
        let mut table = SymbolTable::new();
        let global = table.alloc(Symbol::new("".into(), SymbolKind::Global, None));
        let m = table.alloc(Symbol::new("M".into(), SymbolKind::Module, Some(global)));
        table.insert_in(global, SymbolTableKind::Members, "M".into(), m);
        let x = table.alloc(Symbol::new("x".into(), SymbolKind::Variable, Some(m)));
        table.insert_in(m, SymbolTableKind::Locals, "x".into(), x);

        assert_eq!(table.qualified_name(x), "M.x");
        table.tombstone(x);
        assert!(table.local(m, "x").is_none());
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_function_locals_keep_bare_name() {
        let mut table = SymbolTable::new();
        let global = table.alloc(Symbol::new("".into(), SymbolKind::Global, None));
        let m = table.alloc(Symbol::new("M".into(), SymbolKind::Module, Some(global)));
        table.insert_in(global, SymbolTableKind::Members, "M".into(), m);
        let f = table.alloc(Symbol::new("f".into(), SymbolKind::Function, Some(m)));
        table.insert_in(m, SymbolTableKind::Locals, "f".into(), f);
        let p = table.alloc(Symbol::new("p".into(), SymbolKind::Parameter, Some(f)));
        table.insert_in(f, SymbolTableKind::Locals, "p".into(), p);

        assert_eq!(table.qualified_name(f), "M.f");
        assert_eq!(table.qualified_name(p), "p");
    }

    #[test]
    fn test_kind_spaces() {
        assert!(SymbolKind::Class.is_type() && SymbolKind::Class.is_value());
        assert!(SymbolKind::Interface.is_type() && !SymbolKind::Interface.is_value());
        assert!(!SymbolKind::Variable.is_type());
        assert!(SymbolKind::Module.is_namespace());
    }
}
