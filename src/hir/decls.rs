//! Declaration collection.
//!
//! One pre-order walk over the lowered AST producing a forest of
//! declarations. The forest is pure data: linking declarations to symbols
//! happens in the binder, which keeps its links in a side table.

use bitflags::bitflags;
use rowan::TextRange;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::syntax::{Ast, AstFlags, AstId, AstKind, ImportTarget, Signature};

/// Index of a declaration in its [`DeclForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Script,
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
    GetAccessor,
    SetAccessor,
    TypeAlias,
    TypeParameter,
    ImportAlias,
    CatchVariable,
    FunctionExpression,
    CallSignature,
    ConstructSignature,
    IndexSignature,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Script => "script",
            DeclKind::Module => "module",
            DeclKind::Class => "class",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enum",
            DeclKind::EnumMember => "enum member",
            DeclKind::Function => "function",
            DeclKind::Method => "method",
            DeclKind::Constructor => "constructor",
            DeclKind::Property => "property",
            DeclKind::Variable => "var",
            DeclKind::Parameter => "parameter",
            DeclKind::GetAccessor => "getter",
            DeclKind::SetAccessor => "setter",
            DeclKind::TypeAlias => "type",
            DeclKind::TypeParameter => "type parameter",
            DeclKind::ImportAlias => "import",
            DeclKind::CatchVariable => "catch variable",
            DeclKind::FunctionExpression => "function expression",
            DeclKind::CallSignature => "call signature",
            DeclKind::ConstructSignature => "construct signature",
            DeclKind::IndexSignature => "index signature",
        }
    }

    /// Declarations that open a scope for hoisted `var`s
    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            DeclKind::Function
                | DeclKind::Method
                | DeclKind::Constructor
                | DeclKind::GetAccessor
                | DeclKind::SetAccessor
                | DeclKind::FunctionExpression
        )
    }

    /// Signatures have no name and are looked up by position, not by name
    pub fn is_signature(self) -> bool {
        matches!(
            self,
            DeclKind::CallSignature | DeclKind::ConstructSignature | DeclKind::IndexSignature
        )
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeclFlags: u16 {
        const EXPORTED = 1 << 0;
        const AMBIENT = 1 << 1;
        const STATIC = 1 << 2;
        const PRIVATE = 1 << 3;
        const PUBLIC = 1 << 4;
        const OPTIONAL = 1 << 5;
        const REST = 1 << 6;
        const HAS_BODY = 1 << 7;
        /// Module named by a string literal
        const EXTERNAL_NAME = 1 << 8;
        /// Constructor parameter that also declares a property
        const PARAMETER_PROPERTY = 1 << 9;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: SmolStr,
    pub kind: DeclKind,
    pub flags: DeclFlags,
    pub span: TextRange,
    pub name_span: TextRange,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
    /// The AST node that declares this
    pub ast: AstId,
    /// `parent key / kind / name #ordinal`, stable across re-parses
    pub key: SmolStr,
}

/// All declarations of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclForest {
    decls: Vec<Declaration>,
    root: Option<DeclId>,
    by_ast: FxHashMap<AstId, DeclId>,
    by_key: FxHashMap<SmolStr, DeclId>,
    /// The file has top-level imports or exports
    external_module: bool,
}

impl DeclForest {
    /// Forest of a unit whose AST could not be built
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<DeclId> {
        self.root
    }

    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    /// Declaration introduced by an AST node
    pub fn decl_for_ast(&self, ast: AstId) -> Option<DeclId> {
        self.by_ast.get(&ast).copied()
    }

    pub fn decl_by_key(&self, key: &str) -> Option<DeclId> {
        self.by_key.get(key).copied()
    }

    pub fn is_external_module(&self) -> bool {
        self.external_module
    }

    /// Declarations in pre-order, the root first
    pub fn preorder(&self) -> Vec<DeclId> {
        let mut out = Vec::with_capacity(self.decls.len());
        let mut stack: Vec<DeclId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.get(id).children.iter().rev());
        }
        out
    }

    /// Top-level declarations (direct children of the script)
    pub fn top_level(&self) -> &[DeclId] {
        match self.root {
            Some(root) => &self.get(root).children,
            None => &[],
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Collect every declaration in `ast`.
pub fn collect_decls(ast: &Ast) -> DeclForest {
    let mut collector = Collector {
        ast,
        forest: DeclForest::default(),
        ordinals: FxHashMap::default(),
    };
    let root = collector.add(None, DeclKind::Script, SmolStr::default(), ast.root(), None, DeclFlags::empty());
    collector.forest.root = Some(root);
    if let AstKind::Script { statements } = ast.kind(ast.root()) {
        collector.forest.external_module = statements.iter().any(|&s| {
            ast.flags(s).contains(AstFlags::EXPORT)
                || matches!(
                    ast.kind(s),
                    AstKind::ExportAssignment { .. }
                        | AstKind::ImportAlias {
                            target: ImportTarget::External(_),
                            ..
                        }
                )
        });
        for &stmt in statements {
            collector.walk(stmt, root, root);
        }
    }
    collector.forest
}

struct Collector<'a> {
    ast: &'a Ast,
    forest: DeclForest,
    ordinals: FxHashMap<(Option<DeclId>, DeclKind, SmolStr), u32>,
}

fn ast_decl_flags(flags: AstFlags) -> DeclFlags {
    let mut out = DeclFlags::empty();
    for (from, to) in [
        (AstFlags::EXPORT, DeclFlags::EXPORTED),
        (AstFlags::DECLARE, DeclFlags::AMBIENT),
        (AstFlags::STATIC, DeclFlags::STATIC),
        (AstFlags::PRIVATE, DeclFlags::PRIVATE),
        (AstFlags::PUBLIC, DeclFlags::PUBLIC),
        (AstFlags::OPTIONAL, DeclFlags::OPTIONAL),
        (AstFlags::REST, DeclFlags::REST),
        (AstFlags::EXTERNAL_NAME, DeclFlags::EXTERNAL_NAME),
    ] {
        if flags.contains(from) {
            out |= to;
        }
    }
    out
}

impl Collector<'_> {
    fn add(
        &mut self,
        parent: Option<DeclId>,
        kind: DeclKind,
        name: SmolStr,
        ast: AstId,
        name_node: Option<AstId>,
        flags: DeclFlags,
    ) -> DeclId {
        let id = DeclId(self.forest.decls.len() as u32);
        let ordinal = self
            .ordinals
            .entry((parent, kind, name.clone()))
            .and_modify(|n| *n += 1)
            .or_insert(0);
        let key = match parent {
            Some(parent) => SmolStr::new(format!(
                "{}/{}/{}#{}",
                self.forest.get(parent).key,
                kind.as_str(),
                name,
                ordinal
            )),
            None => SmolStr::default(),
        };
        let span = self.ast.range(ast);
        let decl = Declaration {
            name,
            kind,
            flags,
            span,
            name_span: name_node.map(|n| self.ast.range(n)).unwrap_or(span),
            parent,
            children: Vec::new(),
            ast,
            key: key.clone(),
        };
        self.forest.decls.push(decl);
        if let Some(parent) = parent {
            self.forest.decls[parent.index()].children.push(id);
        }
        self.forest.by_ast.entry(ast).or_insert(id);
        self.forest.by_key.insert(key, id);
        id
    }

    fn name_of(&self, id: AstId) -> SmolStr {
        self.ast.text(id).cloned().unwrap_or_default()
    }

    fn named(&mut self, parent: DeclId, kind: DeclKind, node: AstId, name: AstId) -> DeclId {
        let mut flags = ast_decl_flags(self.ast.flags(node));
        if self.forest.get(parent).flags.contains(DeclFlags::AMBIENT) {
            flags |= DeclFlags::AMBIENT;
        }
        let text = self.name_of(name);
        self.add(Some(parent), kind, text, node, Some(name), flags)
    }

    fn signature(&mut self, sig: &Signature, owner: DeclId, ctor_class: Option<DeclId>) {
        let ast = self.ast;
        for &tp in &sig.type_params {
            self.walk(tp, owner, owner);
        }
        for &param in &sig.params {
            let AstKind::Param { name, ty, init } = ast.kind(param) else {
                continue;
            };
            let decl = self.named(owner, DeclKind::Parameter, param, *name);
            // `constructor(public x)` also declares a property on the class
            if let Some(class) = ctor_class
                && ast.flags(param).intersects(AstFlags::PUBLIC | AstFlags::PRIVATE)
            {
                let prop = self.named(class, DeclKind::Property, param, *name);
                self.forest.decls[prop.index()].flags |= DeclFlags::PARAMETER_PROPERTY;
                self.forest.decls[decl.index()].flags |= DeclFlags::PARAMETER_PROPERTY;
            }
            if let Some(ty) = ty {
                self.walk(*ty, owner, owner);
            }
            if let Some(init) = init {
                self.walk(*init, owner, owner);
            }
        }
        if let Some(ret) = sig.return_type {
            self.walk(ret, owner, owner);
        }
    }

    fn body(&mut self, body: Option<AstId>, owner: DeclId) {
        if let Some(body) = body {
            self.forest.decls[owner.index()].flags |= DeclFlags::HAS_BODY;
            self.walk(body, owner, owner);
        }
    }

    /// Walk `id` with `parent` as the structural container and `scope` as
    /// the declaration `var`s hoist to.
    fn walk(&mut self, id: AstId, parent: DeclId, scope: DeclId) {
        let ast = self.ast;
        match ast.kind(id) {
            AstKind::Module { name, body } => {
                let decl = self.named(parent, DeclKind::Module, id, *name);
                for &stmt in body {
                    self.walk(stmt, decl, decl);
                }
            }
            AstKind::Class {
                name,
                type_params,
                extends,
                implements,
                members,
            } => {
                let decl = self.named(parent, DeclKind::Class, id, *name);
                for &tp in type_params {
                    self.walk(tp, decl, decl);
                }
                for &heritage in extends.iter().chain(implements) {
                    self.walk(heritage, decl, scope);
                }
                for &member in members {
                    self.walk(member, decl, decl);
                }
            }
            AstKind::Interface {
                name,
                type_params,
                extends,
                members,
            } => {
                let decl = self.named(parent, DeclKind::Interface, id, *name);
                for &tp in type_params {
                    self.walk(tp, decl, decl);
                }
                for &heritage in extends {
                    self.walk(heritage, decl, scope);
                }
                for &member in members {
                    self.walk(member, decl, decl);
                }
            }
            AstKind::Enum { name, members, .. } => {
                let decl = self.named(parent, DeclKind::Enum, id, *name);
                for &member in members {
                    self.walk(member, decl, decl);
                }
            }
            AstKind::EnumMember { name, value, .. } => {
                self.named(parent, DeclKind::EnumMember, id, *name);
                self.walk(*value, parent, scope);
            }
            AstKind::Function {
                name,
                signature,
                body,
            } => {
                let decl = self.named(parent, DeclKind::Function, id, *name);
                self.signature(signature, decl, None);
                self.body(*body, decl);
            }
            AstKind::Method {
                name,
                signature,
                body,
            } => {
                let decl = self.named(parent, DeclKind::Method, id, *name);
                self.signature(signature, decl, None);
                self.body(*body, decl);
            }
            AstKind::GetAccessor {
                name,
                signature,
                body,
            } => {
                let decl = self.named(parent, DeclKind::GetAccessor, id, *name);
                self.signature(signature, decl, None);
                self.body(*body, decl);
            }
            AstKind::SetAccessor {
                name,
                signature,
                body,
            } => {
                let decl = self.named(parent, DeclKind::SetAccessor, id, *name);
                self.signature(signature, decl, None);
                self.body(*body, decl);
            }
            AstKind::Constructor { signature, body } => {
                let flags = ast_decl_flags(self.ast.flags(id));
                let decl = self.add(
                    Some(parent),
                    DeclKind::Constructor,
                    SmolStr::new_static("constructor"),
                    id,
                    None,
                    flags,
                );
                self.signature(signature, decl, Some(parent));
                self.body(*body, decl);
            }
            AstKind::Property { name, ty, init } => {
                self.named(parent, DeclKind::Property, id, *name);
                for child in ty.iter().chain(init) {
                    self.walk(*child, parent, scope);
                }
            }
            AstKind::PropertySignature { name, ty } => {
                self.named(parent, DeclKind::Property, id, *name);
                if let Some(ty) = ty {
                    self.walk(*ty, parent, scope);
                }
            }
            AstKind::MethodSignature { name, signature } => {
                let decl = self.named(parent, DeclKind::Method, id, *name);
                self.signature(signature, decl, None);
            }
            AstKind::CallSignature { signature } => {
                let decl = self.add(Some(parent), DeclKind::CallSignature, SmolStr::default(), id, None, DeclFlags::empty());
                self.signature(signature, decl, None);
            }
            AstKind::ConstructSignature { signature } => {
                let decl = self.add(
                    Some(parent),
                    DeclKind::ConstructSignature,
                    SmolStr::default(),
                    id,
                    None,
                    DeclFlags::empty(),
                );
                self.signature(signature, decl, None);
            }
            AstKind::IndexSignature { param, ty } => {
                let flags = ast_decl_flags(self.ast.flags(id));
                let decl = self.add(Some(parent), DeclKind::IndexSignature, SmolStr::default(), id, None, flags);
                if let Some(param) = param {
                    if let AstKind::Param { name, .. } = ast.kind(*param) {
                        self.named(decl, DeclKind::Parameter, *param, *name);
                    }
                }
                if let Some(ty) = ty {
                    self.walk(*ty, decl, decl);
                }
            }
            AstKind::TypeAlias { name, ty } => {
                self.named(parent, DeclKind::TypeAlias, id, *name);
                self.walk(*ty, parent, scope);
            }
            AstKind::ImportAlias { name, .. } => {
                self.named(parent, DeclKind::ImportAlias, id, *name);
            }
            AstKind::TypeParam { name, constraint } => {
                self.named(parent, DeclKind::TypeParameter, id, *name);
                if let Some(constraint) = constraint {
                    self.walk(*constraint, parent, scope);
                }
            }
            AstKind::VarStatement { declarations } => {
                let exported = ast.flags(id) & (AstFlags::EXPORT | AstFlags::DECLARE);
                for &decl in declarations {
                    self.var_decl(decl, scope, ast_decl_flags(exported));
                }
            }
            AstKind::VarDecl { .. } => self.var_decl(id, scope, DeclFlags::empty()),
            AstKind::Catch { name, block } => {
                self.named(scope, DeclKind::CatchVariable, id, *name);
                self.walk(*block, parent, scope);
            }
            AstKind::FunctionExpr {
                name,
                signature,
                body,
            } => {
                let text = name.map(|n| self.name_of(n)).unwrap_or_default();
                let decl = self.add(Some(scope), DeclKind::FunctionExpression, text, id, *name, DeclFlags::empty());
                self.signature(signature, decl, None);
                self.body(Some(*body), decl);
            }
            AstKind::Arrow { signature, body } => {
                let decl = self.add(
                    Some(scope),
                    DeclKind::FunctionExpression,
                    SmolStr::default(),
                    id,
                    None,
                    DeclFlags::empty(),
                );
                self.signature(signature, decl, None);
                self.body(Some(*body), decl);
            }
            // Anonymous object types declare nothing; their members are read
            // straight off the AST when the type is built.
            AstKind::ObjectType { .. } => {}
            _ => {
                for child in self.ast.children(id) {
                    self.walk(child, parent, scope);
                }
            }
        }
    }

    fn var_decl(&mut self, id: AstId, scope: DeclId, extra: DeclFlags) {
        let ast = self.ast;
        let AstKind::VarDecl { name, ty, init } = ast.kind(id) else {
            return;
        };
        let decl = self.named(scope, DeclKind::Variable, id, *name);
        self.forest.decls[decl.index()].flags |= extra;
        for child in ty.iter().chain(init) {
            self.walk(*child, scope, scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use crate::syntax::lower;

    fn forest(text: &str) -> DeclForest {
        let ast = lower(&parse(text, "t.ts", &ParseOptions::default())).unwrap();
        collect_decls(&ast)
    }

    fn names(forest: &DeclForest, id: DeclId) -> Vec<(DeclKind, String)> {
        forest
            .get(id)
            .children
            .iter()
            .map(|&c| (forest.get(c).kind, forest.get(c).name.to_string()))
            .collect()
    }

    #[test]
    fn test_var_hoists_to_function() {
        let forest = forest("function f(a) { if (a) { var x = 1; } }");
        let f = forest.top_level()[0];
        assert_eq!(
            names(&forest, f),
            vec![
                (DeclKind::Parameter, "a".to_string()),
                (DeclKind::Variable, "x".to_string())
            ]
        );
        assert!(forest.get(f).flags.contains(DeclFlags::HAS_BODY));
    }

    #[test]
    fn test_keys_are_stable_and_ordinal() {
        let forest = forest("module M {} module M {} class C { x; y; }");
        let keys: Vec<_> = forest.top_level().iter().map(|&d| forest.get(d).key.to_string()).collect();
        assert_eq!(keys, vec!["/module/M#0", "/module/M#1", "/class/C#0"]);
        let c = forest.top_level()[2];
        assert_eq!(forest.get(forest.get(c).children[1]).key, "/class/C#0/property/y#0");
    }

    #[test]
    fn test_parameter_properties() {
        let forest = forest("class P { constructor(public x: number, y) {} }");
        let class = forest.top_level()[0];
        let kinds: Vec<_> = names(&forest, class).into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![DeclKind::Constructor, DeclKind::Property]);
    }

    #[test]
    fn test_external_module_detection() {
        assert!(forest("export var x;").is_external_module());
        assert!(forest("import m = require('m');").is_external_module());
        assert!(!forest("var x; module M { export var y; }").is_external_module());
    }

    #[test]
    fn test_interface_signatures() {
        let forest = forest("interface I { (): void; new (): I; [k: string]: any; m?(): void }");
        let iface = forest.top_level()[0];
        let kinds: Vec<_> = names(&forest, iface).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                DeclKind::CallSignature,
                DeclKind::ConstructSignature,
                DeclKind::IndexSignature,
                DeclKind::Method
            ]
        );
    }
}
