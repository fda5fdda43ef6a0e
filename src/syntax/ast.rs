//! The lowered AST.
//!
//! One node per meaningful construct, stored in an arena and addressed by
//! [`AstId`]. Unlike the syntax tree, every node carries its absolute source
//! range (trimmed of trivia). Parent links live in a side table. Facts the
//! semantic passes derive (symbols, types) are never stored on nodes; they
//! are kept in tables keyed by `AstId`.

use std::sync::Arc;

use bitflags::bitflags;
use rowan::{TextRange, TextSize};
use smol_str::SmolStr;

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AstId(pub u32);

impl AstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Modifiers and derived markers on an AST node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AstFlags: u16 {
        const PARENTHESIZED = 1 << 0;
        const EXPORT = 1 << 1;
        const DECLARE = 1 << 2;
        const STATIC = 1 << 3;
        const PUBLIC = 1 << 4;
        const PRIVATE = 1 << 5;
        const OPTIONAL = 1 << 6;
        const REST = 1 << 7;
        const CONSTANT_FOLDABLE = 1 << 8;
        /// Produced by desugaring, with no source text of its own
        const SYNTHESIZED = 1 << 9;
        /// A module declared with a quoted name
        const EXTERNAL_NAME = 1 << 10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedType {
    Any,
    Number,
    String,
    Boolean,
    Void,
}

impl PredefinedType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Void => "void",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Delete,
    Void,
    Typeof,
    PreIncrement,
    PreDecrement,
    Plus,
    Minus,
    BitNot,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Comma,
    Assign,
    /// Compound assignment with the arithmetic operator it applies
    AssignOp(ArithOp),
    Or,
    And,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Instanceof,
    In,
    Arith(ArithOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
}

/// Call signature parts shared by functions, methods, lambdas and signature
/// members.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub type_params: Vec<AstId>,
    pub params: Vec<AstId>,
    pub return_type: Option<AstId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportTarget {
    /// `require("path")`
    External(SmolStr),
    /// A dotted entity name
    Entity(AstId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    // Declarations
    Script {
        statements: Vec<AstId>,
    },
    Module {
        name: AstId,
        body: Vec<AstId>,
    },
    Class {
        name: AstId,
        type_params: Vec<AstId>,
        extends: Option<AstId>,
        implements: Vec<AstId>,
        members: Vec<AstId>,
    },
    Interface {
        name: AstId,
        type_params: Vec<AstId>,
        extends: Vec<AstId>,
        members: Vec<AstId>,
    },
    /// `initializer` is the synthesized backing map, `E || (E = {})`, that
    /// every member assignment populates.
    Enum {
        name: AstId,
        initializer: AstId,
        members: Vec<AstId>,
    },
    /// `value` is always present after desugaring; `constant` is the folded
    /// value when the member is constant-foldable.
    EnumMember {
        name: AstId,
        value: AstId,
        constant: Option<f64>,
    },
    Function {
        name: AstId,
        signature: Signature,
        body: Option<AstId>,
    },
    TypeAlias {
        name: AstId,
        ty: AstId,
    },
    ImportAlias {
        name: AstId,
        target: ImportTarget,
    },
    ExportAssignment {
        name: AstId,
    },
    VarStatement {
        declarations: Vec<AstId>,
    },
    VarDecl {
        name: AstId,
        ty: Option<AstId>,
        init: Option<AstId>,
    },
    Param {
        name: AstId,
        ty: Option<AstId>,
        init: Option<AstId>,
    },
    TypeParam {
        name: AstId,
        constraint: Option<AstId>,
    },

    // Class elements and type members
    Property {
        name: AstId,
        ty: Option<AstId>,
        init: Option<AstId>,
    },
    Method {
        name: AstId,
        signature: Signature,
        body: Option<AstId>,
    },
    Constructor {
        signature: Signature,
        body: Option<AstId>,
    },
    GetAccessor {
        name: AstId,
        signature: Signature,
        body: Option<AstId>,
    },
    SetAccessor {
        name: AstId,
        signature: Signature,
        body: Option<AstId>,
    },
    IndexSignature {
        param: Option<AstId>,
        ty: Option<AstId>,
    },
    PropertySignature {
        name: AstId,
        ty: Option<AstId>,
    },
    MethodSignature {
        name: AstId,
        signature: Signature,
    },
    CallSignature {
        signature: Signature,
    },
    ConstructSignature {
        signature: Signature,
    },

    // Statements
    Block {
        statements: Vec<AstId>,
    },
    ExprStatement {
        expr: AstId,
    },
    If {
        condition: AstId,
        then_branch: AstId,
        else_branch: Option<AstId>,
    },
    DoWhile {
        body: AstId,
        condition: AstId,
    },
    While {
        condition: AstId,
        body: AstId,
    },
    For {
        init: Option<AstId>,
        condition: Option<AstId>,
        update: Option<AstId>,
        body: AstId,
    },
    ForIn {
        variable: AstId,
        object: AstId,
        body: AstId,
    },
    Continue {
        label: Option<AstId>,
    },
    Break {
        label: Option<AstId>,
    },
    Return {
        expr: Option<AstId>,
    },
    Switch {
        discriminant: AstId,
        clauses: Vec<AstId>,
    },
    CaseClause {
        test: Option<AstId>,
        body: Vec<AstId>,
    },
    Throw {
        expr: AstId,
    },
    Try {
        block: AstId,
        catch: Option<AstId>,
        finally: Option<AstId>,
    },
    Catch {
        name: AstId,
        block: AstId,
    },
    Labeled {
        label: AstId,
        body: AstId,
    },
    Empty,
    Debugger,

    // Expressions
    Identifier(SmolStr),
    NumberLiteral(f64),
    StringLiteral(SmolStr),
    RegexLiteral(SmolStr),
    True,
    False,
    Null,
    This,
    Super,
    ArrayLiteral {
        elements: Vec<AstId>,
    },
    Omitted,
    ObjectLiteral {
        properties: Vec<AstId>,
    },
    PropertyAssignment {
        name: AstId,
        value: AstId,
    },
    FunctionExpr {
        name: Option<AstId>,
        signature: Signature,
        body: AstId,
    },
    Arrow {
        signature: Signature,
        body: AstId,
    },
    Call {
        callee: AstId,
        type_args: Vec<AstId>,
        args: Vec<AstId>,
    },
    New {
        callee: AstId,
        type_args: Vec<AstId>,
        args: Vec<AstId>,
    },
    Member {
        object: AstId,
        name: AstId,
    },
    Index {
        object: AstId,
        index: AstId,
    },
    Unary {
        op: UnaryOp,
        operand: AstId,
    },
    Postfix {
        op: PostfixOp,
        operand: AstId,
    },
    Binary {
        op: BinaryOp,
        lhs: AstId,
        rhs: AstId,
    },
    Conditional {
        condition: AstId,
        then_expr: AstId,
        else_expr: AstId,
    },
    TypeAssertion {
        ty: AstId,
        expr: AstId,
    },
    /// An expression the parser could not recover
    Missing,

    // Types
    Predefined(PredefinedType),
    TypeRef {
        name: AstId,
        type_args: Vec<AstId>,
    },
    QualifiedName {
        left: AstId,
        right: AstId,
    },
    ArrayType {
        element: AstId,
    },
    ObjectType {
        members: Vec<AstId>,
    },
    FunctionType {
        signature: Signature,
        result: AstId,
    },
    ConstructorType {
        signature: Signature,
        result: AstId,
    },
    TypeQuery {
        name: AstId,
    },
}

fn push_signature(out: &mut Vec<AstId>, sig: &Signature) {
    out.extend(&sig.type_params);
    out.extend(&sig.params);
    out.extend(sig.return_type);
}

impl AstKind {
    /// Child nodes in source order.
    pub fn children(&self) -> Vec<AstId> {
        let mut out = Vec::new();
        match self {
            Self::Script { statements } | Self::Block { statements } => out.extend(statements),
            Self::Module { name, body } => {
                out.push(*name);
                out.extend(body);
            }
            Self::Class {
                name,
                type_params,
                extends,
                implements,
                members,
            } => {
                out.push(*name);
                out.extend(type_params);
                out.extend(*extends);
                out.extend(implements);
                out.extend(members);
            }
            Self::Interface {
                name,
                type_params,
                extends,
                members,
            } => {
                out.push(*name);
                out.extend(type_params);
                out.extend(extends);
                out.extend(members);
            }
            Self::Enum {
                name,
                initializer,
                members,
            } => {
                out.extend([*name, *initializer]);
                out.extend(members);
            }
            Self::EnumMember { name, value, .. } => out.extend([*name, *value]),
            Self::Function {
                name,
                signature,
                body,
            }
            | Self::Method {
                name,
                signature,
                body,
            }
            | Self::GetAccessor {
                name,
                signature,
                body,
            }
            | Self::SetAccessor {
                name,
                signature,
                body,
            } => {
                out.push(*name);
                push_signature(&mut out, signature);
                out.extend(*body);
            }
            Self::Constructor { signature, body } => {
                push_signature(&mut out, signature);
                out.extend(*body);
            }
            Self::TypeAlias { name, ty } => out.extend([*name, *ty]),
            Self::ImportAlias { name, target } => {
                out.push(*name);
                if let ImportTarget::Entity(entity) = target {
                    out.push(*entity);
                }
            }
            Self::ExportAssignment { name } => out.push(*name),
            Self::VarStatement { declarations } => out.extend(declarations),
            Self::VarDecl { name, ty, init }
            | Self::Param { name, ty, init }
            | Self::Property { name, ty, init } => {
                out.push(*name);
                out.extend(*ty);
                out.extend(*init);
            }
            Self::TypeParam { name, constraint } => {
                out.push(*name);
                out.extend(*constraint);
            }
            Self::IndexSignature { param, ty } => {
                out.extend(*param);
                out.extend(*ty);
            }
            Self::PropertySignature { name, ty } => {
                out.push(*name);
                out.extend(*ty);
            }
            Self::MethodSignature { name, signature } => {
                out.push(*name);
                push_signature(&mut out, signature);
            }
            Self::CallSignature { signature } | Self::ConstructSignature { signature } => {
                push_signature(&mut out, signature)
            }
            Self::ExprStatement { expr } | Self::Throw { expr } => out.push(*expr),
            Self::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.extend([*condition, *then_branch]);
                out.extend(*else_branch);
            }
            Self::DoWhile { body, condition } => out.extend([*body, *condition]),
            Self::While { condition, body } => out.extend([*condition, *body]),
            Self::For {
                init,
                condition,
                update,
                body,
            } => {
                out.extend(*init);
                out.extend(*condition);
                out.extend(*update);
                out.push(*body);
            }
            Self::ForIn {
                variable,
                object,
                body,
            } => out.extend([*variable, *object, *body]),
            Self::Continue { label } | Self::Break { label } => out.extend(*label),
            Self::Return { expr } => out.extend(*expr),
            Self::Switch {
                discriminant,
                clauses,
            } => {
                out.push(*discriminant);
                out.extend(clauses);
            }
            Self::CaseClause { test, body } => {
                out.extend(*test);
                out.extend(body);
            }
            Self::Try {
                block,
                catch,
                finally,
            } => {
                out.push(*block);
                out.extend(*catch);
                out.extend(*finally);
            }
            Self::Catch { name, block } => out.extend([*name, *block]),
            Self::Labeled { label, body } => out.extend([*label, *body]),
            Self::ArrayLiteral { elements } => out.extend(elements),
            Self::ObjectLiteral { properties } => out.extend(properties),
            Self::PropertyAssignment { name, value } => out.extend([*name, *value]),
            Self::FunctionExpr {
                name,
                signature,
                body,
            } => {
                out.extend(*name);
                push_signature(&mut out, signature);
                out.push(*body);
            }
            Self::Arrow { signature, body } => {
                push_signature(&mut out, signature);
                out.push(*body);
            }
            Self::Call {
                callee,
                type_args,
                args,
            }
            | Self::New {
                callee,
                type_args,
                args,
            } => {
                out.push(*callee);
                out.extend(type_args);
                out.extend(args);
            }
            Self::Member { object, name } => out.extend([*object, *name]),
            Self::Index { object, index } => out.extend([*object, *index]),
            Self::Unary { operand, .. } | Self::Postfix { operand, .. } => out.push(*operand),
            Self::Binary { lhs, rhs, .. } => out.extend([*lhs, *rhs]),
            Self::Conditional {
                condition,
                then_expr,
                else_expr,
            } => out.extend([*condition, *then_expr, *else_expr]),
            Self::TypeAssertion { ty, expr } => out.extend([*ty, *expr]),
            Self::TypeRef { name, type_args } => {
                out.push(*name);
                out.extend(type_args);
            }
            Self::QualifiedName { left, right } => out.extend([*left, *right]),
            Self::ArrayType { element } => out.push(*element),
            Self::ObjectType { members } => out.extend(members),
            Self::FunctionType { signature, result } | Self::ConstructorType { signature, result } => {
                push_signature(&mut out, signature);
                out.push(*result);
            }
            Self::TypeQuery { name } => out.push(*name),
            Self::Empty
            | Self::Debugger
            | Self::Identifier(_)
            | Self::NumberLiteral(_)
            | Self::StringLiteral(_)
            | Self::RegexLiteral(_)
            | Self::True
            | Self::False
            | Self::Null
            | Self::This
            | Self::Super
            | Self::Omitted
            | Self::Missing
            | Self::Predefined(_) => {}
        }
        // Synthesized enum values may sort before their member name
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Short name of the variant, for diagnostics and debugging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Script { .. } => "Script",
            Self::Module { .. } => "Module",
            Self::Class { .. } => "Class",
            Self::Interface { .. } => "Interface",
            Self::Enum { .. } => "Enum",
            Self::EnumMember { .. } => "EnumMember",
            Self::Function { .. } => "Function",
            Self::TypeAlias { .. } => "TypeAlias",
            Self::ImportAlias { .. } => "ImportAlias",
            Self::ExportAssignment { .. } => "ExportAssignment",
            Self::VarStatement { .. } => "VarStatement",
            Self::VarDecl { .. } => "VarDecl",
            Self::Param { .. } => "Param",
            Self::TypeParam { .. } => "TypeParam",
            Self::Property { .. } => "Property",
            Self::Method { .. } => "Method",
            Self::Constructor { .. } => "Constructor",
            Self::GetAccessor { .. } => "GetAccessor",
            Self::SetAccessor { .. } => "SetAccessor",
            Self::IndexSignature { .. } => "IndexSignature",
            Self::PropertySignature { .. } => "PropertySignature",
            Self::MethodSignature { .. } => "MethodSignature",
            Self::CallSignature { .. } => "CallSignature",
            Self::ConstructSignature { .. } => "ConstructSignature",
            Self::Block { .. } => "Block",
            Self::ExprStatement { .. } => "ExprStatement",
            Self::If { .. } => "If",
            Self::DoWhile { .. } => "DoWhile",
            Self::While { .. } => "While",
            Self::For { .. } => "For",
            Self::ForIn { .. } => "ForIn",
            Self::Continue { .. } => "Continue",
            Self::Break { .. } => "Break",
            Self::Return { .. } => "Return",
            Self::Switch { .. } => "Switch",
            Self::CaseClause { .. } => "CaseClause",
            Self::Throw { .. } => "Throw",
            Self::Try { .. } => "Try",
            Self::Catch { .. } => "Catch",
            Self::Labeled { .. } => "Labeled",
            Self::Empty => "Empty",
            Self::Debugger => "Debugger",
            Self::Identifier(_) => "Identifier",
            Self::NumberLiteral(_) => "NumberLiteral",
            Self::StringLiteral(_) => "StringLiteral",
            Self::RegexLiteral(_) => "RegexLiteral",
            Self::True => "True",
            Self::False => "False",
            Self::Null => "Null",
            Self::This => "This",
            Self::Super => "Super",
            Self::ArrayLiteral { .. } => "ArrayLiteral",
            Self::Omitted => "Omitted",
            Self::ObjectLiteral { .. } => "ObjectLiteral",
            Self::PropertyAssignment { .. } => "PropertyAssignment",
            Self::FunctionExpr { .. } => "FunctionExpr",
            Self::Arrow { .. } => "Arrow",
            Self::Call { .. } => "Call",
            Self::New { .. } => "New",
            Self::Member { .. } => "Member",
            Self::Index { .. } => "Index",
            Self::Unary { .. } => "Unary",
            Self::Postfix { .. } => "Postfix",
            Self::Binary { .. } => "Binary",
            Self::Conditional { .. } => "Conditional",
            Self::TypeAssertion { .. } => "TypeAssertion",
            Self::Missing => "Missing",
            Self::Predefined(_) => "Predefined",
            Self::TypeRef { .. } => "TypeRef",
            Self::QualifiedName { .. } => "QualifiedName",
            Self::ArrayType { .. } => "ArrayType",
            Self::ObjectType { .. } => "ObjectType",
            Self::FunctionType { .. } => "FunctionType",
            Self::ConstructorType { .. } => "ConstructorType",
            Self::TypeQuery { .. } => "TypeQuery",
        }
    }

    /// Nodes that can only appear in type positions
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::Predefined(_)
                | Self::TypeRef { .. }
                | Self::ArrayType { .. }
                | Self::ObjectType { .. }
                | Self::FunctionType { .. }
                | Self::ConstructorType { .. }
                | Self::TypeQuery { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub range: TextRange,
    pub kind: AstKind,
    pub flags: AstFlags,
}

/// Arena of lowered nodes for one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    path: Arc<str>,
    nodes: Vec<AstNode>,
    parents: Vec<Option<AstId>>,
    root: AstId,
}

impl Ast {
    pub(crate) fn from_parts(path: Arc<str>, nodes: Vec<AstNode>, root: AstId) -> Self {
        let mut parents = vec![None; nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            for child in node.kind.children() {
                if let Some(slot) = parents.get_mut(child.index()) {
                    *slot = Some(AstId(index as u32));
                }
            }
        }
        Self {
            path,
            nodes,
            parents,
            root,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> AstId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: AstId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: AstId) -> &AstKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: AstId) -> TextRange {
        self.nodes[id.index()].range
    }

    pub fn flags(&self, id: AstId) -> AstFlags {
        self.nodes[id.index()].flags
    }

    pub fn parent(&self, id: AstId) -> Option<AstId> {
        self.parents[id.index()]
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: AstId) -> impl Iterator<Item = AstId> + '_ {
        std::iter::successors(self.parent(id), |&id| self.parent(id))
    }

    pub fn children(&self, id: AstId) -> Vec<AstId> {
        self.kind(id).children()
    }

    /// Text of an identifier or string literal node
    pub fn text(&self, id: AstId) -> Option<&SmolStr> {
        match self.kind(id) {
            AstKind::Identifier(name) | AstKind::StringLiteral(name) => Some(name),
            _ => None,
        }
    }

    /// Pre-order walk starting at `id`
    pub fn preorder(&self, id: AstId) -> Vec<AstId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Innermost node whose range contains `offset`, with the path of
    /// enclosing nodes leading to it (outermost first).
    pub fn path_to_offset(&self, offset: TextSize) -> Vec<AstId> {
        let mut path = vec![self.root];
        let mut current = self.root;
        loop {
            let next = self
                .children(current)
                .into_iter()
                .filter(|&child| {
                    let range = self.range(child);
                    !self.flags(child).contains(AstFlags::SYNTHESIZED)
                        && range.start() <= offset
                        && offset <= range.end()
                })
                // Prefer the last match so `a.b|` lands on `b`, not `a`
                .next_back();
            match next {
                Some(child) => {
                    path.push(child);
                    current = child;
                }
                None => return path,
            }
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = AstId> + use<> {
        (0..self.nodes.len() as u32).map(AstId)
    }
}

/// Dotted text of an identifier, qualified name or member chain.
pub fn dotted_name(ast: &Ast, id: AstId) -> Option<String> {
    match ast.kind(id) {
        AstKind::Identifier(name) => Some(name.to_string()),
        AstKind::QualifiedName { left, right } | AstKind::Member { object: left, name: right } => {
            Some(format!("{}.{}", dotted_name(ast, *left)?, dotted_name(ast, *right)?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(start: u32, end: u32, kind: AstKind) -> AstNode {
        AstNode {
            range: TextRange::new(TextSize::new(start), TextSize::new(end)),
            kind,
            flags: AstFlags::empty(),
        }
    }

    #[test]
    fn test_parents_and_preorder() {
        let nodes = vec![
            node(0, 1, AstKind::Identifier("a".into())),
            node(4, 5, AstKind::Identifier("b".into())),
            node(0, 5, AstKind::Binary {
                op: BinaryOp::Arith(ArithOp::Add),
                lhs: AstId(0),
                rhs: AstId(1),
            }),
            node(0, 6, AstKind::ExprStatement { expr: AstId(2) }),
            node(0, 6, AstKind::Script {
                statements: vec![AstId(3)],
            }),
        ];
        let ast = Ast::from_parts("t.ts".into(), nodes, AstId(4));
        assert_eq!(ast.parent(AstId(0)), Some(AstId(2)));
        assert_eq!(ast.preorder(ast.root()), vec![AstId(4), AstId(3), AstId(2), AstId(0), AstId(1)]);
        assert_eq!(
            ast.path_to_offset(TextSize::new(4)),
            vec![AstId(4), AstId(3), AstId(2), AstId(1)]
        );
        assert_eq!(ast.ancestors(AstId(1)).count(), 3);
    }
}
