//! Lowering from the lossless syntax tree to the arena AST.
//!
//! A single pass over the typed CST views. Parentheses disappear (leaving
//! the `PARENTHESIZED` flag), dotted module names become nested modules and
//! enum members all receive explicit value expressions.

use rowan::{TextRange, TextSize};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use crate::parser::ast::{self as cst, AstNode as _, HasSignature};
use crate::parser::{SyntaxKind, SyntaxNode, SyntaxToken, SyntaxTree, number_value, string_value};

use super::ast::{
    ArithOp, Ast, AstFlags, AstId, AstKind, AstNode, BinaryOp, ImportTarget, PostfixOp,
    PredefinedType, Signature, UnaryOp,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("{path}: {construct} is not lowered yet (at {range:?})")]
    NotYetLowered {
        construct: &'static str,
        path: String,
        range: TextRange,
    },
}

/// Lower a parsed file. Fails only on productions the AST has no shape for.
pub fn lower(tree: &SyntaxTree) -> Result<Ast, LowerError> {
    let root = tree.syntax();
    let file = cst::SourceFile::cast(root.clone()).ok_or_else(|| LowerError::NotYetLowered {
        construct: "non-file root",
        path: tree.path().to_string(),
        range: root.text_range(),
    })?;

    let mut lowerer = Lowerer {
        path: tree.path(),
        nodes: Vec::new(),
    };
    let mut statements = Vec::new();
    for stmt in file.statements() {
        statements.push(lowerer.stmt(&stmt)?);
    }
    let script = lowerer.alloc(
        TextRange::up_to(root.text_range().end()),
        AstKind::Script { statements },
        AstFlags::empty(),
    );
    debug!(path = tree.path(), nodes = lowerer.nodes.len(), "lowered");
    Ok(Ast::from_parts(tree.path().into(), lowerer.nodes, script))
}

/// Range of a node without its surrounding trivia and placeholders
pub(crate) fn trimmed_range(node: &SyntaxNode) -> TextRange {
    let mut tokens = node
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia() && !t.text().is_empty());
    let Some(first) = tokens.next() else {
        return TextRange::empty(node.text_range().start());
    };
    let end = tokens.last().unwrap_or_else(|| first.clone()).text_range().end();
    TextRange::new(first.text_range().start(), end)
}

fn modifier_flags(mods: Option<cst::ModifierList>) -> AstFlags {
    let Some(mods) = mods else {
        return AstFlags::empty();
    };
    let mut flags = AstFlags::empty();
    for (kind, flag) in [
        (SyntaxKind::EXPORT_KW, AstFlags::EXPORT),
        (SyntaxKind::DECLARE_KW, AstFlags::DECLARE),
        (SyntaxKind::STATIC_KW, AstFlags::STATIC),
        (SyntaxKind::PUBLIC_KW, AstFlags::PUBLIC),
        (SyntaxKind::PRIVATE_KW, AstFlags::PRIVATE),
    ] {
        if mods.has(kind) {
            flags |= flag;
        }
    }
    flags
}

fn unary_op(kind: SyntaxKind) -> Option<UnaryOp> {
    Some(match kind {
        SyntaxKind::DELETE_KW => UnaryOp::Delete,
        SyntaxKind::VOID_KW => UnaryOp::Void,
        SyntaxKind::TYPEOF_KW => UnaryOp::Typeof,
        SyntaxKind::PLUS_PLUS => UnaryOp::PreIncrement,
        SyntaxKind::MINUS_MINUS => UnaryOp::PreDecrement,
        SyntaxKind::PLUS => UnaryOp::Plus,
        SyntaxKind::MINUS => UnaryOp::Minus,
        SyntaxKind::TILDE => UnaryOp::BitNot,
        SyntaxKind::BANG => UnaryOp::Not,
        _ => return None,
    })
}

fn arith_op(kind: SyntaxKind) -> Option<ArithOp> {
    Some(match kind {
        SyntaxKind::PLUS | SyntaxKind::PLUS_EQ => ArithOp::Add,
        SyntaxKind::MINUS | SyntaxKind::MINUS_EQ => ArithOp::Sub,
        SyntaxKind::STAR | SyntaxKind::STAR_EQ => ArithOp::Mul,
        SyntaxKind::SLASH | SyntaxKind::SLASH_EQ => ArithOp::Div,
        SyntaxKind::PERCENT | SyntaxKind::PERCENT_EQ => ArithOp::Rem,
        SyntaxKind::SHL | SyntaxKind::SHL_EQ => ArithOp::Shl,
        SyntaxKind::SHR | SyntaxKind::SHR_EQ => ArithOp::Shr,
        SyntaxKind::USHR | SyntaxKind::USHR_EQ => ArithOp::UShr,
        SyntaxKind::AMP | SyntaxKind::AMP_EQ => ArithOp::BitAnd,
        SyntaxKind::PIPE | SyntaxKind::PIPE_EQ => ArithOp::BitOr,
        SyntaxKind::CARET | SyntaxKind::CARET_EQ => ArithOp::BitXor,
        _ => return None,
    })
}

fn binary_op(kind: SyntaxKind) -> Option<BinaryOp> {
    Some(match kind {
        SyntaxKind::COMMA => BinaryOp::Comma,
        SyntaxKind::EQ => BinaryOp::Assign,
        SyntaxKind::PIPE_PIPE => BinaryOp::Or,
        SyntaxKind::AMP_AMP => BinaryOp::And,
        SyntaxKind::EQ_EQ => BinaryOp::Equal,
        SyntaxKind::BANG_EQ => BinaryOp::NotEqual,
        SyntaxKind::EQ_EQ_EQ => BinaryOp::StrictEqual,
        SyntaxKind::BANG_EQ_EQ => BinaryOp::StrictNotEqual,
        SyntaxKind::LT => BinaryOp::Less,
        SyntaxKind::GT => BinaryOp::Greater,
        SyntaxKind::LT_EQ => BinaryOp::LessEqual,
        SyntaxKind::GT_EQ => BinaryOp::GreaterEqual,
        SyntaxKind::INSTANCEOF_KW => BinaryOp::Instanceof,
        SyntaxKind::IN_KW => BinaryOp::In,
        kind if kind.is_assignment_op() => BinaryOp::AssignOp(arith_op(kind)?),
        kind => BinaryOp::Arith(arith_op(kind)?),
    })
}

/// `ToInt32` for shift operands
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    (value.trunc() as i64) as i32
}

struct Lowerer<'t> {
    path: &'t str,
    nodes: Vec<AstNode>,
}

impl Lowerer<'_> {
    fn alloc(&mut self, range: TextRange, kind: AstKind, flags: AstFlags) -> AstId {
        let id = AstId(self.nodes.len() as u32);
        self.nodes.push(AstNode { range, kind, flags });
        id
    }

    fn node(&mut self, syntax: &SyntaxNode, kind: AstKind) -> AstId {
        self.alloc(trimmed_range(syntax), kind, AstFlags::empty())
    }

    fn kind(&self, id: AstId) -> &AstKind {
        &self.nodes[id.index()].kind
    }

    fn not_lowered(&self, construct: &'static str, node: &SyntaxNode) -> LowerError {
        LowerError::NotYetLowered {
            construct,
            path: self.path.to_string(),
            range: trimmed_range(node),
        }
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn ident_token(&mut self, token: &SyntaxToken) -> AstId {
        self.alloc(
            token.text_range(),
            AstKind::Identifier(SmolStr::new(token.text())),
            AstFlags::empty(),
        )
    }

    fn missing_name(&mut self, at: TextSize) -> AstId {
        self.alloc(TextRange::empty(at), AstKind::Identifier(SmolStr::default()), AstFlags::empty())
    }

    fn name(&mut self, name: Option<cst::Name>, parent: &SyntaxNode) -> AstId {
        match name {
            Some(name) => {
                let range = match name.token() {
                    Some(token) => token.text_range(),
                    None => TextRange::empty(name.syntax().text_range().start()),
                };
                self.alloc(range, AstKind::Identifier(name.text()), AstFlags::empty())
            }
            None => self.missing_name(trimmed_range(parent).end()),
        }
    }

    fn name_ref(&mut self, name: Option<cst::NameRef>, parent: &SyntaxNode) -> AstId {
        match name.and_then(|n| n.ident()) {
            Some(token) => self.ident_token(&token),
            None => self.missing_name(trimmed_range(parent).end()),
        }
    }

    /// `A.B.C` as left-nested qualified names
    fn qualified_name(&mut self, name: Option<cst::QualifiedName>, parent: &SyntaxNode) -> AstId {
        let segments = name.map(|n| n.segments()).unwrap_or_default();
        let mut iter = segments.iter();
        let Some(first) = iter.next() else {
            return self.missing_name(trimmed_range(parent).end());
        };
        let mut left = self.ident_token(first);
        for segment in iter {
            let right = self.ident_token(segment);
            let range = self.nodes[left.index()].range.cover(segment.text_range());
            left = self.alloc(range, AstKind::QualifiedName { left, right }, AstFlags::empty());
        }
        left
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    fn type_params(&mut self, list: Option<cst::TypeParamList>) -> Vec<AstId> {
        let Some(list) = list else {
            return Vec::new();
        };
        list.params()
            .map(|param| {
                let name = self.name(param.name(), param.syntax());
                let constraint = param.constraint().map(|ty| self.ty(&ty));
                self.node(param.syntax(), AstKind::TypeParam { name, constraint })
            })
            .collect()
    }

    fn param(&mut self, param: &cst::Param) -> Result<AstId, LowerError> {
        let name = self.name(param.name(), param.syntax());
        let ty = self.annotation(param.type_annotation());
        let init = param.initializer().map(|e| self.expr(&e)).transpose()?;
        let mut flags = modifier_flags(param.modifiers());
        if param.is_rest() {
            flags |= AstFlags::REST;
        }
        if param.is_optional() || init.is_some() {
            flags |= AstFlags::OPTIONAL;
        }
        Ok(self.alloc(
            trimmed_range(param.syntax()),
            AstKind::Param { name, ty, init },
            flags,
        ))
    }

    fn annotation(&mut self, annotation: Option<cst::TypeAnnotation>) -> Option<AstId> {
        annotation.and_then(|a| a.ty()).map(|ty| self.ty(&ty))
    }

    fn signature<N: HasSignature>(&mut self, node: &N) -> Result<Signature, LowerError> {
        let type_params = self.type_params(node.type_params());
        let mut params = Vec::new();
        if let Some(list) = node.param_list() {
            for param in list.params() {
                params.push(self.param(&param)?);
            }
        }
        let return_type = self.annotation(node.return_type());
        Ok(Signature {
            type_params,
            params,
            return_type,
        })
    }

    fn block(&mut self, block: &cst::Block) -> Result<AstId, LowerError> {
        let mut statements = Vec::new();
        for stmt in block.statements() {
            statements.push(self.stmt(&stmt)?);
        }
        Ok(self.node(block.syntax(), AstKind::Block { statements }))
    }

    fn block_opt(&mut self, block: Option<cst::Block>) -> Result<Option<AstId>, LowerError> {
        block.map(|b| self.block(&b)).transpose()
    }

    /// A required body that may be missing from a broken tree
    fn body_or_empty(&mut self, block: Option<cst::Block>, parent: &SyntaxNode) -> Result<AstId, LowerError> {
        match block {
            Some(block) => self.block(&block),
            None => Ok(self.alloc(
                TextRange::empty(trimmed_range(parent).end()),
                AstKind::Block {
                    statements: Vec::new(),
                },
                AstFlags::empty(),
            )),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&mut self, stmt: &cst::Stmt) -> Result<AstId, LowerError> {
        let syntax = stmt.syntax();
        let id = match stmt {
            cst::Stmt::Variable(var) => {
                let flags = modifier_flags(var.modifiers());
                let declarations = self.var_decls(var.declarations())?;
                self.alloc(trimmed_range(syntax), AstKind::VarStatement { declarations }, flags)
            }
            cst::Stmt::Function(func) => {
                let name = self.name(func.name(), syntax);
                let signature = self.signature(func)?;
                let body = self.block_opt(func.body())?;
                self.alloc(
                    trimmed_range(syntax),
                    AstKind::Function {
                        name,
                        signature,
                        body,
                    },
                    modifier_flags(func.modifiers()),
                )
            }
            cst::Stmt::Class(class) => self.class(class)?,
            cst::Stmt::Interface(iface) => self.interface(iface)?,
            cst::Stmt::Enum(decl) => self.enum_decl(decl)?,
            cst::Stmt::Module(module) => self.module(module)?,
            cst::Stmt::TypeAlias(alias) => {
                let name = self.name(alias.name(), syntax);
                let ty = match alias.ty() {
                    Some(ty) => self.ty(&ty),
                    None => self.missing_name(trimmed_range(syntax).end()),
                };
                self.node(syntax, AstKind::TypeAlias { name, ty })
            }
            cst::Stmt::Import(import) => {
                let name = self.name(import.name(), syntax);
                let target = match import.external() {
                    Some(external) => ImportTarget::External(
                        external
                            .path()
                            .map(|t| SmolStr::new(string_value(t.text())))
                            .unwrap_or_default(),
                    ),
                    None => ImportTarget::Entity(self.qualified_name(import.entity(), syntax)),
                };
                self.alloc(
                    trimmed_range(syntax),
                    AstKind::ImportAlias { name, target },
                    modifier_flags(import.modifiers()),
                )
            }
            cst::Stmt::ExportAssignment(export) => {
                let name = self.name_ref(export.target(), syntax);
                self.node(syntax, AstKind::ExportAssignment { name })
            }
            cst::Stmt::Block(block) => self.block(block)?,
            cst::Stmt::Empty(_) => self.node(syntax, AstKind::Empty),
            cst::Stmt::Debugger(_) => self.node(syntax, AstKind::Debugger),
            cst::Stmt::Expr(stmt) => {
                let expr = self.expr_or_missing(stmt.expr(), syntax)?;
                self.node(syntax, AstKind::ExprStatement { expr })
            }
            cst::Stmt::If(stmt) => {
                let condition = self.expr_or_missing(stmt.condition(), syntax)?;
                let then_branch = self.stmt_or_empty(stmt.then_branch(), syntax)?;
                let else_branch = stmt.else_branch().map(|s| self.stmt(&s)).transpose()?;
                self.node(
                    syntax,
                    AstKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    },
                )
            }
            cst::Stmt::Do(stmt) => {
                let body = self.stmt_or_empty(stmt.body(), syntax)?;
                let condition = self.expr_or_missing(stmt.condition(), syntax)?;
                self.node(syntax, AstKind::DoWhile { body, condition })
            }
            cst::Stmt::While(stmt) => {
                let condition = self.expr_or_missing(stmt.condition(), syntax)?;
                let body = self.stmt_or_empty(stmt.body(), syntax)?;
                self.node(syntax, AstKind::While { condition, body })
            }
            cst::Stmt::For(stmt) => {
                let init = stmt.init().map(|init| self.for_init(&init)).transpose()?;
                let condition = stmt.condition().map(|e| self.expr(&e)).transpose()?;
                let update = stmt.update().map(|e| self.expr(&e)).transpose()?;
                let body = self.stmt_or_empty(stmt.body(), syntax)?;
                self.node(
                    syntax,
                    AstKind::For {
                        init,
                        condition,
                        update,
                        body,
                    },
                )
            }
            cst::Stmt::ForIn(stmt) => {
                let variable = match stmt.init() {
                    Some(init) => self.for_init(&init)?,
                    None => self.missing_expr(syntax),
                };
                let object = self.expr_or_missing(stmt.object(), syntax)?;
                let body = self.stmt_or_empty(stmt.body(), syntax)?;
                self.node(
                    syntax,
                    AstKind::ForIn {
                        variable,
                        object,
                        body,
                    },
                )
            }
            cst::Stmt::Continue(stmt) => {
                let label = stmt.label().and_then(|l| l.ident()).map(|t| self.ident_token(&t));
                self.node(syntax, AstKind::Continue { label })
            }
            cst::Stmt::Break(stmt) => {
                let label = stmt.label().and_then(|l| l.ident()).map(|t| self.ident_token(&t));
                self.node(syntax, AstKind::Break { label })
            }
            cst::Stmt::Return(stmt) => {
                let expr = stmt.expr().map(|e| self.expr(&e)).transpose()?;
                self.node(syntax, AstKind::Return { expr })
            }
            cst::Stmt::With(_) => return Err(self.not_lowered("'with' statement", syntax)),
            cst::Stmt::Switch(stmt) => {
                let discriminant = self.expr_or_missing(stmt.discriminant(), syntax)?;
                let mut clauses = Vec::new();
                for clause in stmt.clauses() {
                    let test = clause.test().map(|e| self.expr(&e)).transpose()?;
                    let mut body = Vec::new();
                    for s in clause.statements() {
                        body.push(self.stmt(&s)?);
                    }
                    clauses.push(self.node(clause.syntax(), AstKind::CaseClause { test, body }));
                }
                self.node(
                    syntax,
                    AstKind::Switch {
                        discriminant,
                        clauses,
                    },
                )
            }
            cst::Stmt::Throw(stmt) => {
                let expr = self.expr_or_missing(stmt.expr(), syntax)?;
                self.node(syntax, AstKind::Throw { expr })
            }
            cst::Stmt::Try(stmt) => {
                let block = self.body_or_empty(stmt.block(), syntax)?;
                let catch = match stmt.catch_clause() {
                    Some(clause) => {
                        let name = self.name(clause.name(), clause.syntax());
                        let block = self.body_or_empty(clause.block(), clause.syntax())?;
                        Some(self.node(clause.syntax(), AstKind::Catch { name, block }))
                    }
                    None => None,
                };
                let finally = self.block_opt(stmt.finally_block())?;
                self.node(
                    syntax,
                    AstKind::Try {
                        block,
                        catch,
                        finally,
                    },
                )
            }
            cst::Stmt::Labeled(stmt) => {
                let label = self.name(stmt.label(), syntax);
                let body = self.stmt_or_empty(stmt.body(), syntax)?;
                self.node(syntax, AstKind::Labeled { label, body })
            }
        };
        Ok(id)
    }

    fn stmt_or_empty(&mut self, stmt: Option<cst::Stmt>, parent: &SyntaxNode) -> Result<AstId, LowerError> {
        match stmt {
            Some(stmt) => self.stmt(&stmt),
            None => Ok(self.alloc(
                TextRange::empty(trimmed_range(parent).end()),
                AstKind::Empty,
                AstFlags::empty(),
            )),
        }
    }

    fn var_decls(&mut self, decls: Vec<cst::VariableDecl>) -> Result<Vec<AstId>, LowerError> {
        let mut out = Vec::with_capacity(decls.len());
        for decl in decls {
            let name = self.name(decl.name(), decl.syntax());
            let ty = self.annotation(decl.type_annotation());
            let init = decl.initializer().map(|e| self.expr(&e)).transpose()?;
            out.push(self.node(decl.syntax(), AstKind::VarDecl { name, ty, init }));
        }
        Ok(out)
    }

    fn for_init(&mut self, init: &cst::ForInit) -> Result<AstId, LowerError> {
        match init {
            cst::ForInit::Variables(list) => {
                let declarations = self.var_decls(list.declarations().collect())?;
                Ok(self.node(list.syntax(), AstKind::VarStatement { declarations }))
            }
            cst::ForInit::Expr(expr) => self.expr(expr),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn module(&mut self, module: &cst::ModuleDecl) -> Result<AstId, LowerError> {
        let syntax = module.syntax();
        let range = trimmed_range(syntax);
        let flags = modifier_flags(module.modifiers());

        // Names first so ids follow source order
        let (names, external) = match module.string_name() {
            Some(name) => (vec![self.name(Some(name), syntax)], true),
            None => {
                let segments = module.qualified_name().map(|q| q.segments()).unwrap_or_default();
                if segments.is_empty() {
                    (vec![self.missing_name(range.end())], false)
                } else {
                    (segments.iter().map(|t| self.ident_token(t)).collect(), false)
                }
            }
        };

        let mut body = Vec::new();
        if let Some(module_body) = module.body() {
            for stmt in module_body.statements() {
                body.push(self.stmt(&stmt)?);
            }
        }

        // `module A.B.C {}` is `module A { export module B { export module C {} } }`
        let mut inner: Option<AstId> = None;
        for (depth, &name) in names.iter().enumerate().rev() {
            let body = match inner {
                Some(module) => vec![module],
                None => std::mem::take(&mut body),
            };
            let (range, mut flags) = if depth == 0 {
                (range, flags)
            } else {
                let start = self.nodes[name.index()].range.start();
                (TextRange::new(start, range.end()), AstFlags::EXPORT)
            };
            if external {
                flags |= AstFlags::EXTERNAL_NAME;
            }
            inner = Some(self.alloc(range, AstKind::Module { name, body }, flags));
        }
        inner.ok_or_else(|| self.not_lowered("module without a name", syntax))
    }

    fn class(&mut self, class: &cst::ClassDecl) -> Result<AstId, LowerError> {
        let syntax = class.syntax();
        let name = self.name(class.name(), syntax);
        let type_params = self.type_params(class.type_params());
        let extends = class
            .extends()
            .and_then(|clause| clause.types().into_iter().next())
            .map(|ty| self.type_ref(&ty));
        let implements = class
            .implements()
            .map(|clause| clause.types())
            .unwrap_or_default()
            .iter()
            .map(|ty| self.type_ref(ty))
            .collect();
        let mut members = Vec::new();
        if let Some(body) = class.body() {
            for element in body.elements() {
                members.push(self.class_element(&element)?);
            }
        }
        Ok(self.alloc(
            trimmed_range(syntax),
            AstKind::Class {
                name,
                type_params,
                extends,
                implements,
                members,
            },
            modifier_flags(class.modifiers()),
        ))
    }

    fn class_element(&mut self, element: &cst::ClassElement) -> Result<AstId, LowerError> {
        let syntax = element.syntax();
        let range = trimmed_range(syntax);
        let (kind, flags) = match element {
            cst::ClassElement::Property(prop) => {
                let name = self.name(prop.name(), syntax);
                let ty = self.annotation(prop.type_annotation());
                let init = prop.initializer().map(|e| self.expr(&e)).transpose()?;
                (AstKind::Property { name, ty, init }, modifier_flags(prop.modifiers()))
            }
            cst::ClassElement::Method(method) => {
                let name = self.name(method.name(), syntax);
                let signature = self.signature(method)?;
                let body = self.block_opt(method.body())?;
                (
                    AstKind::Method {
                        name,
                        signature,
                        body,
                    },
                    modifier_flags(method.modifiers()),
                )
            }
            cst::ClassElement::Constructor(ctor) => {
                let signature = self.signature(ctor)?;
                let body = self.block_opt(ctor.body())?;
                (
                    AstKind::Constructor { signature, body },
                    modifier_flags(ctor.modifiers()),
                )
            }
            cst::ClassElement::GetAccessor(get) => {
                (self.get_accessor(get)?, modifier_flags(get.modifiers()))
            }
            cst::ClassElement::SetAccessor(set) => {
                (self.set_accessor(set)?, modifier_flags(set.modifiers()))
            }
            cst::ClassElement::IndexSignature(index) => {
                let kind = self.index_signature(index)?;
                (kind, modifier_flags(index.modifiers()))
            }
        };
        Ok(self.alloc(range, kind, flags))
    }

    fn get_accessor(&mut self, get: &cst::GetAccessor) -> Result<AstKind, LowerError> {
        let name = self.name(get.name(), get.syntax());
        let signature = self.signature(get)?;
        let body = self.block_opt(get.body())?;
        Ok(AstKind::GetAccessor {
            name,
            signature,
            body,
        })
    }

    fn set_accessor(&mut self, set: &cst::SetAccessor) -> Result<AstKind, LowerError> {
        let name = self.name(set.name(), set.syntax());
        let signature = self.signature(set)?;
        let body = self.block_opt(set.body())?;
        Ok(AstKind::SetAccessor {
            name,
            signature,
            body,
        })
    }

    fn index_signature(&mut self, index: &cst::IndexSignature) -> Result<AstKind, LowerError> {
        let param = index.param().map(|p| self.param(&p)).transpose()?;
        let ty = self.annotation(index.type_annotation());
        Ok(AstKind::IndexSignature { param, ty })
    }

    fn interface(&mut self, iface: &cst::InterfaceDecl) -> Result<AstId, LowerError> {
        let syntax = iface.syntax();
        let name = self.name(iface.name(), syntax);
        let type_params = self.type_params(iface.type_params());
        let extends = iface
            .extends()
            .map(|clause| clause.types())
            .unwrap_or_default()
            .iter()
            .map(|ty| self.type_ref(ty))
            .collect();
        let members = match iface.body() {
            Some(body) => self.type_members(&body)?,
            None => Vec::new(),
        };
        Ok(self.alloc(
            trimmed_range(syntax),
            AstKind::Interface {
                name,
                type_params,
                extends,
                members,
            },
            modifier_flags(iface.modifiers()),
        ))
    }

    fn type_members(&mut self, body: &cst::ObjectType) -> Result<Vec<AstId>, LowerError> {
        let mut members = Vec::new();
        for member in body.members() {
            let syntax = member.syntax();
            let mut flags = AstFlags::empty();
            let kind = match &member {
                cst::TypeMember::Property(prop) => {
                    if prop.is_optional() {
                        flags |= AstFlags::OPTIONAL;
                    }
                    let name = self.name(prop.name(), syntax);
                    let ty = self.annotation(prop.type_annotation());
                    AstKind::PropertySignature { name, ty }
                }
                cst::TypeMember::Method(method) => {
                    if method.is_optional() {
                        flags |= AstFlags::OPTIONAL;
                    }
                    let name = self.name(method.name(), syntax);
                    let signature = self.signature(method)?;
                    AstKind::MethodSignature { name, signature }
                }
                cst::TypeMember::Call(call) => AstKind::CallSignature {
                    signature: self.signature(call)?,
                },
                cst::TypeMember::Construct(ctor) => AstKind::ConstructSignature {
                    signature: self.signature(ctor)?,
                },
                cst::TypeMember::Index(index) => self.index_signature(index)?,
            };
            members.push(self.alloc(trimmed_range(syntax), kind, flags));
        }
        Ok(members)
    }

    /// The enum object is initialized once, then every member gets an
    /// explicit value: its initializer, `0` for an implicit first member,
    /// `E.prev + 1` for later implicit members.
    fn enum_decl(&mut self, decl: &cst::EnumDecl) -> Result<AstId, LowerError> {
        let syntax = decl.syntax();
        let name = self.name(decl.name(), syntax);
        let enum_name = match self.kind(name) {
            AstKind::Identifier(text) => text.clone(),
            _ => SmolStr::default(),
        };
        let initializer = self.enum_backing_map(trimmed_range(syntax), &enum_name);

        let mut known: FxHashMap<SmolStr, Option<f64>> = FxHashMap::default();
        let mut previous: Option<(SmolStr, Option<f64>)> = None;
        let mut members = Vec::new();

        for member in decl.members() {
            let member_syntax = member.syntax();
            let range = trimmed_range(member_syntax);
            let member_name = self.name(member.name(), member_syntax);
            let member_text = match self.kind(member_name) {
                AstKind::Identifier(text) => text.clone(),
                _ => SmolStr::default(),
            };

            let (value, constant) = match member.initializer() {
                Some(init) => {
                    let value = self.expr(&init)?;
                    let constant = self.fold_enum_value(value, &enum_name, &known);
                    (value, constant)
                }
                None => match &previous {
                    None => {
                        let zero = self.synthesized(range, AstKind::NumberLiteral(0.0));
                        (zero, Some(0.0))
                    }
                    Some((prev_name, prev_value)) => {
                        let object = self.synthesized(range, AstKind::Identifier(enum_name.clone()));
                        let prop = self.synthesized(range, AstKind::Identifier(prev_name.clone()));
                        let access = self.synthesized(
                            range,
                            AstKind::Member {
                                object,
                                name: prop,
                            },
                        );
                        let one = self.synthesized(range, AstKind::NumberLiteral(1.0));
                        let sum = self.synthesized(
                            range,
                            AstKind::Binary {
                                op: BinaryOp::Arith(ArithOp::Add),
                                lhs: access,
                                rhs: one,
                            },
                        );
                        (sum, prev_value.map(|v| v + 1.0))
                    }
                },
            };

            let mut flags = AstFlags::empty();
            if constant.is_some() {
                flags |= AstFlags::CONSTANT_FOLDABLE;
                self.nodes[value.index()].flags |= AstFlags::CONSTANT_FOLDABLE;
            }
            known.insert(member_text.clone(), constant);
            previous = Some((member_text, constant));
            members.push(self.alloc(
                range,
                AstKind::EnumMember {
                    name: member_name,
                    value,
                    constant,
                },
                flags,
            ));
        }

        Ok(self.alloc(
            trimmed_range(syntax),
            AstKind::Enum {
                name,
                initializer,
                members,
            },
            modifier_flags(decl.modifiers()),
        ))
    }

    /// `E || (E = {})`
    fn enum_backing_map(&mut self, range: TextRange, enum_name: &SmolStr) -> AstId {
        let existing = self.synthesized(range, AstKind::Identifier(enum_name.clone()));
        let target = self.synthesized(range, AstKind::Identifier(enum_name.clone()));
        let empty = self.synthesized(range, AstKind::ObjectLiteral { properties: Vec::new() });
        let assign = self.synthesized(
            range,
            AstKind::Binary {
                op: BinaryOp::Assign,
                lhs: target,
                rhs: empty,
            },
        );
        self.synthesized(
            range,
            AstKind::Binary {
                op: BinaryOp::Or,
                lhs: existing,
                rhs: assign,
            },
        )
    }

    fn synthesized(&mut self, range: TextRange, kind: AstKind) -> AstId {
        self.alloc(range, kind, AstFlags::SYNTHESIZED)
    }

    /// Constant value of an enum initializer: a numeric literal, a shift of
    /// two literals, or a reference to an earlier constant member.
    fn fold_enum_value(
        &self,
        value: AstId,
        enum_name: &SmolStr,
        known: &FxHashMap<SmolStr, Option<f64>>,
    ) -> Option<f64> {
        match self.kind(value) {
            AstKind::NumberLiteral(n) => Some(*n),
            AstKind::Binary {
                op: BinaryOp::Arith(ArithOp::Shl),
                lhs,
                rhs,
            } => match (self.kind(*lhs), self.kind(*rhs)) {
                (AstKind::NumberLiteral(a), AstKind::NumberLiteral(b)) => {
                    let shift = (to_int32(*b) as u32) & 31;
                    Some(f64::from(to_int32(*a).wrapping_shl(shift)))
                }
                _ => None,
            },
            AstKind::Identifier(name) => known.get(name).copied().flatten(),
            AstKind::Member { object, name } => match (self.kind(*object), self.kind(*name)) {
                (AstKind::Identifier(object), AstKind::Identifier(name)) if object == enum_name => {
                    known.get(name).copied().flatten()
                }
                _ => None,
            },
            _ => None,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn missing_expr(&mut self, parent: &SyntaxNode) -> AstId {
        self.alloc(
            TextRange::empty(trimmed_range(parent).end()),
            AstKind::Missing,
            AstFlags::empty(),
        )
    }

    fn expr_or_missing(&mut self, expr: Option<cst::Expr>, parent: &SyntaxNode) -> Result<AstId, LowerError> {
        match expr {
            Some(expr) => self.expr(&expr),
            None => Ok(self.missing_expr(parent)),
        }
    }

    fn args(&mut self, list: Option<cst::ArgList>) -> Result<Vec<AstId>, LowerError> {
        let mut out = Vec::new();
        if let Some(list) = list {
            for arg in list.args() {
                out.push(self.expr(&arg)?);
            }
        }
        Ok(out)
    }

    fn type_args(&mut self, list: Option<cst::TypeArgList>) -> Vec<AstId> {
        list.map(|l| l.types().map(|ty| self.ty(&ty)).collect())
            .unwrap_or_default()
    }

    fn expr(&mut self, expr: &cst::Expr) -> Result<AstId, LowerError> {
        let syntax = expr.syntax();
        let kind = match expr {
            cst::Expr::Paren(paren) => {
                let inner = self.expr_or_missing(paren.expr(), syntax)?;
                self.nodes[inner.index()].flags |= AstFlags::PARENTHESIZED;
                return Ok(inner);
            }
            cst::Expr::Literal(lit) => match lit.token() {
                Some(token) => match token.kind() {
                    SyntaxKind::NUMBER => {
                        AstKind::NumberLiteral(number_value(token.text()).unwrap_or(f64::NAN))
                    }
                    SyntaxKind::STRING => AstKind::StringLiteral(SmolStr::new(string_value(token.text()))),
                    SyntaxKind::REGEX => AstKind::RegexLiteral(SmolStr::new(token.text())),
                    SyntaxKind::TRUE_KW => AstKind::True,
                    SyntaxKind::FALSE_KW => AstKind::False,
                    SyntaxKind::NULL_KW => AstKind::Null,
                    _ => AstKind::Missing,
                },
                None => AstKind::Missing,
            },
            cst::Expr::NameRef(name) => match name.ident() {
                Some(token) => AstKind::Identifier(SmolStr::new(token.text())),
                None => AstKind::Identifier(SmolStr::default()),
            },
            cst::Expr::This(_) => AstKind::This,
            cst::Expr::Super(_) => AstKind::Super,
            cst::Expr::Omitted(_) => AstKind::Omitted,
            cst::Expr::Error(_) => AstKind::Missing,
            cst::Expr::Array(array) => {
                let mut elements = Vec::new();
                for element in array.elements() {
                    elements.push(self.expr(&element)?);
                }
                AstKind::ArrayLiteral { elements }
            }
            cst::Expr::Object(object) => {
                let mut properties = Vec::new();
                for member in object.properties() {
                    let member_syntax = member.syntax();
                    let kind = match &member {
                        cst::ObjectMember::Property(prop) => {
                            let name = self.name(prop.name(), member_syntax);
                            let value = self.expr_or_missing(prop.value(), member_syntax)?;
                            AstKind::PropertyAssignment { name, value }
                        }
                        cst::ObjectMember::Get(get) => self.get_accessor(get)?,
                        cst::ObjectMember::Set(set) => self.set_accessor(set)?,
                    };
                    properties.push(self.node(member_syntax, kind));
                }
                AstKind::ObjectLiteral { properties }
            }
            cst::Expr::Function(func) => {
                let name = func.name().map(|n| self.name(Some(n), syntax));
                let signature = self.signature(func)?;
                let body = self.body_or_empty(func.body(), syntax)?;
                AstKind::FunctionExpr {
                    name,
                    signature,
                    body,
                }
            }
            cst::Expr::Arrow(arrow) => {
                let signature = self.signature(arrow)?;
                let body = match arrow.body() {
                    Some(cst::ArrowBody::Block(block)) => self.block(&block)?,
                    Some(cst::ArrowBody::Expr(expr)) => self.expr(&expr)?,
                    None => self.missing_expr(syntax),
                };
                AstKind::Arrow { signature, body }
            }
            cst::Expr::Call(call) => {
                let callee = self.expr_or_missing(call.callee(), syntax)?;
                let type_args = self.type_args(call.type_args());
                let args = self.args(call.arg_list())?;
                AstKind::Call {
                    callee,
                    type_args,
                    args,
                }
            }
            cst::Expr::New(new) => {
                let callee = self.expr_or_missing(new.callee(), syntax)?;
                let type_args = self.type_args(new.type_args());
                let args = self.args(new.arg_list())?;
                AstKind::New {
                    callee,
                    type_args,
                    args,
                }
            }
            cst::Expr::Member(member) => {
                let object = self.expr_or_missing(member.object(), syntax)?;
                let name = self.name_ref(member.member(), syntax);
                AstKind::Member { object, name }
            }
            cst::Expr::Index(index) => {
                let object = self.expr_or_missing(index.object(), syntax)?;
                let index = self.expr_or_missing(index.index(), syntax)?;
                AstKind::Index { object, index }
            }
            cst::Expr::Prefix(prefix) => {
                let operand = self.expr_or_missing(prefix.operand(), syntax)?;
                match prefix.op().and_then(unary_op) {
                    Some(op) => AstKind::Unary { op, operand },
                    None => AstKind::Missing,
                }
            }
            cst::Expr::Postfix(postfix) => {
                let operand = self.expr_or_missing(postfix.operand(), syntax)?;
                let op = match postfix.op() {
                    Some(SyntaxKind::MINUS_MINUS) => PostfixOp::Decrement,
                    _ => PostfixOp::Increment,
                };
                AstKind::Postfix { op, operand }
            }
            cst::Expr::Binary(binary) => {
                let lhs = self.expr_or_missing(binary.lhs(), syntax)?;
                let rhs = self.expr_or_missing(binary.rhs(), syntax)?;
                match binary.op().and_then(binary_op) {
                    Some(op) => AstKind::Binary { op, lhs, rhs },
                    None => AstKind::Missing,
                }
            }
            cst::Expr::Conditional(cond) => {
                let condition = self.expr_or_missing(cond.condition(), syntax)?;
                let then_expr = self.expr_or_missing(cond.then_expr(), syntax)?;
                let else_expr = self.expr_or_missing(cond.else_expr(), syntax)?;
                AstKind::Conditional {
                    condition,
                    then_expr,
                    else_expr,
                }
            }
            cst::Expr::TypeAssertion(assertion) => {
                let ty = match assertion.ty() {
                    Some(ty) => self.ty(&ty),
                    None => self.missing_name(trimmed_range(syntax).start()),
                };
                let expr = self.expr_or_missing(assertion.expr(), syntax)?;
                AstKind::TypeAssertion { ty, expr }
            }
        };
        Ok(self.node(syntax, kind))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_ref(&mut self, ty: &cst::TypeRef) -> AstId {
        let name = self.qualified_name(ty.name(), ty.syntax());
        let type_args = self.type_args(ty.type_args());
        self.node(ty.syntax(), AstKind::TypeRef { name, type_args })
    }

    fn ty(&mut self, ty: &cst::Type) -> AstId {
        let syntax = ty.syntax();
        match ty {
            cst::Type::Predefined(predefined) => {
                let kind = match predefined.keyword() {
                    Some(SyntaxKind::NUMBER_KW) => PredefinedType::Number,
                    Some(SyntaxKind::STRING_KW) => PredefinedType::String,
                    Some(SyntaxKind::BOOLEAN_KW) => PredefinedType::Boolean,
                    Some(SyntaxKind::VOID_KW) => PredefinedType::Void,
                    _ => PredefinedType::Any,
                };
                self.node(syntax, AstKind::Predefined(kind))
            }
            cst::Type::Ref(type_ref) => self.type_ref(type_ref),
            cst::Type::Array(array) => {
                let element = match array.element() {
                    Some(element) => self.ty(&element),
                    None => self.missing_name(trimmed_range(syntax).start()),
                };
                self.node(syntax, AstKind::ArrayType { element })
            }
            cst::Type::Object(object) => {
                // Signatures in type position have no bodies to fail on
                let members = self.type_members(object).unwrap_or_default();
                self.node(syntax, AstKind::ObjectType { members })
            }
            cst::Type::Function(func) => {
                let signature = self.signature(func).unwrap_or_default();
                let result = self.type_or_missing(func.result(), syntax);
                self.node(syntax, AstKind::FunctionType { signature, result })
            }
            cst::Type::Constructor(ctor) => {
                let signature = self.signature(ctor).unwrap_or_default();
                let result = self.type_or_missing(ctor.result(), syntax);
                self.node(syntax, AstKind::ConstructorType { signature, result })
            }
            cst::Type::Query(query) => {
                let name = self.qualified_name(query.name(), syntax);
                self.node(syntax, AstKind::TypeQuery { name })
            }
        }
    }

    fn type_or_missing(&mut self, ty: Option<cst::Type>, parent: &SyntaxNode) -> AstId {
        match ty {
            Some(ty) => self.ty(&ty),
            None => self.missing_name(trimmed_range(parent).end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    fn lower_text(text: &str) -> Ast {
        lower(&parse(text, "test.ts", &ParseOptions::default())).unwrap()
    }

    fn first_statement(ast: &Ast) -> AstId {
        match ast.kind(ast.root()) {
            AstKind::Script { statements } => statements[0],
            other => panic!("unexpected root {other:?}"),
        }
    }

    fn enum_constants(text: &str) -> Vec<Option<f64>> {
        let ast = lower_text(text);
        let AstKind::Enum { members, .. } = ast.kind(first_statement(&ast)) else {
            panic!("expected enum");
        };
        members
            .iter()
            .map(|&m| match ast.kind(m) {
                AstKind::EnumMember { constant, .. } => *constant,
                other => panic!("unexpected member {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_enum_implicit_values() {
        assert_eq!(enum_constants("enum E { A, B, C }"), vec![Some(0.0), Some(1.0), Some(2.0)]);
        assert_eq!(enum_constants("enum E { A = 5, B }"), vec![Some(5.0), Some(6.0)]);
        assert_eq!(enum_constants("enum E { A = x, B }"), vec![None, None]);
    }

    #[test]
    fn test_enum_shift_and_reference() {
        assert_eq!(
            enum_constants("enum F { A = 1 << 2, B = A, C = F.B, D }"),
            vec![Some(4.0), Some(4.0), Some(4.0), Some(5.0)]
        );
    }

    #[test]
    fn test_enum_implicit_member_is_synthesized() {
        let ast = lower_text("enum E { A = 1, B }");
        let AstKind::Enum { members, .. } = ast.kind(first_statement(&ast)) else {
            panic!("expected enum");
        };
        let AstKind::EnumMember { value, .. } = ast.kind(members[1]) else {
            panic!("expected member");
        };
        assert!(ast.flags(*value).contains(AstFlags::SYNTHESIZED));
        let AstKind::Binary { lhs, .. } = ast.kind(*value) else {
            panic!("expected E.A + 1");
        };
        assert_eq!(dotted(&ast, *lhs), "E.A");
    }

    fn dotted(ast: &Ast, id: AstId) -> String {
        super::super::ast::dotted_name(ast, id).unwrap_or_default()
    }

    #[test]
    fn test_dotted_module_desugars() {
        let ast = lower_text("module A.B.C { var x; }");
        let outer = first_statement(&ast);
        let AstKind::Module { body, .. } = ast.kind(outer) else {
            panic!("expected module");
        };
        let middle = body[0];
        assert!(ast.flags(middle).contains(AstFlags::EXPORT));
        let AstKind::Module { name, body } = ast.kind(middle) else {
            panic!("expected nested module");
        };
        assert_eq!(ast.text(*name).map(|s| s.as_str()), Some("B"));
        let AstKind::Module { body: inner_body, .. } = ast.kind(body[0]) else {
            panic!("expected innermost module");
        };
        assert_eq!(inner_body.len(), 1);
    }

    #[test]
    fn test_parens_unwrapped() {
        let ast = lower_text("(a);");
        let AstKind::ExprStatement { expr } = ast.kind(first_statement(&ast)) else {
            panic!("expected expression statement");
        };
        assert!(matches!(ast.kind(*expr), AstKind::Identifier(name) if name == "a"));
        assert!(ast.flags(*expr).contains(AstFlags::PARENTHESIZED));
    }

    #[test]
    fn test_with_is_not_lowered() {
        let tree = parse("function f() { with (o) {} }", "w.ts", &ParseOptions::default());
        let err = lower(&tree).unwrap_err();
        assert!(matches!(err, LowerError::NotYetLowered { construct, .. } if construct.contains("with")));
    }

    #[test]
    fn test_ranges_are_trimmed() {
        let ast = lower_text("  /* c */ var x = 1;  \n");
        let stmt = first_statement(&ast);
        assert_eq!(ast.range(stmt), TextRange::new(10.into(), 20.into()));
    }

    #[test]
    fn test_lowering_is_pure() {
        let tree = parse(
            "module M { export class C<T> extends B implements I { static x = 1; get y() { return 2; } } }",
            "p.ts",
            &ParseOptions::default(),
        );
        assert_eq!(lower(&tree).unwrap(), lower(&tree).unwrap());
    }
}
