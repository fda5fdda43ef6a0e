//! Typed views over the untyped rowan CST.
//!
//! Each struct wraps a [`SyntaxNode`] and offers accessors for its children.
//! Accessors return `Option` because any child may be absent in a tree with
//! syntax errors.

use smol_str::SmolStr;

use super::scanner::{number_value, string_value};
use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

macro_rules! ast_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($node:ident)),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant($node)),*
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                $($node::can_cast(kind))||*
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                $(
                    if $node::can_cast(node.kind()) {
                        return Some(Self::$variant($node(node)));
                    }
                )*
                None
            }

            fn syntax(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(n) => n.syntax()),*
                }
            }
        }
    };
}

fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

fn children<N: AstNode>(node: &SyntaxNode) -> impl Iterator<Item = N> + use<N> {
    node.children().filter_map(N::cast)
}

fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    token(node, kind).is_some()
}

/// First token that is neither trivia nor a zero-width placeholder
fn first_significant_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| !t.kind().is_trivia() && !t.text().is_empty())
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    pub fn statements(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(&self.0)
    }
}

// ============================================================================
// Names
// ============================================================================

ast_node!(Name, NAME);

impl Name {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::STRING | SyntaxKind::NUMBER))
    }

    /// Declared name; string literal names are unquoted and numeric names
    /// normalized (`1.0` and `1` name the same property).
    pub fn text(&self) -> SmolStr {
        let Some(token) = self.token() else {
            return SmolStr::default();
        };
        match token.kind() {
            SyntaxKind::STRING => SmolStr::new(string_value(token.text())),
            SyntaxKind::NUMBER => match number_value(token.text()) {
                Some(value) => SmolStr::new(format_number(value)),
                None => SmolStr::new(token.text()),
            },
            _ => SmolStr::new(token.text()),
        }
    }

    pub fn is_string(&self) -> bool {
        self.token().is_some_and(|t| t.kind() == SyntaxKind::STRING)
    }

    /// The name is a placeholder for a missing identifier
    pub fn is_missing(&self) -> bool {
        self.token().is_none_or(|t| t.text().is_empty())
    }
}

/// Render a number the way property names are compared.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

ast_node!(NameRef, NAME_REF);

impl NameRef {
    pub fn ident(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn text(&self) -> SmolStr {
        self.ident()
            .map(|t| SmolStr::new(t.text()))
            .unwrap_or_default()
    }
}

ast_node!(QualifiedName, QUALIFIED_NAME);

impl QualifiedName {
    /// Identifier tokens, missing ones included as empty tokens
    pub fn segments(&self) -> Vec<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::IDENT)
            .collect()
    }

    pub fn to_string(&self) -> String {
        self.segments()
            .iter()
            .map(|t| t.text())
            .collect::<Vec<_>>()
            .join(".")
    }
}

ast_node!(ModifierList, MODIFIER_LIST);

impl ModifierList {
    pub fn has(&self, kind: SyntaxKind) -> bool {
        has_token(&self.0, kind)
    }
}

fn modifiers(node: &SyntaxNode) -> Option<ModifierList> {
    child(node)
}

// ============================================================================
// Signatures
// ============================================================================

ast_node!(TypeAnnotation, TYPE_ANNOTATION);

impl TypeAnnotation {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TypeParamList, TYPE_PARAM_LIST);

impl TypeParamList {
    pub fn params(&self) -> impl Iterator<Item = TypeParam> + use<> {
        children(&self.0)
    }
}

ast_node!(TypeParam, TYPE_PARAM);

impl TypeParam {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn constraint(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TypeArgList, TYPE_ARG_LIST);

impl TypeArgList {
    pub fn types(&self) -> impl Iterator<Item = Type> + use<> {
        children(&self.0)
    }
}

ast_node!(ParamList, PARAM_LIST);

impl ParamList {
    pub fn params(&self) -> impl Iterator<Item = Param> + use<> {
        children(&self.0)
    }
}

ast_node!(Param, PARAM);

impl Param {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn type_annotation(&self) -> Option<TypeAnnotation> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn is_rest(&self) -> bool {
        has_token(&self.0, SyntaxKind::DOT_DOT_DOT)
    }

    pub fn is_optional(&self) -> bool {
        has_token(&self.0, SyntaxKind::QUESTION)
    }

    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }
}

ast_node!(ArgList, ARG_LIST);

impl ArgList {
    pub fn args(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

/// Nodes that carry a call signature: optional type parameters, a parameter
/// list and an optional return type annotation.
pub trait HasSignature: AstNode {
    fn type_params(&self) -> Option<TypeParamList> {
        child(self.syntax())
    }

    fn param_list(&self) -> Option<ParamList> {
        child(self.syntax())
    }

    fn return_type(&self) -> Option<TypeAnnotation> {
        child(self.syntax())
    }
}

// ============================================================================
// Declarations
// ============================================================================

ast_node!(ModuleDecl, MODULE_DECL);

impl ModuleDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    /// Dotted name of an internal module
    pub fn qualified_name(&self) -> Option<QualifiedName> {
        child(&self.0)
    }

    /// Quoted name of an ambient external module
    pub fn string_name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<ModuleBody> {
        child(&self.0)
    }
}

ast_node!(ModuleBody, MODULE_BODY);

impl ModuleBody {
    pub fn statements(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(&self.0)
    }
}

ast_node!(ClassDecl, CLASS_DECL);

impl ClassDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn type_params(&self) -> Option<TypeParamList> {
        child(&self.0)
    }

    pub fn extends(&self) -> Option<ExtendsClause> {
        child(&self.0)
    }

    pub fn implements(&self) -> Option<ImplementsClause> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<ClassBody> {
        child(&self.0)
    }
}

ast_node!(ExtendsClause, EXTENDS_CLAUSE);
ast_node!(ImplementsClause, IMPLEMENTS_CLAUSE);

impl ExtendsClause {
    pub fn types(&self) -> Vec<TypeRef> {
        heritage_types(&self.0)
    }
}

impl ImplementsClause {
    pub fn types(&self) -> Vec<TypeRef> {
        heritage_types(&self.0)
    }
}

fn heritage_types(clause: &SyntaxNode) -> Vec<TypeRef> {
    clause
        .children()
        .filter(|n| n.kind() == SyntaxKind::HERITAGE_LIST)
        .flat_map(|list| list.children().filter_map(TypeRef::cast).collect::<Vec<_>>())
        .collect()
}

ast_node!(ClassBody, CLASS_BODY);

impl ClassBody {
    pub fn elements(&self) -> impl Iterator<Item = ClassElement> + use<> {
        children(&self.0)
    }
}

ast_node!(InterfaceDecl, INTERFACE_DECL);

impl InterfaceDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn type_params(&self) -> Option<TypeParamList> {
        child(&self.0)
    }

    pub fn extends(&self) -> Option<ExtendsClause> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<ObjectType> {
        child(&self.0)
    }
}

ast_node!(EnumDecl, ENUM_DECL);

impl EnumDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn members(&self) -> Vec<EnumMember> {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::ENUM_MEMBER_LIST)
            .flat_map(|list| list.children().filter_map(EnumMember::cast).collect::<Vec<_>>())
            .collect()
    }
}

ast_node!(EnumMember, ENUM_MEMBER);

impl EnumMember {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(FunctionDecl, FUNCTION_DECL);

impl HasSignature for FunctionDecl {}

impl FunctionDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(TypeAliasDecl, TYPE_ALIAS_DECL);

impl TypeAliasDecl {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ImportDecl, IMPORT_DECL);

impl ImportDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn external(&self) -> Option<ExternalModuleRef> {
        child(&self.0)
    }

    pub fn entity(&self) -> Option<QualifiedName> {
        child(&self.0)
    }
}

ast_node!(ExternalModuleRef, EXTERNAL_MODULE_REF);

impl ExternalModuleRef {
    pub fn path(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

ast_node!(ExportAssignment, EXPORT_ASSIGNMENT);

impl ExportAssignment {
    pub fn target(&self) -> Option<NameRef> {
        child(&self.0)
    }
}

// ============================================================================
// Class elements and type members
// ============================================================================

ast_enum! {
    /// Any member of a class body
    ClassElement {
        Property(PropertyDecl),
        Method(MethodDecl),
        Constructor(ConstructorDecl),
        GetAccessor(GetAccessor),
        SetAccessor(SetAccessor),
        IndexSignature(IndexSignature),
    }
}

ast_node!(PropertyDecl, PROPERTY_DECL);

impl PropertyDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn type_annotation(&self) -> Option<TypeAnnotation> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(MethodDecl, METHOD_DECL);

impl HasSignature for MethodDecl {}

impl MethodDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ConstructorDecl, CONSTRUCTOR_DECL);

impl HasSignature for ConstructorDecl {}

impl ConstructorDecl {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(GetAccessor, GET_ACCESSOR);
ast_node!(SetAccessor, SET_ACCESSOR);

impl HasSignature for GetAccessor {}
impl HasSignature for SetAccessor {}

impl GetAccessor {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

impl SetAccessor {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(IndexSignature, INDEX_SIGNATURE);

impl IndexSignature {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn param(&self) -> Option<Param> {
        child(&self.0)
    }

    pub fn type_annotation(&self) -> Option<TypeAnnotation> {
        child(&self.0)
    }
}

ast_enum! {
    /// Any member of an object type or interface body
    TypeMember {
        Property(PropertySignature),
        Method(MethodSignature),
        Call(CallSignature),
        Construct(ConstructSignature),
        Index(IndexSignature),
    }
}

ast_node!(PropertySignature, PROPERTY_SIGNATURE);

impl PropertySignature {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn is_optional(&self) -> bool {
        has_token(&self.0, SyntaxKind::QUESTION)
    }

    pub fn type_annotation(&self) -> Option<TypeAnnotation> {
        child(&self.0)
    }
}

ast_node!(MethodSignature, METHOD_SIGNATURE);

impl HasSignature for MethodSignature {}

impl MethodSignature {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn is_optional(&self) -> bool {
        has_token(&self.0, SyntaxKind::QUESTION)
    }
}

ast_node!(CallSignature, CALL_SIGNATURE);
ast_node!(ConstructSignature, CONSTRUCT_SIGNATURE);

impl HasSignature for CallSignature {}
impl HasSignature for ConstructSignature {}

// ============================================================================
// Statements
// ============================================================================

ast_enum! {
    /// Statements, declarations included
    Stmt {
        Variable(VariableStmt),
        Function(FunctionDecl),
        Class(ClassDecl),
        Interface(InterfaceDecl),
        Enum(EnumDecl),
        Module(ModuleDecl),
        TypeAlias(TypeAliasDecl),
        Import(ImportDecl),
        ExportAssignment(ExportAssignment),
        Block(Block),
        Empty(EmptyStmt),
        Expr(ExprStmt),
        If(IfStmt),
        Do(DoStmt),
        While(WhileStmt),
        For(ForStmt),
        ForIn(ForInStmt),
        Continue(ContinueStmt),
        Break(BreakStmt),
        Return(ReturnStmt),
        With(WithStmt),
        Switch(SwitchStmt),
        Throw(ThrowStmt),
        Try(TryStmt),
        Labeled(LabeledStmt),
        Debugger(DebuggerStmt),
    }
}

ast_node!(Block, BLOCK);

impl Block {
    pub fn statements(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(&self.0)
    }
}

ast_node!(VariableStmt, VARIABLE_STMT);

impl VariableStmt {
    pub fn modifiers(&self) -> Option<ModifierList> {
        modifiers(&self.0)
    }

    pub fn declarations(&self) -> Vec<VariableDecl> {
        child::<VariableDeclList>(&self.0)
            .map(|list| list.declarations().collect())
            .unwrap_or_default()
    }
}

ast_node!(VariableDeclList, VARIABLE_DECL_LIST);

impl VariableDeclList {
    pub fn declarations(&self) -> impl Iterator<Item = VariableDecl> + use<> {
        children(&self.0)
    }
}

ast_node!(VariableDecl, VARIABLE_DECL);

impl VariableDecl {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn type_annotation(&self) -> Option<TypeAnnotation> {
        child(&self.0)
    }

    pub fn initializer(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(EmptyStmt, EMPTY_STMT);
ast_node!(DebuggerStmt, DEBUGGER_STMT);

ast_node!(ExprStmt, EXPR_STMT);

impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(IfStmt, IF_STMT);

impl IfStmt {
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn then_branch(&self) -> Option<Stmt> {
        child(&self.0)
    }

    pub fn else_branch(&self) -> Option<Stmt> {
        self.0
            .children()
            .find(|n| n.kind() == SyntaxKind::ELSE_CLAUSE)
            .and_then(|clause| child(&clause))
    }
}

ast_node!(DoStmt, DO_STMT);

impl DoStmt {
    pub fn body(&self) -> Option<Stmt> {
        child(&self.0)
    }

    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(WhileStmt, WHILE_STMT);

impl WhileStmt {
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Stmt> {
        child(&self.0)
    }
}

/// Initializer of a `for` or `for..in` head
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForInit {
    Variables(VariableDeclList),
    Expr(Expr),
}

fn for_init(node: &SyntaxNode) -> Option<ForInit> {
    if let Some(list) = child::<VariableDeclList>(node) {
        return Some(ForInit::Variables(list));
    }
    // The initializer is the expression before the first `;` or `in`
    for element in node.children_with_tokens() {
        match element {
            rowan::NodeOrToken::Token(t)
                if matches!(t.kind(), SyntaxKind::SEMICOLON | SyntaxKind::IN_KW) =>
            {
                return None;
            }
            rowan::NodeOrToken::Node(n) => {
                if let Some(expr) = Expr::cast(n) {
                    return Some(ForInit::Expr(expr));
                }
            }
            _ => {}
        }
    }
    None
}

ast_node!(ForStmt, FOR_STMT);

impl ForStmt {
    pub fn init(&self) -> Option<ForInit> {
        for_init(&self.0)
    }

    /// Expression in the nth `;`-separated section of the head
    fn section(&self, index: usize) -> Option<Expr> {
        let mut section = 0;
        for element in self.0.children_with_tokens() {
            match element {
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::SEMICOLON => section += 1,
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::R_PAREN => return None,
                rowan::NodeOrToken::Node(n) if section == index => {
                    if let Some(expr) = Expr::cast(n) {
                        return Some(expr);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn condition(&self) -> Option<Expr> {
        self.section(1)
    }

    pub fn update(&self) -> Option<Expr> {
        self.section(2)
    }

    pub fn body(&self) -> Option<Stmt> {
        child(&self.0)
    }
}

ast_node!(ForInStmt, FOR_IN_STMT);

impl ForInStmt {
    pub fn init(&self) -> Option<ForInit> {
        for_init(&self.0)
    }

    pub fn object(&self) -> Option<Expr> {
        let mut after_in = false;
        for element in self.0.children_with_tokens() {
            match element {
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::IN_KW => after_in = true,
                rowan::NodeOrToken::Node(n) if after_in => {
                    if let Some(expr) = Expr::cast(n) {
                        return Some(expr);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn body(&self) -> Option<Stmt> {
        child(&self.0)
    }
}

ast_node!(ContinueStmt, CONTINUE_STMT);
ast_node!(BreakStmt, BREAK_STMT);

impl ContinueStmt {
    pub fn label(&self) -> Option<NameRef> {
        child(&self.0)
    }
}

impl BreakStmt {
    pub fn label(&self) -> Option<NameRef> {
        child(&self.0)
    }
}

ast_node!(ReturnStmt, RETURN_STMT);

impl ReturnStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(WithStmt, WITH_STMT);

ast_node!(SwitchStmt, SWITCH_STMT);

impl SwitchStmt {
    pub fn discriminant(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn clauses(&self) -> impl Iterator<Item = SwitchClause> + use<> {
        children(&self.0)
    }
}

ast_enum! {
    SwitchClause {
        Case(CaseClause),
        Default(DefaultClause),
    }
}

ast_node!(CaseClause, CASE_CLAUSE);
ast_node!(DefaultClause, DEFAULT_CLAUSE);

impl SwitchClause {
    pub fn test(&self) -> Option<Expr> {
        match self {
            Self::Case(case) => child(&case.0),
            Self::Default(_) => None,
        }
    }

    pub fn statements(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(self.syntax())
    }
}

ast_node!(ThrowStmt, THROW_STMT);

impl ThrowStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(TryStmt, TRY_STMT);

impl TryStmt {
    pub fn block(&self) -> Option<Block> {
        child(&self.0)
    }

    pub fn catch_clause(&self) -> Option<CatchClause> {
        child(&self.0)
    }

    pub fn finally_block(&self) -> Option<Block> {
        self.0
            .children()
            .find(|n| n.kind() == SyntaxKind::FINALLY_CLAUSE)
            .and_then(|clause| child(&clause))
    }
}

ast_node!(CatchClause, CATCH_CLAUSE);

impl CatchClause {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn block(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(LabeledStmt, LABELED_STMT);

impl LabeledStmt {
    pub fn label(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Stmt> {
        child(&self.0)
    }
}

// ============================================================================
// Expressions
// ============================================================================

ast_enum! {
    Expr {
        Literal(Literal),
        NameRef(NameRef),
        This(ThisExpr),
        Super(SuperExpr),
        Paren(ParenExpr),
        Array(ArrayLiteral),
        Omitted(OmittedExpr),
        Object(ObjectLiteral),
        Function(FunctionExpr),
        Arrow(ArrowFunction),
        Call(CallExpr),
        New(NewExpr),
        Member(MemberExpr),
        Index(IndexExpr),
        Prefix(PrefixExpr),
        Postfix(PostfixExpr),
        Binary(BinaryExpr),
        Conditional(ConditionalExpr),
        TypeAssertion(TypeAssertion),
        Error(ErrorNode),
    }
}

ast_node!(ErrorNode, ERROR);
ast_node!(ThisExpr, THIS_EXPR);
ast_node!(SuperExpr, SUPER_EXPR);
ast_node!(OmittedExpr, OMITTED_EXPR);

ast_node!(Literal, LITERAL);

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }
}

ast_node!(ParenExpr, PAREN_EXPR);

impl ParenExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ArrayLiteral, ARRAY_LITERAL);

impl ArrayLiteral {
    pub fn elements(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

ast_node!(ObjectLiteral, OBJECT_LITERAL);

impl ObjectLiteral {
    pub fn properties(&self) -> impl Iterator<Item = ObjectMember> + use<> {
        children(&self.0)
    }
}

ast_enum! {
    ObjectMember {
        Property(PropertyAssignment),
        Get(GetAccessor),
        Set(SetAccessor),
    }
}

ast_node!(PropertyAssignment, PROPERTY_ASSIGNMENT);

impl PropertyAssignment {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn value(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(FunctionExpr, FUNCTION_EXPR);

impl HasSignature for FunctionExpr {}

impl FunctionExpr {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ArrowFunction, ARROW_FUNCTION);

impl HasSignature for ArrowFunction {}

/// Body of an arrow function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrowBody {
    Block(Block),
    Expr(Expr),
}

impl ArrowFunction {
    pub fn body(&self) -> Option<ArrowBody> {
        self.0.children().find_map(|n| match Block::cast(n.clone()) {
            Some(block) => Some(ArrowBody::Block(block)),
            None => Expr::cast(n).map(ArrowBody::Expr),
        })
    }
}

ast_node!(CallExpr, CALL_EXPR);

impl CallExpr {
    pub fn callee(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn type_args(&self) -> Option<TypeArgList> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(NewExpr, NEW_EXPR);

impl NewExpr {
    pub fn callee(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn type_args(&self) -> Option<TypeArgList> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(MemberExpr, MEMBER_EXPR);

impl MemberExpr {
    pub fn object(&self) -> Option<Expr> {
        self.0.first_child().and_then(Expr::cast)
    }

    pub fn member(&self) -> Option<NameRef> {
        self.0.last_child().and_then(NameRef::cast)
    }
}

ast_node!(IndexExpr, INDEX_EXPR);

impl IndexExpr {
    pub fn object(&self) -> Option<Expr> {
        self.0.first_child().and_then(Expr::cast)
    }

    pub fn index(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

/// Operator token of a unary or binary expression
fn operator(node: &SyntaxNode) -> Option<SyntaxToken> {
    first_significant_token(node)
}

ast_node!(PrefixExpr, PREFIX_EXPR);

impl PrefixExpr {
    pub fn op(&self) -> Option<SyntaxKind> {
        operator(&self.0).map(|t| t.kind())
    }

    pub fn operand(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(PostfixExpr, POSTFIX_EXPR);

impl PostfixExpr {
    pub fn op(&self) -> Option<SyntaxKind> {
        operator(&self.0).map(|t| t.kind())
    }

    pub fn operand(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(BinaryExpr, BINARY_EXPR);

impl BinaryExpr {
    pub fn op(&self) -> Option<SyntaxKind> {
        operator(&self.0).map(|t| t.kind())
    }

    pub fn lhs(&self) -> Option<Expr> {
        self.0.first_child().and_then(Expr::cast)
    }

    pub fn rhs(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(ConditionalExpr, CONDITIONAL_EXPR);

impl ConditionalExpr {
    pub fn condition(&self) -> Option<Expr> {
        children(&self.0).next()
    }

    pub fn then_expr(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }

    pub fn else_expr(&self) -> Option<Expr> {
        children(&self.0).nth(2)
    }
}

ast_node!(TypeAssertion, TYPE_ASSERTION);

impl TypeAssertion {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

// ============================================================================
// Types
// ============================================================================

ast_enum! {
    Type {
        Predefined(PredefinedType),
        Ref(TypeRef),
        Array(ArrayType),
        Object(ObjectType),
        Function(FunctionType),
        Constructor(ConstructorType),
        Query(TypeQuery),
    }
}

ast_node!(PredefinedType, PREDEFINED_TYPE);

impl PredefinedType {
    pub fn keyword(&self) -> Option<SyntaxKind> {
        first_significant_token(&self.0).map(|t| t.kind())
    }
}

ast_node!(TypeRef, TYPE_REF);

impl TypeRef {
    pub fn name(&self) -> Option<QualifiedName> {
        child(&self.0)
    }

    pub fn type_args(&self) -> Option<TypeArgList> {
        child(&self.0)
    }
}

ast_node!(ArrayType, ARRAY_TYPE);

impl ArrayType {
    pub fn element(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ObjectType, OBJECT_TYPE);

impl ObjectType {
    pub fn members(&self) -> impl Iterator<Item = TypeMember> + use<> {
        children(&self.0)
    }
}

ast_node!(FunctionType, FUNCTION_TYPE);
ast_node!(ConstructorType, CONSTRUCTOR_TYPE);

impl HasSignature for FunctionType {}
impl HasSignature for ConstructorType {}

impl FunctionType {
    /// The type after `=>`
    pub fn result(&self) -> Option<Type> {
        child(&self.0)
    }
}

impl ConstructorType {
    pub fn result(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(TypeQuery, TYPE_QUERY);

impl TypeQuery {
    pub fn name(&self) -> Option<QualifiedName> {
        child(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};

    fn source(text: &str) -> SourceFile {
        let tree = parse(text, "test.ts", &ParseOptions::default());
        SourceFile::cast(tree.syntax()).unwrap()
    }

    #[test]
    fn test_ast_class() {
        let file = source("export class C extends B implements I, J { x: number; constructor() {} }");
        let Some(Stmt::Class(class)) = file.statements().next() else {
            panic!("expected class");
        };
        assert_eq!(class.name().unwrap().text(), "C");
        assert!(class.modifiers().unwrap().has(SyntaxKind::EXPORT_KW));
        assert_eq!(class.extends().unwrap().types().len(), 1);
        assert_eq!(class.implements().unwrap().types().len(), 2);
        assert_eq!(class.body().unwrap().elements().count(), 2);
    }

    #[test]
    fn test_ast_string_property_name_is_unquoted() {
        let file = source("interface I { 'a b': string }");
        let Some(Stmt::Interface(iface)) = file.statements().next() else {
            panic!("expected interface");
        };
        let Some(TypeMember::Property(prop)) = iface.body().unwrap().members().next() else {
            panic!("expected property signature");
        };
        assert_eq!(prop.name().unwrap().text(), "a b");
    }

    #[test]
    fn test_ast_for_sections() {
        let file = source("for (;i < 3;) {}");
        let Some(Stmt::For(for_stmt)) = file.statements().next() else {
            panic!("expected for");
        };
        assert!(for_stmt.init().is_none());
        assert!(for_stmt.condition().is_some());
        assert!(for_stmt.update().is_none());
    }

    #[test]
    fn test_ast_binary_operands() {
        let file = source("a + b * c;");
        let Some(Stmt::Expr(stmt)) = file.statements().next() else {
            panic!("expected expression statement");
        };
        let Some(Expr::Binary(binary)) = stmt.expr() else {
            panic!("expected binary");
        };
        assert_eq!(binary.op(), Some(SyntaxKind::PLUS));
        assert!(matches!(binary.rhs(), Some(Expr::Binary(_))));
    }
}
