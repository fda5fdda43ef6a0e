//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree.
//! Tokens come first (trivia, literals, punctuation, keywords), then the
//! composite nodes, one per grammar production.

/// All syntax kinds (tokens and nodes)
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation).
/// Nodes are composite (declarations, statements, expressions, types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    NEWLINE,
    SINGLE_LINE_COMMENT,
    MULTI_LINE_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,   // foo
    NUMBER,  // 42, 0x2A, 1.5e3
    STRING,  // "hello" or 'hello'
    REGEX,   // /ab+c/g
    UNKNOWN, // a character no token starts with
    EOF,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,     // {
    R_BRACE,     // }
    L_PAREN,     // (
    R_PAREN,     // )
    L_BRACKET,   // [
    R_BRACKET,   // ]
    DOT,         // .
    DOT_DOT_DOT, // ...
    SEMICOLON,   // ;
    COMMA,       // ,
    LT,          // <
    GT,          // >
    LT_EQ,       // <=
    GT_EQ,       // >=
    EQ_EQ,       // ==
    BANG_EQ,     // !=
    EQ_EQ_EQ,    // ===
    BANG_EQ_EQ,  // !==
    FAT_ARROW,   // =>
    PLUS,        // +
    MINUS,       // -
    STAR,        // *
    SLASH,       // /
    PERCENT,     // %
    PLUS_PLUS,   // ++
    MINUS_MINUS, // --
    SHL,         // <<
    SHR,         // >>
    USHR,        // >>>
    AMP,         // &
    PIPE,        // |
    CARET,       // ^
    BANG,        // !
    TILDE,       // ~
    AMP_AMP,     // &&
    PIPE_PIPE,   // ||
    QUESTION,    // ?
    COLON,       // :
    EQ,          // =
    PLUS_EQ,     // +=
    MINUS_EQ,    // -=
    STAR_EQ,     // *=
    SLASH_EQ,    // /=
    PERCENT_EQ,  // %=
    SHL_EQ,      // <<=
    SHR_EQ,      // >>=
    USHR_EQ,     // >>>=
    AMP_EQ,      // &=
    PIPE_EQ,     // |=
    CARET_EQ,    // ^=

    // =========================================================================
    // KEYWORDS - reserved
    // =========================================================================
    BREAK_KW,
    CASE_KW,
    CATCH_KW,
    CLASS_KW,
    CONST_KW,
    CONTINUE_KW,
    DEBUGGER_KW,
    DEFAULT_KW,
    DELETE_KW,
    DO_KW,
    ELSE_KW,
    ENUM_KW,
    EXPORT_KW,
    EXTENDS_KW,
    FALSE_KW,
    FINALLY_KW,
    FOR_KW,
    FUNCTION_KW,
    IF_KW,
    IMPORT_KW,
    IN_KW,
    INSTANCEOF_KW,
    NEW_KW,
    NULL_KW,
    RETURN_KW,
    SUPER_KW,
    SWITCH_KW,
    THIS_KW,
    THROW_KW,
    TRUE_KW,
    TRY_KW,
    TYPEOF_KW,
    VAR_KW,
    VOID_KW,
    WHILE_KW,
    WITH_KW,

    // =========================================================================
    // KEYWORDS - contextual (usable as identifiers)
    // =========================================================================
    IMPLEMENTS_KW,
    INTERFACE_KW,
    LET_KW,
    PACKAGE_KW,
    PRIVATE_KW,
    PROTECTED_KW,
    PUBLIC_KW,
    STATIC_KW,
    YIELD_KW,
    ANY_KW,
    BOOLEAN_KW,
    CONSTRUCTOR_KW,
    DECLARE_KW,
    GET_KW,
    MODULE_KW,
    NUMBER_KW,
    REQUIRE_KW,
    SET_KW,
    STRING_KW,
    TYPE_KW,

    // =========================================================================
    // NODES - root and shared pieces
    // =========================================================================
    SOURCE_FILE,
    NAME,           // declared name
    NAME_REF,       // referenced name
    QUALIFIED_NAME, // A.B.C
    MODIFIER_LIST,
    TYPE_ANNOTATION,
    TYPE_PARAM_LIST,
    TYPE_PARAM,
    TYPE_ARG_LIST,
    PARAM_LIST,
    PARAM,
    ARG_LIST,
    HERITAGE_LIST,

    // =========================================================================
    // NODES - declarations
    // =========================================================================
    MODULE_DECL,
    MODULE_BODY,
    CLASS_DECL,
    EXTENDS_CLAUSE,
    IMPLEMENTS_CLAUSE,
    CLASS_BODY,
    INTERFACE_DECL,
    ENUM_DECL,
    ENUM_MEMBER_LIST,
    ENUM_MEMBER,
    FUNCTION_DECL,
    TYPE_ALIAS_DECL,
    IMPORT_DECL,
    EXTERNAL_MODULE_REF,
    EXPORT_ASSIGNMENT,

    // Class elements
    PROPERTY_DECL,
    METHOD_DECL,
    CONSTRUCTOR_DECL,
    GET_ACCESSOR,
    SET_ACCESSOR,
    INDEX_SIGNATURE,

    // Type members
    PROPERTY_SIGNATURE,
    METHOD_SIGNATURE,
    CALL_SIGNATURE,
    CONSTRUCT_SIGNATURE,

    // =========================================================================
    // NODES - statements
    // =========================================================================
    BLOCK,
    VARIABLE_STMT,
    VARIABLE_DECL_LIST,
    VARIABLE_DECL,
    EXPR_STMT,
    IF_STMT,
    ELSE_CLAUSE,
    WHILE_STMT,
    DO_STMT,
    FOR_STMT,
    FOR_IN_STMT,
    RETURN_STMT,
    BREAK_STMT,
    CONTINUE_STMT,
    THROW_STMT,
    TRY_STMT,
    CATCH_CLAUSE,
    FINALLY_CLAUSE,
    SWITCH_STMT,
    CASE_CLAUSE,
    DEFAULT_CLAUSE,
    LABELED_STMT,
    EMPTY_STMT,
    DEBUGGER_STMT,
    WITH_STMT,

    // =========================================================================
    // NODES - expressions
    // =========================================================================
    LITERAL,
    THIS_EXPR,
    SUPER_EXPR,
    PAREN_EXPR,
    ARRAY_LITERAL,
    OMITTED_EXPR,
    OBJECT_LITERAL,
    PROPERTY_ASSIGNMENT,
    FUNCTION_EXPR,
    ARROW_FUNCTION,
    CALL_EXPR,
    NEW_EXPR,
    MEMBER_EXPR,
    INDEX_EXPR,
    PREFIX_EXPR,
    POSTFIX_EXPR,
    BINARY_EXPR,
    CONDITIONAL_EXPR,
    TYPE_ASSERTION,

    // =========================================================================
    // NODES - types
    // =========================================================================
    PREDEFINED_TYPE,
    TYPE_REF,
    ARRAY_TYPE,
    OBJECT_TYPE,
    FUNCTION_TYPE,
    CONSTRUCTOR_TYPE,
    TYPE_QUERY,

    // Special
    ERROR,
    TOMBSTONE, // placeholder left behind by abandoned markers

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace, newline or comment)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::NEWLINE | Self::SINGLE_LINE_COMMENT | Self::MULTI_LINE_COMMENT
        )
    }

    /// Check if this is a keyword (reserved or contextual)
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::BREAK_KW as u16) && (self as u16) <= (Self::TYPE_KW as u16)
    }

    /// Keywords that may still be used as identifiers
    pub fn is_contextual_keyword(self) -> bool {
        (self as u16) >= (Self::IMPLEMENTS_KW as u16) && (self as u16) <= (Self::TYPE_KW as u16)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_BRACE as u16) && (self as u16) <= (Self::CARET_EQ as u16)
    }

    /// Check if this is a literal token
    pub fn is_literal(self) -> bool {
        matches!(self, Self::NUMBER | Self::STRING | Self::REGEX)
    }

    pub fn is_token(self) -> bool {
        (self as u16) <= (Self::TYPE_KW as u16)
    }

    /// Identifier or a keyword that can stand in for one
    pub fn is_ident_like(self) -> bool {
        self == Self::IDENT || self.is_contextual_keyword()
    }

    /// Any identifier name, reserved words included (property names)
    pub fn is_identifier_name(self) -> bool {
        self == Self::IDENT || self.is_keyword()
    }

    pub fn is_assignment_op(self) -> bool {
        matches!(
            self,
            Self::EQ
                | Self::PLUS_EQ
                | Self::MINUS_EQ
                | Self::STAR_EQ
                | Self::SLASH_EQ
                | Self::PERCENT_EQ
                | Self::SHL_EQ
                | Self::SHR_EQ
                | Self::USHR_EQ
                | Self::AMP_EQ
                | Self::PIPE_EQ
                | Self::CARET_EQ
        )
    }

    /// Keyword lookup from identifier text
    pub fn from_keyword(text: &str) -> Option<SyntaxKind> {
        let kind = match text {
            "break" => Self::BREAK_KW,
            "case" => Self::CASE_KW,
            "catch" => Self::CATCH_KW,
            "class" => Self::CLASS_KW,
            "const" => Self::CONST_KW,
            "continue" => Self::CONTINUE_KW,
            "debugger" => Self::DEBUGGER_KW,
            "default" => Self::DEFAULT_KW,
            "delete" => Self::DELETE_KW,
            "do" => Self::DO_KW,
            "else" => Self::ELSE_KW,
            "enum" => Self::ENUM_KW,
            "export" => Self::EXPORT_KW,
            "extends" => Self::EXTENDS_KW,
            "false" => Self::FALSE_KW,
            "finally" => Self::FINALLY_KW,
            "for" => Self::FOR_KW,
            "function" => Self::FUNCTION_KW,
            "if" => Self::IF_KW,
            "import" => Self::IMPORT_KW,
            "in" => Self::IN_KW,
            "instanceof" => Self::INSTANCEOF_KW,
            "new" => Self::NEW_KW,
            "null" => Self::NULL_KW,
            "return" => Self::RETURN_KW,
            "super" => Self::SUPER_KW,
            "switch" => Self::SWITCH_KW,
            "this" => Self::THIS_KW,
            "throw" => Self::THROW_KW,
            "true" => Self::TRUE_KW,
            "try" => Self::TRY_KW,
            "typeof" => Self::TYPEOF_KW,
            "var" => Self::VAR_KW,
            "void" => Self::VOID_KW,
            "while" => Self::WHILE_KW,
            "with" => Self::WITH_KW,
            "implements" => Self::IMPLEMENTS_KW,
            "interface" => Self::INTERFACE_KW,
            "let" => Self::LET_KW,
            "package" => Self::PACKAGE_KW,
            "private" => Self::PRIVATE_KW,
            "protected" => Self::PROTECTED_KW,
            "public" => Self::PUBLIC_KW,
            "static" => Self::STATIC_KW,
            "yield" => Self::YIELD_KW,
            "any" => Self::ANY_KW,
            "boolean" => Self::BOOLEAN_KW,
            "constructor" => Self::CONSTRUCTOR_KW,
            "declare" => Self::DECLARE_KW,
            "get" => Self::GET_KW,
            "module" => Self::MODULE_KW,
            "number" => Self::NUMBER_KW,
            "require" => Self::REQUIRE_KW,
            "set" => Self::SET_KW,
            "string" => Self::STRING_KW,
            "type" => Self::TYPE_KW,
            _ => return None,
        };
        Some(kind)
    }

    /// Fixed source text of punctuation and keywords
    pub fn text(self) -> Option<&'static str> {
        let text = match self {
            Self::L_BRACE => "{",
            Self::R_BRACE => "}",
            Self::L_PAREN => "(",
            Self::R_PAREN => ")",
            Self::L_BRACKET => "[",
            Self::R_BRACKET => "]",
            Self::DOT => ".",
            Self::DOT_DOT_DOT => "...",
            Self::SEMICOLON => ";",
            Self::COMMA => ",",
            Self::LT => "<",
            Self::GT => ">",
            Self::LT_EQ => "<=",
            Self::GT_EQ => ">=",
            Self::EQ_EQ => "==",
            Self::BANG_EQ => "!=",
            Self::EQ_EQ_EQ => "===",
            Self::BANG_EQ_EQ => "!==",
            Self::FAT_ARROW => "=>",
            Self::PLUS => "+",
            Self::MINUS => "-",
            Self::STAR => "*",
            Self::SLASH => "/",
            Self::PERCENT => "%",
            Self::PLUS_PLUS => "++",
            Self::MINUS_MINUS => "--",
            Self::SHL => "<<",
            Self::SHR => ">>",
            Self::USHR => ">>>",
            Self::AMP => "&",
            Self::PIPE => "|",
            Self::CARET => "^",
            Self::BANG => "!",
            Self::TILDE => "~",
            Self::AMP_AMP => "&&",
            Self::PIPE_PIPE => "||",
            Self::QUESTION => "?",
            Self::COLON => ":",
            Self::EQ => "=",
            Self::PLUS_EQ => "+=",
            Self::MINUS_EQ => "-=",
            Self::STAR_EQ => "*=",
            Self::SLASH_EQ => "/=",
            Self::PERCENT_EQ => "%=",
            Self::SHL_EQ => "<<=",
            Self::SHR_EQ => ">>=",
            Self::USHR_EQ => ">>>=",
            Self::AMP_EQ => "&=",
            Self::PIPE_EQ => "|=",
            Self::CARET_EQ => "^=",
            Self::BREAK_KW => "break",
            Self::CASE_KW => "case",
            Self::CATCH_KW => "catch",
            Self::CLASS_KW => "class",
            Self::CONST_KW => "const",
            Self::CONTINUE_KW => "continue",
            Self::DEBUGGER_KW => "debugger",
            Self::DEFAULT_KW => "default",
            Self::DELETE_KW => "delete",
            Self::DO_KW => "do",
            Self::ELSE_KW => "else",
            Self::ENUM_KW => "enum",
            Self::EXPORT_KW => "export",
            Self::EXTENDS_KW => "extends",
            Self::FALSE_KW => "false",
            Self::FINALLY_KW => "finally",
            Self::FOR_KW => "for",
            Self::FUNCTION_KW => "function",
            Self::IF_KW => "if",
            Self::IMPORT_KW => "import",
            Self::IN_KW => "in",
            Self::INSTANCEOF_KW => "instanceof",
            Self::NEW_KW => "new",
            Self::NULL_KW => "null",
            Self::RETURN_KW => "return",
            Self::SUPER_KW => "super",
            Self::SWITCH_KW => "switch",
            Self::THIS_KW => "this",
            Self::THROW_KW => "throw",
            Self::TRUE_KW => "true",
            Self::TRY_KW => "try",
            Self::TYPEOF_KW => "typeof",
            Self::VAR_KW => "var",
            Self::VOID_KW => "void",
            Self::WHILE_KW => "while",
            Self::WITH_KW => "with",
            Self::IMPLEMENTS_KW => "implements",
            Self::INTERFACE_KW => "interface",
            Self::LET_KW => "let",
            Self::PACKAGE_KW => "package",
            Self::PRIVATE_KW => "private",
            Self::PROTECTED_KW => "protected",
            Self::PUBLIC_KW => "public",
            Self::STATIC_KW => "static",
            Self::YIELD_KW => "yield",
            Self::ANY_KW => "any",
            Self::BOOLEAN_KW => "boolean",
            Self::CONSTRUCTOR_KW => "constructor",
            Self::DECLARE_KW => "declare",
            Self::GET_KW => "get",
            Self::MODULE_KW => "module",
            Self::NUMBER_KW => "number",
            Self::REQUIRE_KW => "require",
            Self::SET_KW => "set",
            Self::STRING_KW => "string",
            Self::TYPE_KW => "type",
            _ => return None,
        };
        Some(text)
    }

    /// How the kind is named in "expected" diagnostics
    pub fn describe(self) -> String {
        match self {
            Self::IDENT => "Identifier".to_string(),
            Self::NUMBER => "Numeric literal".to_string(),
            Self::STRING => "String literal".to_string(),
            Self::EOF => "end of file".to_string(),
            _ => match self.text() {
                Some(text) => format!("'{}'", text),
                None => format!("{:?}", self),
            },
        }
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeFrontLanguage {}

impl rowan::Language for TypeFrontLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<TypeFrontLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<TypeFrontLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<TypeFrontLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<TypeFrontLanguage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_round_trips_through_text() {
        for raw in (SyntaxKind::BREAK_KW as u16)..=(SyntaxKind::TYPE_KW as u16) {
            let kind = SyntaxKind::from(rowan::SyntaxKind(raw));
            let text = kind.text().unwrap();
            assert_eq!(SyntaxKind::from_keyword(text), Some(kind));
        }
    }

    #[test]
    fn contextual_keywords_are_ident_like() {
        assert!(SyntaxKind::MODULE_KW.is_ident_like());
        assert!(SyntaxKind::GET_KW.is_ident_like());
        assert!(!SyntaxKind::CLASS_KW.is_ident_like());
        assert!(SyntaxKind::CLASS_KW.is_identifier_name());
    }

    #[test]
    fn trivia_kinds() {
        assert!(SyntaxKind::NEWLINE.is_trivia());
        assert!(SyntaxKind::MULTI_LINE_COMMENT.is_trivia());
        assert!(!SyntaxKind::EOF.is_trivia());
    }
}
