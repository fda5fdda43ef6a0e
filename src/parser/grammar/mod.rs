//! Grammar rules, one function per production.
//!
//! Every function takes the [`Parser`] and leaves behind balanced events.
//! Productions that return `CompletedMarker` let callers wrap the result
//! (binary expressions, array types, calls).
//!
//! Statements, class elements and type members are parsed the same way
//! wherever they occur, which is what lets the incremental parser lift them
//! out of an earlier tree.

mod declarations;
mod expressions;
mod statements;
mod types;

use super::parser::{CompletedMarker, Parser};
use super::syntax_kind::SyntaxKind;

use expressions::assignment_expr;
use statements::statement;
use types::type_;

/// SourceFile = Statement* EOF
pub(crate) fn source_file(p: &mut Parser) {
    let m = p.start();
    while !p.at_eof() {
        let before = p.token_pos();
        statement(p);
        if p.token_pos() == before && !p.at_eof() {
            p.err_and_bump("Declaration or statement expected.");
        }
    }
    p.bump(SyntaxKind::EOF);
    m.complete(p, SyntaxKind::SOURCE_FILE);
}

// ============================================================================
// Names
// ============================================================================

/// Name = Identifier
pub(crate) fn name(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    if p.current().is_ident_like() {
        p.bump_remap(SyntaxKind::IDENT);
    } else {
        p.error("Identifier expected.");
        p.missing(SyntaxKind::IDENT);
    }
    m.complete(p, SyntaxKind::NAME)
}

/// NameRef = Identifier
pub(crate) fn name_ref(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    if p.current().is_ident_like() {
        p.bump_remap(SyntaxKind::IDENT);
    } else {
        p.error("Identifier expected.");
        p.missing(SyntaxKind::IDENT);
    }
    m.complete(p, SyntaxKind::NAME_REF)
}

/// Identifier names after a dot may be reserved words.
pub(crate) fn member_name_ref(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    if p.current().is_identifier_name() {
        p.bump_remap(SyntaxKind::IDENT);
    } else {
        p.error("Identifier expected.");
        p.missing(SyntaxKind::IDENT);
    }
    m.complete(p, SyntaxKind::NAME_REF)
}

pub(crate) fn nth_is_property_name(p: &mut Parser, n: usize) -> bool {
    let kind = p.nth(n);
    kind.is_identifier_name() || matches!(kind, SyntaxKind::STRING | SyntaxKind::NUMBER)
}

/// PropertyName = IdentifierName | StringLiteral | NumericLiteral
pub(crate) fn property_name(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    match p.current() {
        SyntaxKind::STRING => p.bump(SyntaxKind::STRING),
        SyntaxKind::NUMBER => p.bump(SyntaxKind::NUMBER),
        kind if kind.is_identifier_name() => p.bump_remap(SyntaxKind::IDENT),
        _ => {
            p.error("Property name expected.");
            p.missing(SyntaxKind::IDENT);
        }
    }
    m.complete(p, SyntaxKind::NAME)
}

/// QualifiedName = Identifier ('.' IdentifierName)*
pub(crate) fn qualified_name(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    if p.current().is_ident_like() {
        p.bump_remap(SyntaxKind::IDENT);
    } else {
        p.error("Identifier expected.");
        p.missing(SyntaxKind::IDENT);
    }
    while p.at(SyntaxKind::DOT) {
        p.bump(SyntaxKind::DOT);
        if p.current().is_identifier_name() {
            p.bump_remap(SyntaxKind::IDENT);
        } else {
            p.error("Identifier expected.");
            p.missing(SyntaxKind::IDENT);
        }
    }
    m.complete(p, SyntaxKind::QUALIFIED_NAME)
}

// ============================================================================
// Shared pieces
// ============================================================================

/// TypeAnnotation = ':' Type
pub(crate) fn type_annotation_opt(p: &mut Parser) {
    if p.at(SyntaxKind::COLON) {
        let m = p.start();
        p.bump(SyntaxKind::COLON);
        type_(p);
        m.complete(p, SyntaxKind::TYPE_ANNOTATION);
    }
}

/// Initializer = '=' AssignmentExpression
pub(crate) fn initializer_opt(p: &mut Parser) {
    if p.eat(SyntaxKind::EQ) {
        assignment_expr(p);
    }
}

/// '<' TypeParamList '>'
pub(crate) fn type_params_opt(p: &mut Parser) {
    if !p.at(SyntaxKind::LT) {
        return;
    }
    p.bump(SyntaxKind::LT);
    let m = p.start();
    loop {
        let param = p.start();
        name(p);
        if p.eat(SyntaxKind::EXTENDS_KW) {
            type_(p);
        }
        param.complete(p, SyntaxKind::TYPE_PARAM);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    m.complete(p, SyntaxKind::TYPE_PARAM_LIST);
    p.expect(SyntaxKind::GT);
}

/// '(' ParamList ')'
pub(crate) fn param_list(p: &mut Parser) {
    p.expect(SyntaxKind::L_PAREN);
    let m = p.start();
    if !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
        loop {
            param(p);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    }
    m.complete(p, SyntaxKind::PARAM_LIST);
    p.expect(SyntaxKind::R_PAREN);
}

fn at_param_modifier(p: &mut Parser) -> bool {
    matches!(p.current(), SyntaxKind::PUBLIC_KW | SyntaxKind::PRIVATE_KW)
        && (p.nth(1).is_ident_like() || p.nth(1) == SyntaxKind::DOT_DOT_DOT)
}

/// Param = ('public' | 'private')? '...'? Name '?'? TypeAnnotation? Initializer?
pub(crate) fn param(p: &mut Parser) {
    let m = p.start();
    if at_param_modifier(p) {
        let mods = p.start();
        p.bump_any();
        mods.complete(p, SyntaxKind::MODIFIER_LIST);
    }
    p.eat(SyntaxKind::DOT_DOT_DOT);
    name(p);
    p.eat(SyntaxKind::QUESTION);
    type_annotation_opt(p);
    initializer_opt(p);
    m.complete(p, SyntaxKind::PARAM);
}

/// CallSignature = TypeParams? '(' ParamList ')' TypeAnnotation?
pub(crate) fn call_signature(p: &mut Parser) {
    type_params_opt(p);
    param_list(p);
    type_annotation_opt(p);
}

/// '(' ArgList ')'
pub(crate) fn arg_list(p: &mut Parser) {
    p.expect(SyntaxKind::L_PAREN);
    let m = p.start();
    p.with_no_in(false, |p| {
        if !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
            loop {
                assignment_expr(p);
                if !p.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
        }
    });
    m.complete(p, SyntaxKind::ARG_LIST);
    p.expect(SyntaxKind::R_PAREN);
}

/// Automatic semicolon insertion: `;`, or a line break, `}` or end of file.
pub(crate) fn semicolon(p: &mut Parser) {
    if p.eat(SyntaxKind::SEMICOLON) {
        return;
    }
    if p.at(SyntaxKind::R_BRACE) || p.at_eof() || p.has_preceding_newline() {
        return;
    }
    p.error("';' expected.");
    p.missing(SyntaxKind::SEMICOLON);
}
