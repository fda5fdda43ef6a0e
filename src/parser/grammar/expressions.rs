//! Expression grammar rules.
//!
//! Binary operators use precedence climbing. `>` is always scanned as a
//! single character; in operator position it is rescanned so `>=`, `>>`,
//! `>>>` and the matching assignments come out whole.

use super::statements::block;
use super::types::{type_, type_args};
use super::{
    arg_list, call_signature, member_name_ref, name, name_ref, nth_is_property_name, param_list,
    property_name, type_annotation_opt, type_params_opt,
};
use crate::parser::parser::{CompletedMarker, Parser};
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::LanguageVersion;

/// Tokens an erroneous primary expression leaves alone so an enclosing
/// production can resynchronize.
const EXPR_RECOVERY: &[SyntaxKind] = &[
    SyntaxKind::SEMICOLON,
    SyntaxKind::COMMA,
    SyntaxKind::COLON,
    SyntaxKind::R_BRACE,
    SyntaxKind::R_PAREN,
    SyntaxKind::R_BRACKET,
    SyntaxKind::EOF,
    SyntaxKind::VAR_KW,
    SyntaxKind::IF_KW,
    SyntaxKind::FOR_KW,
    SyntaxKind::WHILE_KW,
    SyntaxKind::DO_KW,
    SyntaxKind::RETURN_KW,
    SyntaxKind::BREAK_KW,
    SyntaxKind::CONTINUE_KW,
    SyntaxKind::SWITCH_KW,
    SyntaxKind::THROW_KW,
    SyntaxKind::TRY_KW,
    SyntaxKind::CLASS_KW,
    SyntaxKind::ENUM_KW,
    SyntaxKind::EXPORT_KW,
    SyntaxKind::IMPORT_KW,
];

pub(crate) fn at_expression_start(p: &mut Parser) -> bool {
    let kind = p.current();
    kind.is_ident_like()
        || matches!(
            kind,
            SyntaxKind::NUMBER
                | SyntaxKind::STRING
                | SyntaxKind::THIS_KW
                | SyntaxKind::SUPER_KW
                | SyntaxKind::TRUE_KW
                | SyntaxKind::FALSE_KW
                | SyntaxKind::NULL_KW
                | SyntaxKind::L_PAREN
                | SyntaxKind::L_BRACKET
                | SyntaxKind::L_BRACE
                | SyntaxKind::FUNCTION_KW
                | SyntaxKind::NEW_KW
                | SyntaxKind::DELETE_KW
                | SyntaxKind::VOID_KW
                | SyntaxKind::TYPEOF_KW
                | SyntaxKind::PLUS_PLUS
                | SyntaxKind::MINUS_MINUS
                | SyntaxKind::PLUS
                | SyntaxKind::MINUS
                | SyntaxKind::TILDE
                | SyntaxKind::BANG
                | SyntaxKind::LT
                | SyntaxKind::SLASH
                | SyntaxKind::SLASH_EQ
        )
}

/// Expression = AssignmentExpression (',' AssignmentExpression)*
pub(crate) fn expr(p: &mut Parser) -> CompletedMarker {
    let mut lhs = assignment_expr(p);
    while p.at(SyntaxKind::COMMA) {
        let m = lhs.precede(p);
        p.bump(SyntaxKind::COMMA);
        assignment_expr(p);
        lhs = m.complete(p, SyntaxKind::BINARY_EXPR);
    }
    lhs
}

/// AssignmentExpression = ArrowFunction
///                      | ConditionalExpression (AssignmentOp AssignmentExpression)?
pub(crate) fn assignment_expr(p: &mut Parser) -> CompletedMarker {
    if let Some(arrow) = arrow_function_opt(p) {
        return arrow;
    }
    let lhs = conditional_expr(p);
    if p.current().is_assignment_op() {
        let m = lhs.precede(p);
        p.bump_any();
        assignment_expr(p);
        return m.complete(p, SyntaxKind::BINARY_EXPR);
    }
    lhs
}

// ============================================================================
// Arrow functions
// ============================================================================

fn arrow_function_opt(p: &mut Parser) -> Option<CompletedMarker> {
    let kind = p.current();
    if kind.is_ident_like() && p.nth_at(1, SyntaxKind::FAT_ARROW) {
        let m = p.start();
        let list = p.start();
        let param = p.start();
        name(p);
        param.complete(p, SyntaxKind::PARAM);
        list.complete(p, SyntaxKind::PARAM_LIST);
        p.bump(SyntaxKind::FAT_ARROW);
        arrow_body(p);
        return Some(m.complete(p, SyntaxKind::ARROW_FUNCTION));
    }

    if !matches!(kind, SyntaxKind::L_PAREN | SyntaxKind::LT) {
        return None;
    }
    let is_arrow = p.lookahead(|p| {
        let start = p.event_count();
        type_params_opt(p);
        param_list(p);
        type_annotation_opt(p);
        p.at(SyntaxKind::FAT_ARROW) && !p.errors_since(start)
    });
    if !is_arrow {
        return None;
    }
    let m = p.start();
    type_params_opt(p);
    param_list(p);
    type_annotation_opt(p);
    p.bump(SyntaxKind::FAT_ARROW);
    arrow_body(p);
    Some(m.complete(p, SyntaxKind::ARROW_FUNCTION))
}

fn arrow_body(p: &mut Parser) {
    if p.at(SyntaxKind::L_BRACE) {
        block(p);
    } else {
        assignment_expr(p);
    }
}

// ============================================================================
// Operators
// ============================================================================

/// ConditionalExpression = BinaryExpression ('?' AssignmentExpression ':' AssignmentExpression)?
fn conditional_expr(p: &mut Parser) -> CompletedMarker {
    let cond = binary_expr(p, 0);
    if !p.at(SyntaxKind::QUESTION) {
        return cond;
    }
    let m = cond.precede(p);
    p.bump(SyntaxKind::QUESTION);
    p.with_no_in(false, assignment_expr);
    p.expect(SyntaxKind::COLON);
    assignment_expr(p);
    m.complete(p, SyntaxKind::CONDITIONAL_EXPR)
}

fn binary_precedence(kind: SyntaxKind, no_in: bool) -> Option<u8> {
    let prec = match kind {
        SyntaxKind::PIPE_PIPE => 1,
        SyntaxKind::AMP_AMP => 2,
        SyntaxKind::PIPE => 3,
        SyntaxKind::CARET => 4,
        SyntaxKind::AMP => 5,
        SyntaxKind::EQ_EQ | SyntaxKind::BANG_EQ | SyntaxKind::EQ_EQ_EQ | SyntaxKind::BANG_EQ_EQ => 6,
        SyntaxKind::LT
        | SyntaxKind::GT
        | SyntaxKind::LT_EQ
        | SyntaxKind::GT_EQ
        | SyntaxKind::INSTANCEOF_KW => 7,
        SyntaxKind::IN_KW if !no_in => 7,
        SyntaxKind::SHL | SyntaxKind::SHR | SyntaxKind::USHR => 8,
        SyntaxKind::PLUS | SyntaxKind::MINUS => 9,
        SyntaxKind::STAR | SyntaxKind::SLASH | SyntaxKind::PERCENT => 10,
        _ => return None,
    };
    Some(prec)
}

/// Left-associative binary operators above `min_prec`.
fn binary_expr(p: &mut Parser, min_prec: u8) -> CompletedMarker {
    let mut lhs = unary_expr(p);
    loop {
        let op = p.rescan_greater();
        let Some(prec) = binary_precedence(op, p.no_in()) else {
            break;
        };
        if prec <= min_prec {
            break;
        }
        let m = lhs.precede(p);
        p.bump_any();
        binary_expr(p, prec);
        lhs = m.complete(p, SyntaxKind::BINARY_EXPR);
    }
    lhs
}

/// UnaryExpression = PrefixOp UnaryExpression | '<' Type '>' UnaryExpression | PostfixExpression
fn unary_expr(p: &mut Parser) -> CompletedMarker {
    match p.current() {
        SyntaxKind::DELETE_KW
        | SyntaxKind::VOID_KW
        | SyntaxKind::TYPEOF_KW
        | SyntaxKind::PLUS_PLUS
        | SyntaxKind::MINUS_MINUS
        | SyntaxKind::PLUS
        | SyntaxKind::MINUS
        | SyntaxKind::TILDE
        | SyntaxKind::BANG => {
            let m = p.start();
            p.bump_any();
            unary_expr(p);
            m.complete(p, SyntaxKind::PREFIX_EXPR)
        }
        SyntaxKind::LT => {
            let m = p.start();
            p.bump(SyntaxKind::LT);
            type_(p);
            p.expect(SyntaxKind::GT);
            unary_expr(p);
            m.complete(p, SyntaxKind::TYPE_ASSERTION)
        }
        _ => postfix_expr(p),
    }
}

/// PostfixExpression = LeftHandSideExpression ('++' | '--')?
fn postfix_expr(p: &mut Parser) -> CompletedMarker {
    let operand = lhs_expr(p);
    if p.at_any(&[SyntaxKind::PLUS_PLUS, SyntaxKind::MINUS_MINUS]) && !p.has_preceding_newline() {
        let m = operand.precede(p);
        p.bump_any();
        return m.complete(p, SyntaxKind::POSTFIX_EXPR);
    }
    operand
}

// ============================================================================
// Calls and member access
// ============================================================================

/// LeftHandSideExpression = (NewExpression | PrimaryExpression) (Member | Index | Call)*
fn lhs_expr(p: &mut Parser) -> CompletedMarker {
    let mut lhs = if p.at(SyntaxKind::NEW_KW) {
        new_expr(p)
    } else {
        primary_expr(p)
    };
    loop {
        if let Some(access) = member_suffix_opt(p, lhs) {
            lhs = access;
            continue;
        }
        match p.current() {
            SyntaxKind::L_PAREN => {
                let m = lhs.precede(p);
                arg_list(p);
                lhs = m.complete(p, SyntaxKind::CALL_EXPR);
            }
            SyntaxKind::LT if at_call_type_args(p) => {
                let m = lhs.precede(p);
                type_args(p);
                arg_list(p);
                lhs = m.complete(p, SyntaxKind::CALL_EXPR);
            }
            _ => break,
        }
    }
    lhs
}

/// `.name` or `[index]` after `lhs`
fn member_suffix_opt(p: &mut Parser, lhs: CompletedMarker) -> Option<CompletedMarker> {
    match p.current() {
        SyntaxKind::DOT => {
            let m = lhs.precede(p);
            p.bump(SyntaxKind::DOT);
            member_name_ref(p);
            Some(m.complete(p, SyntaxKind::MEMBER_EXPR))
        }
        SyntaxKind::L_BRACKET => {
            let m = lhs.precede(p);
            p.bump(SyntaxKind::L_BRACKET);
            p.with_no_in(false, expr);
            p.expect(SyntaxKind::R_BRACKET);
            Some(m.complete(p, SyntaxKind::INDEX_EXPR))
        }
        _ => None,
    }
}

/// `<` starts type arguments only if they parse cleanly and a call follows.
fn at_call_type_args(p: &mut Parser) -> bool {
    p.lookahead(|p| {
        let start = p.event_count();
        type_args(p);
        !p.errors_since(start) && p.at(SyntaxKind::L_PAREN)
    })
}

/// NewExpression = 'new' MemberExpression TypeArgs? Arguments?
fn new_expr(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::NEW_KW);
    let mut callee = if p.at(SyntaxKind::NEW_KW) {
        new_expr(p)
    } else {
        primary_expr(p)
    };
    while let Some(access) = member_suffix_opt(p, callee) {
        callee = access;
    }
    if p.at(SyntaxKind::LT) && at_call_type_args(p) {
        type_args(p);
    }
    if p.at(SyntaxKind::L_PAREN) {
        arg_list(p);
    }
    m.complete(p, SyntaxKind::NEW_EXPR)
}

// ============================================================================
// Primary expressions
// ============================================================================

fn primary_expr(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    let kind = match p.current() {
        SyntaxKind::THIS_KW => {
            p.bump(SyntaxKind::THIS_KW);
            SyntaxKind::THIS_EXPR
        }
        SyntaxKind::SUPER_KW => {
            p.bump(SyntaxKind::SUPER_KW);
            SyntaxKind::SUPER_EXPR
        }
        SyntaxKind::NUMBER
        | SyntaxKind::STRING
        | SyntaxKind::TRUE_KW
        | SyntaxKind::FALSE_KW
        | SyntaxKind::NULL_KW => {
            p.bump_any();
            SyntaxKind::LITERAL
        }
        SyntaxKind::SLASH | SyntaxKind::SLASH_EQ => {
            p.rescan_slash();
            p.bump_any();
            SyntaxKind::LITERAL
        }
        kind if kind.is_ident_like() => {
            m.abandon(p);
            return name_ref(p);
        }
        SyntaxKind::L_PAREN => {
            p.bump(SyntaxKind::L_PAREN);
            p.with_no_in(false, expr);
            p.expect(SyntaxKind::R_PAREN);
            SyntaxKind::PAREN_EXPR
        }
        SyntaxKind::L_BRACKET => {
            array_literal_body(p);
            SyntaxKind::ARRAY_LITERAL
        }
        SyntaxKind::L_BRACE => {
            object_literal_body(p);
            SyntaxKind::OBJECT_LITERAL
        }
        SyntaxKind::FUNCTION_KW => {
            p.bump(SyntaxKind::FUNCTION_KW);
            if p.current().is_ident_like() {
                name(p);
            }
            call_signature(p);
            block(p);
            SyntaxKind::FUNCTION_EXPR
        }
        _ => {
            p.error("Expression expected.");
            if !p.at_any(EXPR_RECOVERY) {
                p.bump_any();
            }
            SyntaxKind::ERROR
        }
    };
    m.complete(p, kind)
}

/// ArrayLiteral = '[' (Element? ',')* Element? ']'
fn array_literal_body(p: &mut Parser) {
    p.bump(SyntaxKind::L_BRACKET);
    p.with_no_in(false, |p| {
        while !p.at_eof() && !p.at(SyntaxKind::R_BRACKET) {
            if p.at(SyntaxKind::COMMA) {
                let hole = p.start();
                hole.complete(p, SyntaxKind::OMITTED_EXPR);
                p.bump(SyntaxKind::COMMA);
                continue;
            }
            assignment_expr(p);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    });
    p.expect(SyntaxKind::R_BRACKET);
}

/// ObjectLiteral = '{' (PropertyAssignment (',' PropertyAssignment)* ','?)? '}'
fn object_literal_body(p: &mut Parser) {
    p.bump(SyntaxKind::L_BRACE);
    p.with_no_in(false, |p| {
        while !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
            property_assignment(p);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    });
    p.expect(SyntaxKind::R_BRACE);
}

/// PropertyAssignment = PropertyName ':' AssignmentExpression
///                    | ('get' | 'set') PropertyName '(' ParamList ')' TypeAnnotation? Block
fn property_assignment(p: &mut Parser) {
    let m = p.start();
    if matches!(p.current(), SyntaxKind::GET_KW | SyntaxKind::SET_KW) && nth_is_property_name(p, 1) {
        let kind = if p.at(SyntaxKind::GET_KW) {
            SyntaxKind::GET_ACCESSOR
        } else {
            SyntaxKind::SET_ACCESSOR
        };
        if p.options().language_version == LanguageVersion::Es3 {
            p.error("Accessors are only available when targeting ECMAScript 5 and higher.");
        }
        p.bump_any();
        property_name(p);
        param_list(p);
        type_annotation_opt(p);
        block(p);
        m.complete(p, kind);
        return;
    }
    property_name(p);
    p.expect(SyntaxKind::COLON);
    assignment_expr(p);
    m.complete(p, SyntaxKind::PROPERTY_ASSIGNMENT);
}

#[cfg(test)]
mod tests {
    use super::binary_precedence;
    use crate::parser::syntax_kind::SyntaxKind;

    #[test]
    fn test_multiplicative_binds_tighter_than_additive() {
        let mul = binary_precedence(SyntaxKind::STAR, false).unwrap();
        let add = binary_precedence(SyntaxKind::PLUS, false).unwrap();
        assert!(mul > add);
    }

    #[test]
    fn test_in_is_not_an_operator_in_for_initializer() {
        assert_eq!(binary_precedence(SyntaxKind::IN_KW, true), None);
        assert_eq!(binary_precedence(SyntaxKind::IN_KW, false), Some(7));
    }
}
