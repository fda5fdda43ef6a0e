//! Type grammar rules.

use super::declarations::type_member;
use super::{param_list, qualified_name, type_params_opt};
use crate::parser::parser::{CompletedMarker, Parser};
use crate::parser::syntax_kind::SyntaxKind;

/// Type = FunctionType | ConstructorType | ArrayType | PrimaryType
pub(crate) fn type_(p: &mut Parser) -> CompletedMarker {
    match p.current() {
        SyntaxKind::LT | SyntaxKind::L_PAREN => function_type(p, false),
        SyntaxKind::NEW_KW => function_type(p, true),
        _ => {
            let mut ty = primary_type(p);
            while p.at(SyntaxKind::L_BRACKET)
                && p.nth_at(1, SyntaxKind::R_BRACKET)
                && !p.has_preceding_newline()
            {
                let m = ty.precede(p);
                p.bump(SyntaxKind::L_BRACKET);
                p.bump(SyntaxKind::R_BRACKET);
                ty = m.complete(p, SyntaxKind::ARRAY_TYPE);
            }
            ty
        }
    }
}

/// FunctionType    = TypeParams? '(' ParamList ')' '=>' Type
/// ConstructorType = 'new' FunctionType
fn function_type(p: &mut Parser, constructor: bool) -> CompletedMarker {
    let m = p.start();
    if constructor {
        p.bump(SyntaxKind::NEW_KW);
    }
    type_params_opt(p);
    param_list(p);
    p.expect(SyntaxKind::FAT_ARROW);
    type_(p);
    let kind = if constructor {
        SyntaxKind::CONSTRUCTOR_TYPE
    } else {
        SyntaxKind::FUNCTION_TYPE
    };
    m.complete(p, kind)
}

fn primary_type(p: &mut Parser) -> CompletedMarker {
    match p.current() {
        SyntaxKind::ANY_KW
        | SyntaxKind::NUMBER_KW
        | SyntaxKind::STRING_KW
        | SyntaxKind::BOOLEAN_KW
        | SyntaxKind::VOID_KW => {
            let m = p.start();
            p.bump_any();
            m.complete(p, SyntaxKind::PREDEFINED_TYPE)
        }
        SyntaxKind::TYPEOF_KW => {
            let m = p.start();
            p.bump(SyntaxKind::TYPEOF_KW);
            qualified_name(p);
            m.complete(p, SyntaxKind::TYPE_QUERY)
        }
        SyntaxKind::L_BRACE => object_type(p),
        kind if kind.is_ident_like() => type_ref(p),
        _ => {
            p.error("Type expected.");
            let m = p.start();
            let n = p.start();
            p.missing(SyntaxKind::IDENT);
            n.complete(p, SyntaxKind::QUALIFIED_NAME);
            m.complete(p, SyntaxKind::TYPE_REF)
        }
    }
}

/// TypeRef = QualifiedName ('<' TypeArgList '>')?
pub(crate) fn type_ref(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    qualified_name(p);
    if p.at(SyntaxKind::LT) && !p.has_preceding_newline() {
        type_args(p);
    }
    m.complete(p, SyntaxKind::TYPE_REF)
}

/// '<' TypeArgList '>'
pub(crate) fn type_args(p: &mut Parser) {
    p.bump(SyntaxKind::LT);
    let list = p.start();
    loop {
        type_(p);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    list.complete(p, SyntaxKind::TYPE_ARG_LIST);
    p.expect(SyntaxKind::GT);
}

/// ObjectType = '{' TypeMember* '}'
pub(crate) fn object_type(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.expect(SyntaxKind::L_BRACE);
    while !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
        type_member(p);
    }
    p.expect(SyntaxKind::R_BRACE);
    m.complete(p, SyntaxKind::OBJECT_TYPE)
}
