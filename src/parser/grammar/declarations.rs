//! Declaration grammar rules: modules, classes, interfaces, enums,
//! functions, type aliases, imports, and the members of class bodies and
//! object types.

use super::statements::{block, statement_list, variable_statement_with};
use super::types::{object_type, type_, type_ref};
use super::{
    call_signature, initializer_opt, name, name_ref, nth_is_property_name, param, param_list,
    property_name, qualified_name, semicolon, type_annotation_opt, type_params_opt,
};
use crate::parser::parser::{CompletedMarker, Marker, Parser};
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::{LanguageVersion, ReuseCategory};

const DECLARATION_STARTS: &[SyntaxKind] = &[
    SyntaxKind::VAR_KW,
    SyntaxKind::FUNCTION_KW,
    SyntaxKind::CLASS_KW,
    SyntaxKind::INTERFACE_KW,
    SyntaxKind::ENUM_KW,
    SyntaxKind::MODULE_KW,
    SyntaxKind::IMPORT_KW,
    SyntaxKind::TYPE_KW,
];

/// Whether the current token begins a declaration. Contextual keywords only
/// count when an identifier follows on the same line.
pub(crate) fn at_declaration(p: &mut Parser) -> bool {
    match p.current() {
        SyntaxKind::FUNCTION_KW
        | SyntaxKind::CLASS_KW
        | SyntaxKind::ENUM_KW
        | SyntaxKind::IMPORT_KW
        | SyntaxKind::EXPORT_KW => true,
        SyntaxKind::DECLARE_KW => {
            !p.nth_has_preceding_newline(1)
                && (DECLARATION_STARTS.contains(&p.nth(1)) || p.nth(1) == SyntaxKind::EXPORT_KW)
        }
        SyntaxKind::MODULE_KW => {
            !p.nth_has_preceding_newline(1)
                && (p.nth(1).is_ident_like() || p.nth(1) == SyntaxKind::STRING)
        }
        SyntaxKind::INTERFACE_KW | SyntaxKind::TYPE_KW => {
            !p.nth_has_preceding_newline(1) && p.nth(1).is_ident_like()
        }
        _ => false,
    }
}

/// Declaration = Modifiers? (VariableStatement | FunctionDecl | ClassDecl
///             | InterfaceDecl | EnumDecl | ModuleDecl | TypeAliasDecl | ImportDecl)
///             | ExportAssignment
pub(crate) fn declaration(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    if p.at(SyntaxKind::EXPORT_KW) && p.nth_at(1, SyntaxKind::EQ) {
        return export_assignment(p, m);
    }

    if p.at_any(&[SyntaxKind::EXPORT_KW, SyntaxKind::DECLARE_KW]) {
        let mods = p.start();
        while p.at_any(&[SyntaxKind::EXPORT_KW, SyntaxKind::DECLARE_KW]) {
            p.bump_any();
        }
        mods.complete(p, SyntaxKind::MODIFIER_LIST);
    }

    match p.current() {
        SyntaxKind::VAR_KW => variable_statement_with(p, m),
        SyntaxKind::FUNCTION_KW => function_decl(p, m),
        SyntaxKind::CLASS_KW => class_decl(p, m),
        SyntaxKind::INTERFACE_KW => interface_decl(p, m),
        SyntaxKind::ENUM_KW => enum_decl(p, m),
        SyntaxKind::MODULE_KW => module_decl(p, m),
        SyntaxKind::TYPE_KW => type_alias_decl(p, m),
        SyntaxKind::IMPORT_KW => import_decl(p, m),
        _ => {
            p.error("Declaration expected.");
            m.complete(p, SyntaxKind::ERROR)
        }
    }
}

/// ExportAssignment = 'export' '=' Identifier ';'
fn export_assignment(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::EXPORT_KW);
    p.bump(SyntaxKind::EQ);
    name_ref(p);
    semicolon(p);
    m.complete(p, SyntaxKind::EXPORT_ASSIGNMENT)
}

/// FunctionDecl = 'function' Name CallSignature (Block | ';')
fn function_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::FUNCTION_KW);
    name(p);
    call_signature(p);
    body_or_semicolon(p);
    m.complete(p, SyntaxKind::FUNCTION_DECL)
}

fn body_or_semicolon(p: &mut Parser) {
    if p.at(SyntaxKind::L_BRACE) {
        block(p);
    } else {
        semicolon(p);
    }
}

// ============================================================================
// Modules
// ============================================================================

/// ModuleDecl = 'module' (QualifiedName | StringLiteral) ModuleBody
fn module_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::MODULE_KW);
    if p.at(SyntaxKind::STRING) {
        let n = p.start();
        p.bump(SyntaxKind::STRING);
        n.complete(p, SyntaxKind::NAME);
    } else {
        qualified_name(p);
    }
    let body = p.start();
    p.expect(SyntaxKind::L_BRACE);
    statement_list(p, &[SyntaxKind::R_BRACE]);
    p.expect(SyntaxKind::R_BRACE);
    body.complete(p, SyntaxKind::MODULE_BODY);
    m.complete(p, SyntaxKind::MODULE_DECL)
}

/// ImportDecl = 'import' Name '=' (ExternalModuleRef | QualifiedName) ';'
fn import_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::IMPORT_KW);
    name(p);
    p.expect(SyntaxKind::EQ);
    if p.at(SyntaxKind::REQUIRE_KW) && p.nth_at(1, SyntaxKind::L_PAREN) {
        let external = p.start();
        p.bump(SyntaxKind::REQUIRE_KW);
        p.bump(SyntaxKind::L_PAREN);
        p.expect(SyntaxKind::STRING);
        p.expect(SyntaxKind::R_PAREN);
        external.complete(p, SyntaxKind::EXTERNAL_MODULE_REF);
    } else {
        qualified_name(p);
    }
    semicolon(p);
    m.complete(p, SyntaxKind::IMPORT_DECL)
}

/// TypeAliasDecl = 'type' Name '=' Type ';'
fn type_alias_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::TYPE_KW);
    name(p);
    p.expect(SyntaxKind::EQ);
    type_(p);
    semicolon(p);
    m.complete(p, SyntaxKind::TYPE_ALIAS_DECL)
}

// ============================================================================
// Enums
// ============================================================================

/// EnumDecl = 'enum' Name '{' EnumMemberList '}'
/// EnumMemberList = (EnumMember (',' EnumMember)* ','?)?
fn enum_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::ENUM_KW);
    name(p);
    p.expect(SyntaxKind::L_BRACE);
    let list = p.start();
    while !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
        let member = p.start();
        property_name(p);
        initializer_opt(p);
        member.complete(p, SyntaxKind::ENUM_MEMBER);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    list.complete(p, SyntaxKind::ENUM_MEMBER_LIST);
    p.expect(SyntaxKind::R_BRACE);
    m.complete(p, SyntaxKind::ENUM_DECL)
}

// ============================================================================
// Classes
// ============================================================================

/// ClassDecl = 'class' Name TypeParams? ExtendsClause? ImplementsClause? ClassBody
fn class_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::CLASS_KW);
    name(p);
    type_params_opt(p);
    heritage_clause(p, SyntaxKind::EXTENDS_KW, SyntaxKind::EXTENDS_CLAUSE);
    heritage_clause(p, SyntaxKind::IMPLEMENTS_KW, SyntaxKind::IMPLEMENTS_CLAUSE);

    let body = p.start();
    p.expect(SyntaxKind::L_BRACE);
    while !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
        let before = p.token_pos();
        class_element(p);
        if p.token_pos() == before && !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
            p.err_and_bump("Unexpected token. A constructor, method, accessor, or property was expected.");
        }
    }
    p.expect(SyntaxKind::R_BRACE);
    body.complete(p, SyntaxKind::CLASS_BODY);
    m.complete(p, SyntaxKind::CLASS_DECL)
}

/// ExtendsClause = 'extends' HeritageList   ImplementsClause = 'implements' HeritageList
fn heritage_clause(p: &mut Parser, keyword: SyntaxKind, kind: SyntaxKind) {
    if !p.at(keyword) {
        return;
    }
    let clause = p.start();
    p.bump(keyword);
    let list = p.start();
    loop {
        type_ref(p);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    list.complete(p, SyntaxKind::HERITAGE_LIST);
    clause.complete(p, kind);
}

fn at_member_modifier(p: &mut Parser) -> bool {
    matches!(
        p.current(),
        SyntaxKind::PUBLIC_KW | SyntaxKind::PRIVATE_KW | SyntaxKind::STATIC_KW
    ) && !p.nth_has_preceding_newline(1)
        && (nth_is_property_name(p, 1) || p.nth_at(1, SyntaxKind::L_BRACKET))
}

/// ClassElement = Modifiers? (Constructor | Accessor | Method | Property | IndexSignature)
pub(crate) fn class_element(p: &mut Parser) {
    if p.try_reuse(ReuseCategory::ClassElement) {
        return;
    }
    if p.at(SyntaxKind::SEMICOLON) {
        p.bump(SyntaxKind::SEMICOLON);
        return;
    }

    let m = p.start();
    let mut has_modifiers = false;
    if at_member_modifier(p) {
        has_modifiers = true;
        let mods = p.start();
        while at_member_modifier(p) {
            p.bump_any();
        }
        mods.complete(p, SyntaxKind::MODIFIER_LIST);
    }

    let done = match p.current() {
        SyntaxKind::CONSTRUCTOR_KW if p.nth_at(1, SyntaxKind::L_PAREN) => {
            p.bump(SyntaxKind::CONSTRUCTOR_KW);
            param_list(p);
            body_or_semicolon(p);
            m.complete(p, SyntaxKind::CONSTRUCTOR_DECL)
        }
        SyntaxKind::GET_KW | SyntaxKind::SET_KW if nth_is_property_name(p, 1) => accessor(p, m),
        SyntaxKind::L_BRACKET => {
            index_signature_body(p);
            semicolon(p);
            m.complete(p, SyntaxKind::INDEX_SIGNATURE)
        }
        kind if has_modifiers
            || kind.is_identifier_name()
            || matches!(kind, SyntaxKind::STRING | SyntaxKind::NUMBER) =>
        {
            property_name(p);
            if p.at_any(&[SyntaxKind::L_PAREN, SyntaxKind::LT]) {
                call_signature(p);
                body_or_semicolon(p);
                m.complete(p, SyntaxKind::METHOD_DECL)
            } else {
                type_annotation_opt(p);
                initializer_opt(p);
                semicolon(p);
                m.complete(p, SyntaxKind::PROPERTY_DECL)
            }
        }
        _ => {
            m.abandon(p);
            return;
        }
    };
    done.mark_reusable(p, ReuseCategory::ClassElement);
}

/// Accessor = ('get' | 'set') PropertyName '(' ParamList ')' TypeAnnotation? Block
fn accessor(p: &mut Parser, m: Marker) -> CompletedMarker {
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
    m.complete(p, kind)
}

/// IndexSignature = '[' Param ']' TypeAnnotation
fn index_signature_body(p: &mut Parser) {
    p.bump(SyntaxKind::L_BRACKET);
    param(p);
    p.expect(SyntaxKind::R_BRACKET);
    if p.at(SyntaxKind::COLON) {
        type_annotation_opt(p);
    } else {
        p.error("Type annotation expected.");
    }
}

// ============================================================================
// Interfaces and object type members
// ============================================================================

/// InterfaceDecl = 'interface' Name TypeParams? ExtendsClause? ObjectType
fn interface_decl(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::INTERFACE_KW);
    name(p);
    type_params_opt(p);
    heritage_clause(p, SyntaxKind::EXTENDS_KW, SyntaxKind::EXTENDS_CLAUSE);
    object_type(p);
    m.complete(p, SyntaxKind::INTERFACE_DECL)
}

/// TypeMember = CallSignature | ConstructSignature | IndexSignature
///            | PropertySignature | MethodSignature
pub(crate) fn type_member(p: &mut Parser) {
    if p.try_reuse(ReuseCategory::TypeMember) {
        return;
    }
    let m = p.start();
    let kind = match p.current() {
        SyntaxKind::L_PAREN | SyntaxKind::LT => {
            call_signature(p);
            SyntaxKind::CALL_SIGNATURE
        }
        SyntaxKind::NEW_KW if p.nth_at(1, SyntaxKind::L_PAREN) || p.nth_at(1, SyntaxKind::LT) => {
            p.bump(SyntaxKind::NEW_KW);
            call_signature(p);
            SyntaxKind::CONSTRUCT_SIGNATURE
        }
        SyntaxKind::L_BRACKET => {
            index_signature_body(p);
            SyntaxKind::INDEX_SIGNATURE
        }
        kind if kind.is_identifier_name() || matches!(kind, SyntaxKind::STRING | SyntaxKind::NUMBER) => {
            property_name(p);
            p.eat(SyntaxKind::QUESTION);
            if p.at_any(&[SyntaxKind::L_PAREN, SyntaxKind::LT]) {
                call_signature(p);
                SyntaxKind::METHOD_SIGNATURE
            } else {
                type_annotation_opt(p);
                SyntaxKind::PROPERTY_SIGNATURE
            }
        }
        _ => {
            m.abandon(p);
            p.err_and_bump("Property or signature expected.");
            return;
        }
    };
    type_member_separator(p);
    let done = m.complete(p, kind);
    done.mark_reusable(p, ReuseCategory::TypeMember);
}

/// Members are separated by `;` or `,`, or by a line break.
fn type_member_separator(p: &mut Parser) {
    if p.eat(SyntaxKind::SEMICOLON) || p.eat(SyntaxKind::COMMA) {
        return;
    }
    if p.at(SyntaxKind::R_BRACE) || p.at_eof() || p.has_preceding_newline() {
        return;
    }
    p.error("';' expected.");
    p.missing(SyntaxKind::SEMICOLON);
}
