//! Statement grammar rules.

use super::declarations;
use super::expressions::{self, expr};
use super::{initializer_opt, name, name_ref, semicolon, type_annotation_opt};
use crate::parser::parser::{CompletedMarker, Marker, Parser};
use crate::parser::syntax_kind::SyntaxKind;
use crate::parser::tree::ReuseCategory;

/// Statement = Declaration | Block | VariableStatement | EmptyStatement
///           | ExpressionStatement | IfStatement | IterationStatement | ...
pub(crate) fn statement(p: &mut Parser) {
    if p.try_reuse(ReuseCategory::Statement) {
        return;
    }
    let done = p.with_no_in(false, statement_inner);
    if let Some(done) = done {
        done.mark_reusable(p, ReuseCategory::Statement);
    }
}

fn statement_inner(p: &mut Parser) -> Option<CompletedMarker> {
    let done = match p.current() {
        SyntaxKind::L_BRACE => block(p),
        SyntaxKind::VAR_KW => variable_statement(p),
        SyntaxKind::SEMICOLON => {
            let m = p.start();
            p.bump(SyntaxKind::SEMICOLON);
            m.complete(p, SyntaxKind::EMPTY_STMT)
        }
        SyntaxKind::IF_KW => if_statement(p),
        SyntaxKind::WHILE_KW => while_statement(p),
        SyntaxKind::DO_KW => do_statement(p),
        SyntaxKind::FOR_KW => for_statement(p),
        SyntaxKind::CONTINUE_KW => jump_statement(p, SyntaxKind::CONTINUE_KW, SyntaxKind::CONTINUE_STMT),
        SyntaxKind::BREAK_KW => jump_statement(p, SyntaxKind::BREAK_KW, SyntaxKind::BREAK_STMT),
        SyntaxKind::RETURN_KW => return_statement(p),
        SyntaxKind::WITH_KW => with_statement(p),
        SyntaxKind::SWITCH_KW => switch_statement(p),
        SyntaxKind::THROW_KW => throw_statement(p),
        SyntaxKind::TRY_KW => try_statement(p),
        SyntaxKind::DEBUGGER_KW => {
            let m = p.start();
            p.bump(SyntaxKind::DEBUGGER_KW);
            semicolon(p);
            m.complete(p, SyntaxKind::DEBUGGER_STMT)
        }
        _ if declarations::at_declaration(p) => declarations::declaration(p),
        kind if kind.is_ident_like() && p.nth_at(1, SyntaxKind::COLON) => labeled_statement(p),
        _ if expressions::at_expression_start(p) => expression_statement(p),
        _ => {
            p.err_and_bump("Declaration or statement expected.");
            return None;
        }
    };
    Some(done)
}

/// Block = '{' Statement* '}'
pub(crate) fn block(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.expect(SyntaxKind::L_BRACE);
    statement_list(p, &[SyntaxKind::R_BRACE]);
    p.expect(SyntaxKind::R_BRACE);
    m.complete(p, SyntaxKind::BLOCK)
}

/// Statements up to one of `terminators` or end of file
pub(crate) fn statement_list(p: &mut Parser, terminators: &[SyntaxKind]) {
    while !p.at_eof() && !p.at_any(terminators) {
        let before = p.token_pos();
        statement(p);
        if p.token_pos() == before && !p.at_eof() && !p.at_any(terminators) {
            p.err_and_bump("Declaration or statement expected.");
        }
    }
}

/// VariableStatement = 'var' VariableDeclList ';'
fn variable_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    variable_statement_with(p, m)
}

/// Modifiers were already consumed into `m`.
pub(crate) fn variable_statement_with(p: &mut Parser, m: Marker) -> CompletedMarker {
    p.bump(SyntaxKind::VAR_KW);
    variable_decl_list(p);
    semicolon(p);
    m.complete(p, SyntaxKind::VARIABLE_STMT)
}

/// VariableDeclList = VariableDecl (',' VariableDecl)*
pub(crate) fn variable_decl_list(p: &mut Parser) {
    let m = p.start();
    loop {
        let decl = p.start();
        name(p);
        type_annotation_opt(p);
        initializer_opt(p);
        decl.complete(p, SyntaxKind::VARIABLE_DECL);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    m.complete(p, SyntaxKind::VARIABLE_DECL_LIST);
}

/// ExpressionStatement = Expression ';'
fn expression_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    expr(p);
    semicolon(p);
    m.complete(p, SyntaxKind::EXPR_STMT)
}

/// '(' Expression ')'
fn paren_condition(p: &mut Parser) {
    p.expect(SyntaxKind::L_PAREN);
    expr(p);
    p.expect(SyntaxKind::R_PAREN);
}

/// IfStatement = 'if' '(' Expression ')' Statement ElseClause?
fn if_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::IF_KW);
    paren_condition(p);
    embedded_statement(p);
    if p.at(SyntaxKind::ELSE_KW) {
        let else_clause = p.start();
        p.bump(SyntaxKind::ELSE_KW);
        embedded_statement(p);
        else_clause.complete(p, SyntaxKind::ELSE_CLAUSE);
    }
    m.complete(p, SyntaxKind::IF_STMT)
}

/// A statement nested in another; must consume something.
fn embedded_statement(p: &mut Parser) {
    if p.at_eof() || p.at(SyntaxKind::R_BRACE) {
        p.error("Statement expected.");
        return;
    }
    statement(p);
}

/// WhileStatement = 'while' '(' Expression ')' Statement
fn while_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::WHILE_KW);
    paren_condition(p);
    embedded_statement(p);
    m.complete(p, SyntaxKind::WHILE_STMT)
}

/// DoStatement = 'do' Statement 'while' '(' Expression ')' ';'?
fn do_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::DO_KW);
    embedded_statement(p);
    p.expect(SyntaxKind::WHILE_KW);
    paren_condition(p);
    p.eat(SyntaxKind::SEMICOLON);
    m.complete(p, SyntaxKind::DO_STMT)
}

/// ForStatement   = 'for' '(' ForInit? ';' Expression? ';' Expression? ')' Statement
/// ForInStatement = 'for' '(' ForInit 'in' Expression ')' Statement
fn for_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::FOR_KW);
    p.expect(SyntaxKind::L_PAREN);

    let mut has_init = false;
    if p.at(SyntaxKind::VAR_KW) {
        p.bump(SyntaxKind::VAR_KW);
        p.with_no_in(true, variable_decl_list);
        has_init = true;
    } else if !p.at(SyntaxKind::SEMICOLON) {
        p.with_no_in(true, expr);
        has_init = true;
    }

    let kind = if has_init && p.at(SyntaxKind::IN_KW) {
        p.bump(SyntaxKind::IN_KW);
        expr(p);
        SyntaxKind::FOR_IN_STMT
    } else {
        p.expect(SyntaxKind::SEMICOLON);
        if !p.at(SyntaxKind::SEMICOLON) {
            expr(p);
        }
        p.expect(SyntaxKind::SEMICOLON);
        if !p.at(SyntaxKind::R_PAREN) {
            expr(p);
        }
        SyntaxKind::FOR_STMT
    };
    p.expect(SyntaxKind::R_PAREN);
    embedded_statement(p);
    m.complete(p, kind)
}

/// BreakStatement = 'break' Label? ';'   ContinueStatement = 'continue' Label? ';'
fn jump_statement(p: &mut Parser, keyword: SyntaxKind, kind: SyntaxKind) -> CompletedMarker {
    let m = p.start();
    p.bump(keyword);
    if p.current().is_ident_like() && !p.has_preceding_newline() {
        name_ref(p);
    }
    semicolon(p);
    m.complete(p, kind)
}

/// ReturnStatement = 'return' Expression? ';'
fn return_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::RETURN_KW);
    if !p.has_preceding_newline()
        && !p.at_any(&[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE, SyntaxKind::EOF])
    {
        expr(p);
    }
    semicolon(p);
    m.complete(p, SyntaxKind::RETURN_STMT)
}

/// WithStatement = 'with' '(' Expression ')' Statement
fn with_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::WITH_KW);
    paren_condition(p);
    embedded_statement(p);
    m.complete(p, SyntaxKind::WITH_STMT)
}

/// SwitchStatement = 'switch' '(' Expression ')' '{' (CaseClause | DefaultClause)* '}'
fn switch_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::SWITCH_KW);
    paren_condition(p);
    p.expect(SyntaxKind::L_BRACE);
    const CLAUSE_END: &[SyntaxKind] = &[SyntaxKind::CASE_KW, SyntaxKind::DEFAULT_KW, SyntaxKind::R_BRACE];
    while !p.at_eof() && !p.at(SyntaxKind::R_BRACE) {
        let clause = p.start();
        let kind = if p.at(SyntaxKind::CASE_KW) {
            p.bump(SyntaxKind::CASE_KW);
            expr(p);
            SyntaxKind::CASE_CLAUSE
        } else if p.at(SyntaxKind::DEFAULT_KW) {
            p.bump(SyntaxKind::DEFAULT_KW);
            SyntaxKind::DEFAULT_CLAUSE
        } else {
            clause.abandon(p);
            p.err_recover("'case' or 'default' expected.", CLAUSE_END);
            continue;
        };
        p.expect(SyntaxKind::COLON);
        statement_list(p, CLAUSE_END);
        clause.complete(p, kind);
    }
    p.expect(SyntaxKind::R_BRACE);
    m.complete(p, SyntaxKind::SWITCH_STMT)
}

/// ThrowStatement = 'throw' Expression ';'
fn throw_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::THROW_KW);
    if p.has_preceding_newline() {
        p.error("Line break not permitted here.");
    }
    expr(p);
    semicolon(p);
    m.complete(p, SyntaxKind::THROW_STMT)
}

/// TryStatement = 'try' Block CatchClause? FinallyClause?
fn try_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    p.bump(SyntaxKind::TRY_KW);
    block(p);
    let mut has_handler = false;
    if p.at(SyntaxKind::CATCH_KW) {
        has_handler = true;
        let catch = p.start();
        p.bump(SyntaxKind::CATCH_KW);
        p.expect(SyntaxKind::L_PAREN);
        name(p);
        p.expect(SyntaxKind::R_PAREN);
        block(p);
        catch.complete(p, SyntaxKind::CATCH_CLAUSE);
    }
    if p.at(SyntaxKind::FINALLY_KW) {
        has_handler = true;
        let finally = p.start();
        p.bump(SyntaxKind::FINALLY_KW);
        block(p);
        finally.complete(p, SyntaxKind::FINALLY_CLAUSE);
    }
    if !has_handler {
        p.error("'catch' or 'finally' expected.");
    }
    m.complete(p, SyntaxKind::TRY_STMT)
}

/// LabeledStatement = Identifier ':' Statement
fn labeled_statement(p: &mut Parser) -> CompletedMarker {
    let m = p.start();
    name(p);
    p.bump(SyntaxKind::COLON);
    embedded_statement(p);
    m.complete(p, SyntaxKind::LABELED_STMT)
}
