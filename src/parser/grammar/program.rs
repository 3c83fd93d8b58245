//! The imperative sub-language: declarations, control flow, functions,
//! try/catch (spec §3's `Program`/`Block`/`*Statement`/`Function` rows).

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;
use crate::parser::grammar::column_expr;
use crate::parser::{node, Parser};

pub fn program(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::Program, |p, children| {
        while !p.at(TokenKind::Eof) {
            children.push(Child::Node(statement(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn block(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::Block, |p, children| {
        p.expect(TokenKind::LBrace, "'{'")?;
        while !p.at(TokenKind::RBrace) {
            children.push(Child::Node(statement(p)?));
        }
        p.expect(TokenKind::RBrace, "'}'")?;
        Ok(())
    })?;
    Ok(tree)
}

fn statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let _guard = p.enter()?;
    match p.peek() {
        TokenKind::LBrace => block(p),
        TokenKind::Let => var_decl(p),
        TokenKind::If => if_statement(p),
        TokenKind::While => while_statement(p),
        TokenKind::For => for_or_for_in_statement(p),
        TokenKind::Try => try_catch_statement(p),
        TokenKind::Fn => function_decl(p),
        TokenKind::Return => return_or_throw(p, Rule::ReturnStatement, TokenKind::Return),
        TokenKind::Throw => return_or_throw(p, Rule::ThrowStatement, TokenKind::Throw),
        TokenKind::Semicolon => {
            let (_, tree) = node(p, Rule::ExprStatement, |p, _children| {
                p.bump();
                Ok(())
            })?;
            Ok(tree)
        }
        _ => expr_statement_or_assignment(p),
    }
}

fn var_decl(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::VarDecl, |p, children| {
        p.expect(TokenKind::Let, "LET")?;
        children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
        if p.at(TokenKind::ColonColon) {
            p.bump();
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        end_statement(p)?;
        Ok(())
    })?;
    Ok(tree)
}

fn expr_statement_or_assignment(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::Semicolon) || p.at(TokenKind::RBrace) || p.at(TokenKind::Eof) {
        let (_, tree) = node(p, Rule::ExprStatement, |p, _children| {
            if p.at(TokenKind::Semicolon) {
                p.bump();
            }
            Ok(())
        })?;
        return Ok(tree);
    }
    let start = p.pos_checkpoint();
    let first = column_expr::column_expr(p)?;
    if p.at(TokenKind::ColonColon) {
        p.bump();
        let right = column_expr::column_expr(p)?;
        end_statement(p)?;
        let end = p.last_consumed_end();
        return Ok(Tree {
            rule: Rule::VarAssignment,
            span: crate::span::Span::new(start, end),
            children: vec![Child::Node(first), Child::Node(right)],
        });
    }
    end_statement(p)?;
    let end = p.last_consumed_end();
    Ok(Tree {
        rule: Rule::ExprStatement,
        span: crate::span::Span::new(start, end),
        children: vec![Child::Node(first)],
    })
}

fn end_statement(p: &mut Parser) -> Result<(), HogQlError> {
    if p.at(TokenKind::Semicolon) {
        p.bump();
    }
    Ok(())
}

fn return_or_throw(p: &mut Parser, rule: Rule, kw: TokenKind) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, rule, |p, children| {
        p.expect(kw, "a statement keyword")?;
        if !p.at(TokenKind::Semicolon) && !p.at(TokenKind::RBrace) {
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        end_statement(p)?;
        Ok(())
    })?;
    Ok(tree)
}

fn if_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::IfStatement, |p, children| {
        p.expect(TokenKind::If, "IF")?;
        p.expect(TokenKind::LParen, "'('")?;
        children.push(Child::Node(column_expr::column_expr(p)?));
        p.expect(TokenKind::RParen, "')'")?;
        children.push(Child::Node(statement(p)?));
        if p.at(TokenKind::Else) {
            p.bump();
            children.push(Child::Node(statement(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn while_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WhileStatement, |p, children| {
        p.expect(TokenKind::While, "WHILE")?;
        p.expect(TokenKind::LParen, "'('")?;
        children.push(Child::Node(column_expr::column_expr(p)?));
        p.expect(TokenKind::RParen, "')'")?;
        if !p.at(TokenKind::Semicolon) {
            children.push(Child::Node(statement(p)?));
        } else {
            p.bump();
        }
        Ok(())
    })?;
    Ok(tree)
}

/// Disambiguates `ForStatement` (C-style, three `;`-separated clauses) from
/// `ForInStatement` (`for (x in expr)` / `for (k, v in expr)`) by scanning
/// for a top-level `IN` keyword before the closing paren's matching `;`.
fn for_or_for_in_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let is_for_in = looks_like_for_in(p);
    if is_for_in {
        for_in_statement(p)
    } else {
        for_statement(p)
    }
}

fn looks_like_for_in(p: &Parser) -> bool {
    // `for ( ident (',' ident)? in ...` — a for-in never starts its first
    // clause with `let`/an expression containing `;`.
    p.peek_n(1) == TokenKind::LParen
        && matches!(p.peek_n(2), TokenKind::Ident)
        && matches!(p.peek_n(3), TokenKind::In | TokenKind::Comma)
}

fn for_in_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ForInStatement, |p, children| {
        p.expect(TokenKind::For, "FOR")?;
        p.expect(TokenKind::LParen, "'('")?;
        let first = crate::parser::grammar::literal::identifier(p)?;
        if p.at(TokenKind::Comma) {
            p.bump();
            children.push(Child::Node(first));
            children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
        } else {
            children.push(Child::Node(first));
        }
        p.expect(TokenKind::In, "IN")?;
        children.push(Child::Node(column_expr::column_expr(p)?));
        p.expect(TokenKind::RParen, "')'")?;
        children.push(Child::Node(statement(p)?));
        Ok(())
    })?;
    Ok(tree)
}

/// The two `;` separators are kept as children (rather than just consumed)
/// so the converter has unambiguous markers for which of the three optional
/// clauses — initializer, condition, increment — is present.
fn for_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ForStatement, |p, children| {
        p.expect(TokenKind::For, "FOR")?;
        p.expect(TokenKind::LParen, "'('")?;
        if !p.at(TokenKind::Semicolon) {
            children.push(Child::Node(for_clause_statement(p)?));
        }
        children.push(Child::Token(p.expect(TokenKind::Semicolon, "';'")?));
        if !p.at(TokenKind::Semicolon) {
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        children.push(Child::Token(p.expect(TokenKind::Semicolon, "';'")?));
        if !p.at(TokenKind::RParen) {
            children.push(Child::Node(for_clause_statement(p)?));
        }
        p.expect(TokenKind::RParen, "')'")?;
        children.push(Child::Node(statement(p)?));
        Ok(())
    })?;
    Ok(tree)
}

/// A bare initializer/increment clause inside `for (…)`: a `let` binding or
/// a plain assignment/expression, without the trailing `;` a full
/// statement would consume.
fn for_clause_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::Let) {
        let (_, tree) = node(p, Rule::VarDecl, |p, children| {
            p.bump();
            children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
            if p.at(TokenKind::ColonColon) {
                p.bump();
                children.push(Child::Node(column_expr::column_expr(p)?));
            }
            Ok(())
        })?;
        return Ok(tree);
    }
    let start = p.pos_checkpoint();
    let first = column_expr::column_expr(p)?;
    if p.at(TokenKind::ColonColon) {
        p.bump();
        let right = column_expr::column_expr(p)?;
        let end = p.last_consumed_end();
        return Ok(Tree {
            rule: Rule::VarAssignment,
            span: crate::span::Span::new(start, end),
            children: vec![Child::Node(first), Child::Node(right)],
        });
    }
    let end = p.last_consumed_end();
    Ok(Tree {
        rule: Rule::ExprStatement,
        span: crate::span::Span::new(start, end),
        children: vec![Child::Node(first)],
    })
}

fn try_catch_statement(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::TryCatchStatement, |p, children| {
        p.expect(TokenKind::Try, "TRY")?;
        children.push(Child::Node(block(p)?));
        while p.at(TokenKind::Catch) {
            children.push(Child::Node(catch_block(p)?));
        }
        if p.at(TokenKind::Finally) {
            p.bump();
            children.push(Child::Node(block(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn catch_block(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::CatchBlock, |p, children| {
        p.expect(TokenKind::Catch, "CATCH")?;
        if p.at(TokenKind::LParen) {
            p.bump();
            if matches!(p.peek(), TokenKind::Ident) {
                children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
                if p.at(TokenKind::Colon) {
                    p.bump();
                    children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
                }
            }
            p.expect(TokenKind::RParen, "')'")?;
        }
        children.push(Child::Node(block(p)?));
        Ok(())
    })?;
    Ok(tree)
}

fn function_decl(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::FunctionDecl, |p, children| {
        p.expect(TokenKind::Fn, "FN")?;
        children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
        p.expect(TokenKind::LParen, "'('")?;
        while matches!(p.peek(), TokenKind::Ident) {
            children.push(Child::Node(crate::parser::grammar::literal::identifier(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        p.expect(TokenKind::RParen, "')'")?;
        children.push(Child::Node(block(p)?));
        Ok(())
    })?;
    Ok(tree)
}
