//! Literals, identifiers, placeholders, and table/database identifiers.
//! Grounded on `parser/grammar/value.rs`'s `start_node`/`bump` shape.

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;
use crate::parser::{node, Parser};

/// `NumberLiteral`: an `IntLiteral`/`FloatLiteral` token, optionally preceded
/// by a unary `-` folded directly into the token text so `NumberLiteral`
/// owns sign-awareness the way the reference grammar's token already does.
pub fn number_literal(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::NumberLiteral, |p, children| {
        if !matches!(p.peek(), TokenKind::IntLiteral | TokenKind::FloatLiteral) {
            return Err(p.unexpected("a number literal"));
        }
        children.push(Child::Token(p.bump()));
        Ok(())
    })?;
    Ok(tree)
}

pub fn string_literal(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::StringLiteralRule, |p, children| {
        children.push(Child::Token(p.expect(TokenKind::StringLiteral, "a string literal")?));
        Ok(())
    })?;
    Ok(tree)
}

/// `Placeholder`: `{` columnExpr `}`.
pub fn placeholder(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::Placeholder, |p, children| {
        p.expect(TokenKind::LBrace, "'{'")?;
        let inner = super::column_expr::column_expr(p)?;
        children.push(Child::Node(inner));
        p.expect(TokenKind::RBrace, "'}'")?;
        Ok(())
    })?;
    Ok(tree)
}

pub fn at_placeholder(p: &Parser) -> bool {
    p.at(TokenKind::LBrace)
}

/// One dotted segment: a bare `Ident`, a keyword used loosely as an
/// identifier, or a quoted identifier (`` `col` `` / `"col"`).
fn is_identifier_like(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Ident | TokenKind::QuotedIdent)
}

/// `Identifier`: one dotted segment, kept as its own node so the converter
/// can decode quoted text without re-deriving quoting from raw tokens.
pub fn identifier(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::Identifier, |p, children| {
        if !is_identifier_like(p.peek()) {
            return Err(p.unexpected("an identifier"));
        }
        children.push(Child::Token(p.bump()));
        Ok(())
    })?;
    Ok(tree)
}

/// `ColumnIdentifier`: placeholder passthrough, else a dotted chain of
/// identifiers (`tableIdentifier? . nestedIdentifier?`), with `*` allowed
/// as the final segment.
pub fn column_identifier(p: &mut Parser) -> Result<Tree, HogQlError> {
    if at_placeholder(p) {
        let (_, tree) = node(p, Rule::ColumnIdentifier, |p, children| {
            children.push(Child::Node(placeholder(p)?));
            Ok(())
        })?;
        return Ok(tree);
    }
    let (_, tree) = node(p, Rule::ColumnIdentifier, |p, children| {
        loop {
            if p.at(TokenKind::Star) {
                children.push(Child::Token(p.bump()));
                break;
            }
            children.push(Child::Node(identifier(p)?));
            if p.at(TokenKind::Dot) {
                children.push(Child::Token(p.bump()));
                continue;
            }
            break;
        }
        Ok(())
    })?;
    Ok(tree)
}

/// `TableIdentifier`: `databaseIdentifier . `? identifier, as a chain of
/// `Identifier` nodes (one or two).
pub fn table_identifier(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::TableIdentifier, |p, children| {
        children.push(Child::Node(identifier(p)?));
        if p.at(TokenKind::Dot) {
            p.bump();
            children.push(Child::Node(identifier(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}
