//! HogQLX tag elements: `<Kind attr=value …>children</Kind>` / `<Kind … />`.
//!
//! Simplification versus the reference grammar: free-running text between
//! tags is lexed as an ordinary quoted string rather than raw character
//! data, since this lexer (unlike the ANTLR-generated one) has no lexer-mode
//! switch for "inside tag body, not inside a nested tag or placeholder".
//! Nested tags and `{expr}` placeholders — the forms the converter actually
//! treats specially — are unaffected; see DESIGN.md.

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;
use crate::parser::grammar::literal;
use crate::parser::{node, Parser};

pub fn at_tag_open(p: &Parser) -> bool {
    p.at(TokenKind::Lt) && matches!(p.peek_n(1), TokenKind::Ident)
}

pub fn tag_element(p: &mut Parser) -> Result<Tree, HogQlError> {
    let _guard = p.enter()?;
    let start_pos = p.pos_checkpoint();
    p.expect(TokenKind::Lt, "'<'")?;
    let open_name = literal::identifier(p)?;
    let mut attributes = Vec::new();
    while matches!(p.peek(), TokenKind::Ident) {
        attributes.push(attribute(p)?);
    }
    if p.at(TokenKind::Slash) {
        p.bump();
        p.expect(TokenKind::Gt, "'>'")?;
        return Ok(finish(p, Rule::HogqlxTagElementClosed, start_pos, open_name, attributes, Vec::new()));
    }
    p.expect(TokenKind::Gt, "'>'")?;

    let mut children = Vec::new();
    loop {
        if at_tag_open(p) {
            children.push(Child::Node(tag_element(p)?));
        } else if p.at(TokenKind::LBrace) {
            children.push(Child::Node(literal::placeholder(p)?));
        } else if p.at(TokenKind::StringLiteral) {
            children.push(Child::Node(literal::string_literal(p)?));
        } else {
            break;
        }
    }

    p.expect(TokenKind::Lt, "'<'")?;
    p.expect(TokenKind::Slash, "'/'")?;
    let close_name = literal::identifier(p)?;
    p.expect(TokenKind::Gt, "'>'")?;

    let mut all_children = vec![Child::Node(close_name)];
    all_children.extend(children);
    Ok(finish(p, Rule::HogqlxTagElementNested, start_pos, open_name, attributes, all_children))
}

fn finish(
    p: &Parser,
    rule: Rule,
    start_pos: u32,
    open_name: Tree,
    attributes: Vec<Tree>,
    rest: Vec<Child>,
) -> Tree {
    let end = p.last_consumed_end();
    let mut children = vec![Child::Node(open_name)];
    children.extend(attributes.into_iter().map(Child::Node));
    children.extend(rest);
    Tree {
        rule,
        span: crate::span::Span::new(start_pos, end),
        children,
    }
}

/// `HogqlxTagAttribute`: `name = value` or a bare `name` (defaults to
/// `Constant(true)` in the converter). `value` is a string literal, a
/// `{expr}` placeholder, or another tag element.
fn attribute(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::HogqlxTagAttribute, |p, children| {
        children.push(Child::Node(literal::identifier(p)?));
        if p.at(TokenKind::Eq) {
            p.bump();
            let value = if p.at(TokenKind::LBrace) {
                literal::placeholder(p)?
            } else if p.at(TokenKind::StringLiteral) {
                literal::string_literal(p)?
            } else if at_tag_open(p) {
                tag_element(p)?
            } else {
                return Err(p.unexpected("an attribute value"));
            };
            children.push(Child::Node(value));
        }
        Ok(())
    })?;
    Ok(tree)
}
