//! HogQLX tags (spec §4.10): `<Kind attr=value …>children</Kind>` / `<Kind
//! … />`. Child text/placeholder/nested-tag content is synthesized into a
//! `children` attribute on the resulting `HogQLXTag`, matching how the
//! reference implementation exposes nested content as just another prop.

use crate::ast::{Constant, Node, Spanned};
use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;

use super::{identifier_text, Converter};

pub fn convert_tag(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();

    let open_name = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("HogQLX tag has no name", tree.span))?;
    let kind = identifier_text(source, open_name)?;

    let mut attributes = Vec::new();
    let mut rest: Vec<&Tree> = Vec::new();
    for n in nodes {
        if n.rule == Rule::HogqlxTagAttribute {
            attributes.push(convert_attribute(conv, source, n)?);
        } else {
            rest.push(n);
        }
    }

    if tree.rule == Rule::HogqlxTagElementNested {
        // First remaining node is the closing tag's name, not content.
        if !rest.is_empty() {
            rest.remove(0);
        }
    }

    if !rest.is_empty() {
        let mut child_exprs = Vec::new();
        for n in rest {
            if let Some(spanned) = convert_tag_child(conv, source, n)? {
                child_exprs.push(spanned);
            }
        }
        if attributes.iter().any(|a| matches!(&a.node, Node::HogQLXAttribute { name, .. } if name == "children")) {
            return Err(HogQlError::syntax(
                format!("'{kind}' has both an explicit 'children' attribute and nested content"),
                tree.span,
            ));
        }
        let children_array = conv.spanned(Node::Array { exprs: child_exprs }, tree);
        attributes.push(conv.spanned(
            Node::HogQLXAttribute {
                name: "children".to_string(),
                value: Box::new(children_array),
            },
            tree,
        ));
    }

    Ok(conv.spanned(Node::HogQLXTag { kind, attributes }, tree))
}

/// Drops whitespace-only text runs that contain a newline (spec §4.10) — the
/// formatting whitespace between sibling tags on their own lines, as opposed
/// to meaningful inline text like a single space between words.
fn convert_tag_child(conv: &Converter, source: &str, node: &Tree) -> Result<Option<Spanned>, HogQlError> {
    match node.rule {
        Rule::StringLiteralRule => {
            let token = node
                .children
                .iter()
                .find_map(|c| match c {
                    Child::Token(t) if t.kind == TokenKind::StringLiteral => Some(t),
                    _ => None,
                })
                .ok_or_else(|| HogQlError::parsing("tag text child has no token", node.span))?;
            let raw = &source[token.span.start as usize..token.span.end as usize];
            // Tag text is lexed as an ordinary quoted literal (see hogqlx.rs's
            // grammar doc comment); un-quote only if it actually looks quoted.
            let decoded = if raw.len() >= 2 && (raw.starts_with('\'') || raw.starts_with('"') || raw.starts_with('`')) {
                crate::string_literal::parse_string_literal_text(raw, token.span)?
            } else {
                raw.to_string()
            };
            if decoded.trim().is_empty() && decoded.contains('\n') {
                return Ok(None);
            }
            Ok(Some(conv.spanned(
                Node::Constant {
                    value: Constant::String(decoded),
                    value_type: None,
                },
                node,
            )))
        }
        Rule::Placeholder => Ok(Some(super::expr::convert_expr(conv, source, node)?)),
        Rule::HogqlxTagElementClosed | Rule::HogqlxTagElementNested => Ok(Some(convert_tag(conv, source, node)?)),
        _ => Err(HogQlError::parsing(
            format!("unexpected tag child rule {:?}", node.rule),
            node.span,
        )),
    }
}

fn convert_attribute(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();
    let name_tree = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("HogQLX attribute has no name", tree.span))?;
    let name = identifier_text(source, name_tree)?;
    let value = match nodes.next() {
        Some(value_tree) => super::expr::convert_expr(conv, source, value_tree)?,
        None => conv.spanned(
            Node::Constant {
                value: Constant::Bool(true),
                value_type: None,
            },
            tree,
        ),
    };
    Ok(conv.spanned(
        Node::HogQLXAttribute {
            name,
            value: Box::new(value),
        },
        tree,
    ))
}
