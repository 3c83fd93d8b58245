//! The parse-tree-to-AST converter (spec §4) — the core of this crate.
//! Grounded on `mir/from_ast.rs`'s `Convert` trait, reshaped to return
//! `Result<_, HogQlError>` instead of `Option` (spec §7 requires a single
//! precise error, not a silent `None`), and to carry an explicit
//! `is_internal` flag (spec §4.2) rather than relying on a marker type.

mod expr;
mod hogqlx;
mod program;
mod select;

use crate::ast::{Node, Spanned};
use crate::cst::{Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::keywords;
use crate::span::Span;

pub use expr::convert_expr;
pub use program::convert_program;
pub use select::{convert_order_expr, convert_select};

/// Holds the single piece of conversion-wide state (spec §4.2's
/// `is_internal`). Cheap to construct; one instance per entry-point call.
pub struct Converter {
    pub is_internal: bool,
}

impl Converter {
    pub fn new(is_internal: bool) -> Self {
        Self { is_internal }
    }

    /// Wraps `node` with `tree`'s span, unless running in internal mode
    /// (spec §4.2's `visit` wrapper).
    pub fn spanned(&self, node: Node, tree: &Tree) -> Spanned {
        if self.is_internal {
            Spanned::internal(node)
        } else {
            Spanned::new(node, tree.span)
        }
    }

    /// Re-raises a span-less error (spec §7) with `tree`'s span attached.
    pub fn respan(&self, err: HogQlError, tree: &Tree) -> HogQlError {
        err.respan(tree.span)
    }

    /// Spec §4.3: rejects a reserved identifier in alias position.
    pub fn check_not_reserved(&self, text: &str, span: Span) -> Result<(), HogQlError> {
        if keywords::is_reserved(text) {
            Err(HogQlError::syntax(
                format!("'{text}' is a reserved keyword and cannot be used as an alias"),
                span,
            ))
        } else {
            Ok(())
        }
    }
}

/// Decodes an `Identifier`/`ColumnIdentifier` leaf's token text: quoted
/// identifiers go through the string decoder (spec §4.4), bare identifiers
/// keep their literal text.
pub fn decode_identifier_token(source: &str, token: &crate::lexer::Token) -> Result<String, HogQlError> {
    use crate::lexer::TokenKind;
    let text = &source[token.span.start as usize..token.span.end as usize];
    match token.kind {
        TokenKind::QuotedIdent => crate::string_literal::parse_identifier_text(text, token.span),
        _ => Ok(text.to_string()),
    }
}

/// Fetches the single `Identifier` child of a `Rule::Identifier`/
/// `TableIdentifier`-ish node and decodes it.
pub fn identifier_text(source: &str, tree: &Tree) -> Result<String, HogQlError> {
    let token = tree
        .children
        .iter()
        .find_map(|c| match c {
            crate::cst::Child::Token(t) => Some(t),
            _ => None,
        })
        .ok_or_else(|| HogQlError::parsing("Identifier node has no token", tree.span))?;
    decode_identifier_token(source, token)
}

/// Builds a dotted chain (`Field.chain`, a `TableIdentifier`, etc.) from a
/// sequence of `Identifier` nodes and `*`/`.` tokens already collected by
/// the parser into `tree.children`.
pub fn chain_of(source: &str, tree: &Tree) -> Result<Vec<String>, HogQlError> {
    let mut chain = Vec::new();
    for child in &tree.children {
        match child {
            crate::cst::Child::Node(n) if n.rule == Rule::Identifier => {
                chain.push(identifier_text(source, n)?);
            }
            crate::cst::Child::Token(t) if t.kind == crate::lexer::TokenKind::Star => {
                chain.push("*".to_string());
            }
            _ => {}
        }
    }
    Ok(chain)
}
