//! Template strings: a run of literal text interleaved with `{expr}`
//! interpolations.
//!
//! The reference grammar lexes these with a dedicated lexer mode that
//! switches between "raw text" and "inside a brace" character classes. This
//! lexer has no mode-switch mechanism, so `FullTemplateString` is scanned
//! directly off the raw source by its own entry point (`parse_full_template_
//! string`, see `lib.rs`) rather than through the ordinary token stream —
//! which matches its actual contract: the entire input *is* the template's
//! contents, not a quoted literal embedded in a larger expression.

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::parser::grammar::column_expr;
use crate::parser::Parser;
use crate::span::Span;

/// Scans `source` into a `FullTemplateString`/`TemplateString` tree: runs of
/// plain text become `StringContentsText` nodes wrapping a synthetic string-
/// literal span; `{…}` runs are parsed as `StringContentsExpr` nodes wrapping
/// a `ColumnExpr`. Brace nesting inside an interpolation is tracked so a
/// literal `{` inside e.g. a dict expression doesn't end the segment early.
pub fn scan_template(source: &str, rule: Rule) -> Result<Tree, HogQlError> {
    let bytes = source.as_bytes();
    let mut children = Vec::new();
    let mut i = 0usize;
    let mut text_start = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if i > text_start {
                children.push(text_segment(source, text_start, i));
            }
            let expr_start = i + 1;
            let mut depth = 1usize;
            let mut j = expr_start;
            while j < bytes.len() && depth > 0 {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    j += 1;
                }
            }
            if depth != 0 {
                return Err(HogQlError::syntax(
                    "Unmatched curly bracket",
                    Span::new(i as u32, source.len() as u32),
                ));
            }
            let inner = &source[expr_start..j];
            let mut parser = Parser::new(inner)?;
            let expr = column_expr::column_expr(&mut parser)?;
            parser.expect_eof()?;
            children.push(Child::Node(Tree {
                rule: Rule::StringContentsExpr,
                span: Span::new(i as u32, (j + 1) as u32),
                children: vec![Child::Node(expr)],
            }));
            i = j + 1;
            text_start = i;
        } else if bytes[i] == b'}' {
            return Err(HogQlError::syntax(
                "Unmatched curly bracket",
                Span::new(i as u32, (i + 1) as u32),
            ));
        } else {
            i += 1;
        }
    }
    if text_start < bytes.len() {
        children.push(text_segment(source, text_start, bytes.len()));
    }

    Ok(Tree {
        rule,
        span: Span::new(0, source.len() as u32),
        children,
    })
}

fn text_segment(source: &str, start: usize, end: usize) -> Child {
    Child::Node(Tree {
        rule: Rule::StringContentsText,
        span: Span::new(start as u32, end as u32),
        children: vec![Child::Token(crate::lexer::Token::new(
            crate::lexer::TokenKind::StringLiteral,
            Span::new(start as u32, end as u32),
        ))],
    })
}
