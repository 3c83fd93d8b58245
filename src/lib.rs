//! HogQL front end: lexer, recursive-descent parser, and parse-tree-to-AST
//! converter (spec §1). Five entry points turn source text into either a
//! JSON-serialized AST or a JSON-serialized error object (spec §6/§7); there
//! is no other public surface, since nothing outside the converter ever
//! needs to see the parse tree itself.

pub mod ast;
mod convert;
pub mod cst;
pub mod error;
mod lexer;
mod limit;
mod parser;
pub mod span;
mod string_literal;

use error::HogQlError;
use parser::grammar::{column_expr, program, select, template_string};
use parser::Parser;
use span::Lines;

pub use ast::{Node, Spanned};
pub use error::ErrorResponse;
pub use lexer::{Token, TokenKind};

/// Runs `build` to produce an AST, then serializes it (spec §6.3) or, on
/// failure, serializes the error instead (spec §7) — the shared tail of
/// every entry point below.
fn finish(result: Result<Spanned, HogQlError>, source: &str) -> String {
    match result {
        Ok(spanned) => match spanned.span {
            Some(_) => ast::to_json(&spanned, &Lines::new(source)),
            None => serde_json::to_string(&spanned).expect("AST serialization is infallible"),
        },
        Err(err) => {
            tracing::warn!(kind = ?err.kind, start = err.span.start, end = err.span.end, "parse failed");
            err.to_json()
        }
    }
}

/// Parses a single expression (grammar rule `expr`).
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_expr(input: &str, is_internal: bool) -> String {
    let result = (|| -> Result<Spanned, HogQlError> {
        let mut p = Parser::new(input)?;
        let tree = column_expr::column_expr(&mut p)?;
        p.expect_eof()?;
        let conv = convert::Converter::new(is_internal);
        convert::convert_expr(&conv, input, &tree)
    })();
    if result.is_ok() {
        tracing::debug!("parse_expr succeeded");
    }
    finish(result, input)
}

/// Parses a single `ORDER BY` item (grammar rule `orderExpr`).
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_order_expr(input: &str, is_internal: bool) -> String {
    let result = (|| -> Result<Spanned, HogQlError> {
        let mut p = Parser::new(input)?;
        let tree = select::order_expr(&mut p)?;
        p.expect_eof()?;
        let conv = convert::Converter::new(is_internal);
        convert::convert_order_expr(&conv, input, &tree)
    })();
    if result.is_ok() {
        tracing::debug!("parse_order_expr succeeded");
    }
    finish(result, input)
}

/// Parses a full query — a plain `SELECT`, a `UNION`/`INTERSECT`/`EXCEPT`
/// set, a placeholder, or a HogQLX tag (grammar rule `select`).
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_select(input: &str, is_internal: bool) -> String {
    let result = (|| -> Result<Spanned, HogQlError> {
        let mut p = Parser::new(input)?;
        let tree = select::select(&mut p)?;
        p.expect_eof()?;
        let conv = convert::Converter::new(is_internal);
        convert::convert_select(&conv, input, &tree)
    })();
    if result.is_ok() {
        tracing::debug!("parse_select succeeded");
    }
    finish(result, input)
}

/// Parses a template string covering the entire input (grammar rule
/// `fullTemplateString`). Unlike the other four entry points this never
/// goes through the ordinary token stream — the whole input *is* the
/// template's contents, scanned directly off the source text.
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_full_template_string(input: &str, is_internal: bool) -> String {
    let result = (|| -> Result<Spanned, HogQlError> {
        let tree = template_string::scan_template(input, cst::Rule::FullTemplateString)?;
        let conv = convert::Converter::new(is_internal);
        convert::convert_expr(&conv, input, &tree)
    })();
    if result.is_ok() {
        tracing::debug!("parse_full_template_string succeeded");
    }
    finish(result, input)
}

/// Parses a full script: declarations, control flow, functions, try/catch
/// (grammar rule `program`).
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse_program(input: &str, is_internal: bool) -> String {
    let result = (|| -> Result<Spanned, HogQlError> {
        let mut p = Parser::new(input)?;
        let tree = program::program(&mut p)?;
        p.expect_eof()?;
        let conv = convert::Converter::new(is_internal);
        convert::convert_program(&conv, input, &tree)
    })();
    if result.is_ok() {
        tracing::debug!("parse_program succeeded");
    }
    finish(result, input)
}

/// Decodes an already-quoted string literal (spec §4.1), e.g. for a caller
/// that received `'it''s'` as a standalone token rather than as part of a
/// larger parse. Returns the decoded string, JSON-encoded, or a serialized
/// error — there is no AST node here, so the usual `finish` path doesn't
/// apply.
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub fn parse_string_literal_text(text: &str) -> String {
    let span = span::Span::new(0, text.len() as u32);
    match string_literal::parse_string_literal_text(text, span) {
        Ok(decoded) => serde_json::to_string(&decoded).expect("string serialization is infallible"),
        Err(err) => {
            tracing::warn!(kind = ?err.kind, "parse_string_literal_text failed");
            err.to_json()
        }
    }
}
