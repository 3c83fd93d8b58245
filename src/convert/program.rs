//! The imperative sub-language (spec §3's `Program`/`Block`/`*Statement`/
//! `Function` rows): declarations, control flow, functions, try/catch.

use crate::ast::{CatchEntry, Node, Spanned};
use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;

use super::expr::convert_expr;
use super::{identifier_text, Converter};

pub fn convert_program(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut declarations = Vec::with_capacity(tree.children.len());
    for child in tree.all_nodes() {
        declarations.push(convert_statement(conv, source, child)?);
    }
    Ok(conv.spanned(Node::Program { declarations }, tree))
}

fn boxed(s: Spanned) -> Box<Spanned> {
    Box::new(s)
}

fn convert_statement(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    match tree.rule {
        Rule::Block => {
            let mut declarations = Vec::with_capacity(tree.children.len());
            for child in tree.all_nodes() {
                declarations.push(convert_statement(conv, source, child)?);
            }
            Ok(conv.spanned(Node::Block { declarations }, tree))
        }
        Rule::VarDecl => {
            let mut nodes = tree.all_nodes();
            let name_tree = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("VarDecl has no identifier", tree.span))?;
            let name = identifier_text(source, name_tree)?;
            let expr = match nodes.next() {
                Some(e) => Some(boxed(convert_expr(conv, source, e)?)),
                None => None,
            };
            Ok(conv.spanned(Node::VariableDeclaration { name, expr }, tree))
        }
        Rule::VarAssignment => {
            let mut nodes = tree.all_nodes();
            let (left, right) = (
                nodes.next().ok_or_else(|| HogQlError::parsing("VarAssignment missing left side", tree.span))?,
                nodes.next().ok_or_else(|| HogQlError::parsing("VarAssignment missing right side", tree.span))?,
            );
            let left = convert_expr(conv, source, left)?;
            let right = convert_expr(conv, source, right)?;
            Ok(conv.spanned(
                Node::VariableAssignment {
                    left: boxed(left),
                    right: boxed(right),
                },
                tree,
            ))
        }
        Rule::ExprStatement => {
            let expr = match tree.all_nodes().next() {
                Some(e) => Some(boxed(convert_expr(conv, source, e)?)),
                None => None,
            };
            Ok(conv.spanned(Node::ExprStatement { expr }, tree))
        }
        Rule::ReturnStatement => {
            let expr = match tree.all_nodes().next() {
                Some(e) => Some(boxed(convert_expr(conv, source, e)?)),
                None => None,
            };
            Ok(conv.spanned(Node::ReturnStatement { expr }, tree))
        }
        Rule::ThrowStatement => {
            let expr = match tree.all_nodes().next() {
                Some(e) => Some(boxed(convert_expr(conv, source, e)?)),
                None => None,
            };
            Ok(conv.spanned(Node::ThrowStatement { expr }, tree))
        }
        Rule::IfStatement => {
            let mut nodes = tree.all_nodes();
            let cond = nodes.next().ok_or_else(|| HogQlError::parsing("IfStatement missing condition", tree.span))?;
            let then = nodes.next().ok_or_else(|| HogQlError::parsing("IfStatement missing then-branch", tree.span))?;
            let else_ = nodes.next();
            let expr = convert_expr(conv, source, cond)?;
            let then = convert_statement(conv, source, then)?;
            let else_ = match else_ {
                Some(e) => Some(boxed(convert_statement(conv, source, e)?)),
                None => None,
            };
            Ok(conv.spanned(
                Node::IfStatement {
                    expr: boxed(expr),
                    then: boxed(then),
                    else_,
                },
                tree,
            ))
        }
        Rule::WhileStatement => {
            let mut nodes = tree.all_nodes();
            let cond = nodes.next().ok_or_else(|| HogQlError::parsing("WhileStatement missing condition", tree.span))?;
            let expr = convert_expr(conv, source, cond)?;
            let body = match nodes.next() {
                Some(b) => Some(boxed(convert_statement(conv, source, b)?)),
                None => None,
            };
            Ok(conv.spanned(Node::WhileStatement { expr: boxed(expr), body }, tree))
        }
        Rule::ForStatement => convert_for_statement(conv, source, tree),
        Rule::ForInStatement => convert_for_in_statement(conv, source, tree),
        Rule::TryCatchStatement => convert_try_catch(conv, source, tree),
        Rule::FunctionDecl => convert_function_decl(conv, source, tree),
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} in statement position", tree.rule),
            tree.span,
        )),
    }
}

/// The parser keeps both `;` separators as children so this split is
/// unambiguous: `[init?, Semicolon, cond?, Semicolon, incr?, body]`.
fn convert_for_statement(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let ch = &tree.children;
    let semicolons: Vec<usize> = ch
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            Child::Token(t) if t.kind == TokenKind::Semicolon => Some(i),
            _ => None,
        })
        .collect();
    let (first_semi, second_semi) = match semicolons.as_slice() {
        [a, b] => (*a, *b),
        _ => return Err(HogQlError::parsing("ForStatement is missing its ';' separators", tree.span)),
    };

    let node_at = |range: std::ops::Range<usize>| -> Option<&Tree> {
        ch[range].iter().find_map(|c| match c {
            Child::Node(n) => Some(n),
            _ => None,
        })
    };
    let initializer = node_at(0..first_semi);
    let condition = node_at(first_semi + 1..second_semi);
    let increment = node_at(second_semi + 1..ch.len() - 1);
    let body = ch
        .last()
        .and_then(|c| match c {
            Child::Node(n) => Some(n),
            _ => None,
        })
        .ok_or_else(|| HogQlError::parsing("ForStatement has no body", tree.span))?;

    let initializer = initializer.map(|n| convert_statement(conv, source, n)).transpose()?.map(boxed);
    let condition = condition.map(|n| convert_expr(conv, source, n)).transpose()?.map(boxed);
    let increment = increment.map(|n| convert_statement(conv, source, n)).transpose()?.map(boxed);
    let body = boxed(convert_statement(conv, source, body)?);

    Ok(conv.spanned(
        Node::ForStatement {
            initializer,
            condition,
            increment,
            body,
        },
        tree,
    ))
}

fn convert_for_in_statement(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (key_var, value_var, expr, body) = match nodes.as_slice() {
        [value, expr, body] => (None, identifier_text(source, value)?, *expr, *body),
        [key, value, expr, body] => (
            Some(identifier_text(source, key)?),
            identifier_text(source, value)?,
            *expr,
            *body,
        ),
        _ => return Err(HogQlError::parsing("ForInStatement has an unexpected shape", tree.span)),
    };
    let expr = convert_expr(conv, source, expr)?;
    let body = convert_statement(conv, source, body)?;
    Ok(conv.spanned(
        Node::ForInStatement {
            key_var,
            value_var,
            expr: boxed(expr),
            body: boxed(body),
        },
        tree,
    ))
}

fn convert_try_catch(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();
    let try_stmt = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("TryCatchStatement has no try block", tree.span))?;
    let try_stmt = convert_statement(conv, source, try_stmt)?;

    let mut catches = Vec::new();
    let mut finally_stmt = None;
    let rest: Vec<&Tree> = nodes.collect();
    for n in rest {
        if n.rule == Rule::CatchBlock {
            catches.push(convert_catch_block(conv, source, n)?);
        } else {
            // The trailing non-`CatchBlock` node, if any, is the `FINALLY` body.
            finally_stmt = Some(boxed(convert_statement(conv, source, n)?));
        }
    }

    Ok(conv.spanned(
        Node::TryCatchStatement {
            try_stmt: boxed(try_stmt),
            catches,
            finally_stmt,
        },
        tree,
    ))
}

fn convert_catch_block(conv: &Converter, source: &str, tree: &Tree) -> Result<CatchEntry, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (var, type_, block) = match nodes.as_slice() {
        [block] => (None, None, *block),
        [var, block] => (Some(identifier_text(source, var)?), None, *block),
        [var, ty, block] => (Some(identifier_text(source, var)?), Some(identifier_text(source, ty)?), *block),
        _ => return Err(HogQlError::parsing("CatchBlock has an unexpected shape", tree.span)),
    };
    let block = convert_statement(conv, source, block)?;
    Ok(CatchEntry { var, type_, block: block.node })
}

fn convert_function_decl(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (name_tree, params, body_tree) = match nodes.as_slice() {
        [name, rest @ .., body] => (*name, rest, *body),
        _ => return Err(HogQlError::parsing("FunctionDecl has an unexpected shape", tree.span)),
    };
    let name = identifier_text(source, name_tree)?;
    let mut params_out = Vec::with_capacity(params.len());
    for p in params {
        params_out.push(identifier_text(source, p)?);
    }
    let body = convert_statement(conv, source, body_tree)?;
    Ok(conv.spanned(
        Node::Function {
            name,
            params: params_out,
            body: boxed(body),
        },
        tree,
    ))
}
