//! `Select`/`SelectStmt` and everything that hangs off a query: `WITH`,
//! joins, `WHERE`/`GROUP BY`/`HAVING`, `WINDOW`, `ORDER BY`,
//! `LIMIT`/`OFFSET`, `ARRAY JOIN`, `SAMPLE` (spec §4.5/§4.6/§4.12).
//!
//! `SelectStmt`'s clauses are mostly distinguishable by the parse tree's
//! rule tags alone (`ColumnExprList` vs. `OrderExprList` vs. …), but a few
//! reuse the generic `ColumnExpr` tag (`TOP`, `SETTINGS`) the same way
//! `column_expr.rs`'s binary forms do — so this walks `tree.children`
//! sequentially with a small cursor instead of looking clauses up by rule.

use indexmap::IndexMap;

use crate::ast::{CteEntry, CteType, Node, SelectSetNode, Spanned};
use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::{Token, TokenKind};
use crate::limit::JOIN_CHAIN_LIMIT;

use super::expr::{convert_arg_list, convert_expr};
use super::{identifier_text, Converter};

fn boxed(s: Spanned) -> Box<Spanned> {
    Box::new(s)
}

fn as_token(c: &Child) -> Option<&Token> {
    match c {
        Child::Token(t) => Some(t),
        _ => None,
    }
}

/// A cursor over one `Tree`'s children, advanced one optional-clause at a
/// time in the exact order the grammar emits them.
struct Cursor<'a> {
    children: &'a [Child],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(children: &'a [Child]) -> Self {
        Self { children, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Child> {
        self.children.get(self.pos)
    }

    fn peek_token(&self, kind: TokenKind) -> bool {
        matches!(self.peek(), Some(Child::Token(t)) if t.kind == kind)
    }

    fn peek_node_rule(&self, rule: Rule) -> bool {
        matches!(self.peek(), Some(Child::Node(n)) if n.rule == rule)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_node(&mut self) -> Option<&'a Tree> {
        match self.peek() {
            Some(Child::Node(n)) => {
                self.pos += 1;
                Some(n)
            }
            _ => None,
        }
    }

    fn next_node_of(&mut self, rule: Rule) -> Option<&'a Tree> {
        if self.peek_node_rule(rule) {
            self.next_node()
        } else {
            None
        }
    }
}

/// `Select`: a placeholder, a HogQLX tag, or a full `SelectSetStmt`.
pub fn convert_select(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    match tree.rule {
        Rule::SelectSetStmt => convert_select_set_stmt(conv, source, tree),
        Rule::Placeholder | Rule::HogqlxTagElementClosed | Rule::HogqlxTagElementNested => {
            convert_expr(conv, source, tree)
        }
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} at Select position", tree.rule),
            tree.span,
        )),
    }
}

fn convert_select_branch(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    match tree.rule {
        Rule::SelectStmt => convert_select_stmt(conv, source, tree),
        Rule::SelectSetStmt => convert_select_set_stmt(conv, source, tree),
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} in a select-set branch", tree.rule),
            tree.span,
        )),
    }
}

/// A `SelectSetStmt` with no `UNION`/`INTERSECT`/`EXCEPT` tail folds down to
/// its single branch rather than wrapping it in a one-element
/// `SelectSetQuery` (spec §4.12).
fn convert_select_set_stmt(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();
    let first_tree = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("SelectSetStmt has no initial query", tree.span))?;
    let initial = convert_select_branch(conv, source, first_tree)?;

    let clause_trees: Vec<&Tree> = nodes.collect();
    if clause_trees.is_empty() {
        return Ok(initial);
    }

    let mut subsequent = Vec::with_capacity(clause_trees.len());
    for clause in clause_trees {
        let set_operator = subsequent_set_operator_string(clause)?;
        let branch_tree = clause
            .all_nodes()
            .next()
            .ok_or_else(|| HogQlError::parsing("set clause has no query", clause.span))?;
        let select_query = convert_select_branch(conv, source, branch_tree)?.node;
        subsequent.push(SelectSetNode { select_query, set_operator });
    }

    Ok(conv.spanned(
        Node::SelectSetQuery {
            initial_select_query: boxed(initial),
            subsequent_select_queries: subsequent,
        },
        tree,
    ))
}

fn subsequent_set_operator_string(tree: &Tree) -> Result<String, HogQlError> {
    let kw = tree
        .children
        .iter()
        .find_map(|c| match c {
            Child::Token(t) if matches!(t.kind, TokenKind::Union | TokenKind::Intersect | TokenKind::Except) => {
                Some(t.kind)
            }
            _ => None,
        })
        .ok_or_else(|| HogQlError::parsing("set clause has no UNION/INTERSECT/EXCEPT keyword", tree.span))?;
    let base = match kw {
        TokenKind::Union => "UNION",
        TokenKind::Intersect => "INTERSECT",
        TokenKind::Except => "EXCEPT",
        _ => unreachable!(),
    };
    let modifier = tree.children.iter().find_map(|c| match c {
        Child::Token(t) if t.kind == TokenKind::All => Some("ALL"),
        Child::Token(t) if t.kind == TokenKind::Distinct => Some("DISTINCT"),
        _ => None,
    });
    Ok(match modifier {
        Some(m) => format!("{base} {m}"),
        None => base.to_string(),
    })
}

fn convert_select_stmt(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut cur = Cursor::new(&tree.children);

    let ctes = match cur.next_node_of(Rule::WithExprList) {
        Some(with_tree) => Some(convert_with_expr_list(conv, source, with_tree)?),
        None => None,
    };

    if !cur.peek_token(TokenKind::Select) {
        return Err(HogQlError::parsing("SelectStmt is missing SELECT", tree.span));
    }
    cur.advance();

    let distinct = if cur.peek_token(TokenKind::Distinct) {
        cur.advance();
        Some(true)
    } else {
        None
    };

    // `TOP` shares `ColumnExpr`'s generic rule tag (not a real AST surface).
    if cur.peek_node_rule(Rule::ColumnExpr) {
        let top_tree = cur.next_node().expect("just peeked");
        return Err(HogQlError::not_implemented("TOP is not supported", top_tree.span));
    }

    let select_list_tree = cur
        .next_node_of(Rule::ColumnExprList)
        .ok_or_else(|| HogQlError::parsing("SelectStmt is missing its column list", tree.span))?;
    let select = convert_column_expr_list(conv, source, select_list_tree)?;

    let select_from = if cur.peek_token(TokenKind::From) {
        cur.advance();
        let join_tree = cur
            .next_node()
            .ok_or_else(|| HogQlError::parsing("FROM is missing a table/join expression", tree.span))?;
        Some(boxed(convert_join_expr(conv, source, join_tree)?))
    } else {
        None
    };

    let (array_join_op, array_join_list) = match cur.next_node_of(Rule::ArrayJoinClause) {
        Some(array_tree) => {
            if select_from.is_none() {
                return Err(HogQlError::syntax(
                    "Using ARRAY JOIN without a FROM clause is not permitted",
                    array_tree.span,
                ));
            }
            let (op, list) = convert_array_join_clause(conv, source, array_tree)?;
            for item in &list {
                if !matches!(item.node, Node::Alias { .. }) {
                    return Err(HogQlError::syntax(
                        "ARRAY JOIN clause requires an alias for each expression",
                        item.span.unwrap_or(array_tree.span),
                    ));
                }
            }
            (Some(op), Some(list))
        }
        None => (None, None),
    };

    let where_ = if cur.peek_token(TokenKind::Where) {
        cur.advance();
        let expr_tree = cur
            .next_node()
            .ok_or_else(|| HogQlError::parsing("WHERE is missing its condition", tree.span))?;
        Some(boxed(convert_expr(conv, source, expr_tree)?))
    } else {
        None
    };

    let prewhere = if cur.peek_token(TokenKind::Prewhere) {
        cur.advance();
        let expr_tree = cur
            .next_node()
            .ok_or_else(|| HogQlError::parsing("PREWHERE is missing its condition", tree.span))?;
        Some(boxed(convert_expr(conv, source, expr_tree)?))
    } else {
        None
    };

    let group_by = if cur.peek_token(TokenKind::Group) {
        cur.advance();
        let list_tree = cur
            .next_node_of(Rule::ColumnExprList)
            .ok_or_else(|| HogQlError::parsing("GROUP BY is missing its column list", tree.span))?;
        Some(convert_column_expr_list(conv, source, list_tree)?)
    } else {
        None
    };

    let having = if cur.peek_token(TokenKind::Having) {
        cur.advance();
        let expr_tree = cur
            .next_node()
            .ok_or_else(|| HogQlError::parsing("HAVING is missing its condition", tree.span))?;
        Some(boxed(convert_expr(conv, source, expr_tree)?))
    } else {
        None
    };

    let window_exprs = match cur.next_node_of(Rule::WindowExpr) {
        Some(window_tree) => Some(convert_window_clause(conv, source, window_tree)?),
        None => None,
    };

    let order_by = match cur.next_node_of(Rule::OrderExprList) {
        Some(order_tree) => Some(convert_order_expr_list(conv, source, order_tree)?),
        None => None,
    };

    let (offset, limit, limit_with_ties, limit_by) = if cur.peek_node_rule(Rule::LimitAndOffsetClause)
        || cur.peek_node_rule(Rule::OffsetOnlyClause)
    {
        let limit_tree = cur.next_node().expect("just peeked");
        let info = convert_limit_clause(conv, source, limit_tree)?;
        (info.offset, info.limit, info.limit_with_ties, info.limit_by)
    } else {
        (None, None, None, None)
    };

    // `SETTINGS` shares `ColumnExpr`'s generic rule tag too.
    if cur.peek_node_rule(Rule::ColumnExpr) {
        let settings_tree = cur.next_node().expect("just peeked");
        return Err(HogQlError::not_implemented("SETTINGS is not supported", settings_tree.span));
    }

    Ok(conv.spanned(
        Node::SelectQuery {
            ctes,
            select,
            distinct,
            select_from,
            where_,
            prewhere,
            having,
            group_by,
            order_by,
            window_exprs,
            offset: offset.map(boxed),
            limit: limit.map(boxed),
            limit_with_ties,
            limit_by: limit_by.map(boxed),
            array_join_op,
            array_join_list,
        },
        tree,
    ))
}

fn convert_column_expr_list(conv: &Converter, source: &str, tree: &Tree) -> Result<Vec<Spanned>, HogQlError> {
    tree.all_nodes().map(|n| convert_expr(conv, source, n)).collect()
}

/// Last entry wins on a duplicate CTE name (spec §4.12), keeping the
/// position of the name's first occurrence — `IndexMap::insert` overwrites
/// the value in place rather than moving the key to the end. The map itself
/// (not a `Vec`) is the AST shape: `ctes` is a JSON object keyed by name.
fn convert_with_expr_list(conv: &Converter, source: &str, tree: &Tree) -> Result<IndexMap<String, CteEntry>, HogQlError> {
    let mut map: IndexMap<String, CteEntry> = IndexMap::new();
    for entry_tree in tree.all_nodes() {
        let (name, expr, cte_type) = match entry_tree.rule {
            Rule::WithExprSubquery => {
                let mut nodes = entry_tree.all_nodes();
                let name_tree = nodes
                    .next()
                    .ok_or_else(|| HogQlError::parsing("WITH entry has no name", entry_tree.span))?;
                let subquery_tree = nodes
                    .next()
                    .ok_or_else(|| HogQlError::parsing("WITH entry has no subquery", entry_tree.span))?;
                let name = identifier_text(source, name_tree)?;
                let expr = convert_select_branch(conv, source, subquery_tree)?.node;
                (name, expr, CteType::Subquery)
            }
            Rule::WithExprColumn => {
                let mut nodes = entry_tree.all_nodes();
                let expr_tree = nodes
                    .next()
                    .ok_or_else(|| HogQlError::parsing("WITH entry has no expression", entry_tree.span))?;
                let name_tree = nodes
                    .next()
                    .ok_or_else(|| HogQlError::parsing("WITH entry has no name", entry_tree.span))?;
                let expr = convert_expr(conv, source, expr_tree)?.node;
                let name = identifier_text(source, name_tree)?;
                (name, expr, CteType::Column)
            }
            _ => {
                return Err(HogQlError::parsing(
                    format!("unexpected rule {:?} in WITH clause", entry_tree.rule),
                    entry_tree.span,
                ))
            }
        };
        map.insert(name.clone(), CteEntry { name, expr, cte_type });
    }
    Ok(map)
}

// ----------------------------------------------------------------- joins

struct JoinSeg<'a> {
    join_type: Option<String>,
    right: &'a Tree,
    constraint: Option<&'a Tree>,
}

/// Walks a `JoinExprOp`/`JoinExprCrossOp` chain's left spine down to its base
/// table, collecting each join step in source order so they can be threaded
/// back into a right-nested `next_join` linked list (spec §4.6).
fn collect_join_segments<'a>(tree: &'a Tree, depth: usize) -> Result<(&'a Tree, Vec<JoinSeg<'a>>), HogQlError> {
    if depth > JOIN_CHAIN_LIMIT {
        return Err(HogQlError::parsing("join chain is too deeply nested", tree.span));
    }
    match tree.rule {
        Rule::JoinExprOp => {
            let left = match tree.children.first() {
                Some(Child::Node(n)) => n,
                _ => return Err(HogQlError::parsing("JoinExprOp has no left table", tree.span)),
            };
            let modifiers: Vec<&Token> = tree.children[1..]
                .iter()
                .take_while(|c| matches!(c, Child::Token(t) if t.kind != TokenKind::Join))
                .filter_map(as_token)
                .collect();
            let mut nodes = tree.all_nodes();
            nodes.next();
            let right = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("JoinExprOp has no right table", tree.span))?;
            let constraint = tree.node(Rule::JoinConstraintClause);
            let join_type = Some(join_type_string(&modifiers));
            let (base, mut segs) = collect_join_segments(left, depth + 1)?;
            segs.push(JoinSeg { join_type, right, constraint });
            Ok((base, segs))
        }
        Rule::JoinExprCrossOp => {
            let left = match tree.children.first() {
                Some(Child::Node(n)) => n,
                _ => return Err(HogQlError::parsing("JoinExprCrossOp has no left table", tree.span)),
            };
            let mut nodes = tree.all_nodes();
            nodes.next();
            let right = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("JoinExprCrossOp has no right table", tree.span))?;
            let (base, mut segs) = collect_join_segments(left, depth + 1)?;
            segs.push(JoinSeg {
                join_type: Some("CROSS JOIN".to_string()),
                right,
                constraint: None,
            });
            Ok((base, segs))
        }
        Rule::JoinExprTable | Rule::JoinExprParens => Ok((tree, Vec::new())),
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} in join position", tree.rule),
            tree.span,
        )),
    }
}

fn token_kw_str(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::All => "ALL",
        TokenKind::Any => "ANY",
        TokenKind::Asof => "ASOF",
        TokenKind::Inner => "INNER",
        TokenKind::Left => "LEFT",
        TokenKind::Right => "RIGHT",
        TokenKind::Full => "FULL",
        TokenKind::Outer => "OUTER",
        TokenKind::Semi => "SEMI",
        TokenKind::Anti => "ANTI",
        _ => "",
    }
}

fn join_type_string(modifiers: &[&Token]) -> String {
    let mut parts: Vec<&str> = modifiers.iter().map(|t| token_kw_str(t.kind)).collect();
    parts.push("JOIN");
    parts.join(" ")
}

fn convert_join_expr(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let (base, segs) = collect_join_segments(tree, 0)?;

    let mut next: Option<Box<Spanned>> = None;
    for seg in segs.iter().rev() {
        let (table, table_final, sample, alias, table_args) = convert_join_table(conv, source, seg.right)?;
        let constraint = seg
            .constraint
            .map(|c| convert_join_constraint(conv, source, c))
            .transpose()?
            .map(boxed);
        let node = Node::JoinExpr {
            table: boxed(table),
            table_final,
            sample,
            next_join: next.take(),
            alias,
            join_type: seg.join_type.clone(),
            constraint,
            table_args,
        };
        next = Some(boxed(conv.spanned(node, seg.right)));
    }

    let (table, table_final, sample, alias, table_args) = convert_join_table(conv, source, base)?;
    Ok(conv.spanned(
        Node::JoinExpr {
            table: boxed(table),
            table_final,
            sample,
            next_join: next,
            alias,
            join_type: None,
            constraint: None,
            table_args,
        },
        tree,
    ))
}

type JoinTableParts = (Spanned, Option<bool>, Option<Box<Spanned>>, Option<String>, Option<Vec<Spanned>>);

/// `JoinExprTable`'s table/`FINAL`/`SAMPLE`, or — for a parenthesized nested
/// join — the converted sub-chain used in place of a single table.
fn convert_join_table(conv: &Converter, source: &str, tree: &Tree) -> Result<JoinTableParts, HogQlError> {
    match tree.rule {
        Rule::JoinExprTable => {
            let table_expr_tree = tree
                .all_nodes()
                .next()
                .ok_or_else(|| HogQlError::parsing("join table is missing its table expression", tree.span))?;
            let (table, alias, table_args) = convert_table_expr(conv, source, table_expr_tree)?;
            let table_final = if tree.has_token(TokenKind::Final) { Some(true) } else { None };
            let sample = tree
                .node(Rule::SampleClause)
                .map(|s| convert_sample_clause(conv, source, s))
                .transpose()?
                .map(boxed);
            Ok((table, table_final, sample, alias, table_args))
        }
        Rule::JoinExprParens => {
            let inner_tree = tree
                .all_nodes()
                .next()
                .ok_or_else(|| HogQlError::parsing("parenthesized join has no inner expression", tree.span))?;
            let inner = convert_join_expr(conv, source, inner_tree)?;
            Ok((inner, None, None, None, None))
        }
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} as a join table", tree.rule),
            tree.span,
        )),
    }
}

fn convert_table_expr(
    conv: &Converter,
    source: &str,
    tree: &Tree,
) -> Result<(Spanned, Option<String>, Option<Vec<Spanned>>), HogQlError> {
    match tree.rule {
        Rule::TableExprAlias => {
            let mut nodes = tree.all_nodes();
            let base_tree = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprAlias has no base table", tree.span))?;
            let alias_tree = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprAlias has no alias", tree.span))?;
            let (base, _, table_args) = convert_table_expr(conv, source, base_tree)?;
            let alias = identifier_text(source, alias_tree)?;
            conv.check_not_reserved(&alias, alias_tree.span)?;
            Ok((base, Some(alias), table_args))
        }
        Rule::TableExprIdentifier => {
            let table_id = tree
                .all_nodes()
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprIdentifier has no identifier", tree.span))?;
            let chain = table_identifier_chain(source, table_id)?;
            Ok((conv.spanned(Node::Field { chain }, tree), None, None))
        }
        Rule::TableExprFunction => {
            let mut nodes = tree.all_nodes();
            let table_id = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprFunction has no identifier", tree.span))?;
            let args_tree = nodes
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprFunction has no arguments", tree.span))?;
            let chain = table_identifier_chain(source, table_id)?;
            let (_distinct, args) = convert_arg_list(conv, source, args_tree)?;
            Ok((conv.spanned(Node::Field { chain }, tree), None, Some(args)))
        }
        Rule::TableExprSubquery => {
            let inner_tree = tree
                .all_nodes()
                .next()
                .ok_or_else(|| HogQlError::parsing("TableExprSubquery has no query", tree.span))?;
            let inner = convert_select_branch(conv, source, inner_tree)?;
            Ok((inner, None, None))
        }
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} as a table expression", tree.rule),
            tree.span,
        )),
    }
}

fn table_identifier_chain(source: &str, tree: &Tree) -> Result<Vec<String>, HogQlError> {
    tree.all_nodes().map(|n| identifier_text(source, n)).collect()
}

fn convert_join_constraint(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let constraint_type = if tree.has_token(TokenKind::On) { "ON" } else { "USING" }.to_string();
    let exprs: Vec<Spanned> = tree
        .all_nodes()
        .map(|n| convert_expr(conv, source, n))
        .collect::<Result<_, _>>()?;
    let expr = match exprs.len() {
        0 => return Err(HogQlError::parsing("join constraint has no condition", tree.span)),
        1 => exprs.into_iter().next().expect("len checked"),
        _ => {
            return Err(HogQlError::not_implemented(
                "JOIN ... ON with multiple expressions is not supported",
                tree.span,
            ))
        }
    };
    Ok(conv.spanned(
        Node::JoinConstraint {
            expr: boxed(expr),
            constraint_type,
        },
        tree,
    ))
}

fn convert_sample_clause(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();
    let sample_tree = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("SAMPLE is missing its ratio", tree.span))?;
    let sample_value = convert_ratio_expr(conv, source, sample_tree)?;
    let offset_value = nodes.next().map(|n| convert_ratio_expr(conv, source, n)).transpose()?;
    Ok(conv.spanned(
        Node::SampleExpr {
            sample_value: boxed(sample_value),
            offset_value: offset_value.map(boxed),
        },
        tree,
    ))
}

fn convert_ratio_expr(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut nodes = tree.all_nodes();
    let left_tree = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("RatioExpr is missing its numerator", tree.span))?;
    let left = convert_expr(conv, source, left_tree)?;
    let right = nodes.next().map(|n| convert_expr(conv, source, n)).transpose()?;
    Ok(conv.spanned(
        Node::RatioExpr {
            left: boxed(left),
            right: right.map(boxed),
        },
        tree,
    ))
}

fn convert_array_join_clause(conv: &Converter, source: &str, tree: &Tree) -> Result<(String, Vec<Spanned>), HogQlError> {
    let op = if tree.has_token(TokenKind::Left) { "LEFT ARRAY JOIN" } else { "ARRAY JOIN" }.to_string();
    let list_tree = tree
        .node(Rule::ColumnExprList)
        .ok_or_else(|| HogQlError::parsing("ARRAY JOIN is missing its column list", tree.span))?;
    let list = convert_column_expr_list(conv, source, list_tree)?;
    Ok((op, list))
}

// ---------------------------------------------------------- order/limit

fn convert_order_expr_list(conv: &Converter, source: &str, tree: &Tree) -> Result<Vec<Spanned>, HogQlError> {
    tree.all_nodes().map(|n| convert_order_expr(conv, source, n)).collect()
}

pub fn convert_order_expr(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let expr_tree = tree
        .all_nodes()
        .next()
        .ok_or_else(|| HogQlError::parsing("OrderExpr has no expression", tree.span))?;
    let expr = convert_expr(conv, source, expr_tree)?;
    let order = if tree.has_token(TokenKind::Desc) { "DESC" } else { "ASC" }.to_string();
    Ok(conv.spanned(Node::OrderExpr { expr: boxed(expr), order }, tree))
}

struct LimitInfo {
    limit: Option<Spanned>,
    offset: Option<Spanned>,
    limit_with_ties: Option<bool>,
    limit_by: Option<Spanned>,
}

/// `LIMIT a, b` (ClickHouse's comma form, `a` = offset, `b` = length) and
/// `LIMIT a OFFSET b` (`a` = length, `b` = offset) read the same without the
/// marker token the parser now keeps — see the doc comment on the grammar's
/// `limit_clause` for why that token is preserved.
fn convert_limit_clause(conv: &Converter, source: &str, tree: &Tree) -> Result<LimitInfo, HogQlError> {
    if tree.rule == Rule::OffsetOnlyClause {
        let expr_tree = tree
            .all_nodes()
            .next()
            .ok_or_else(|| HogQlError::parsing("OFFSET is missing its value", tree.span))?;
        let offset = convert_expr(conv, source, expr_tree)?;
        return Ok(LimitInfo {
            limit: None,
            offset: Some(offset),
            limit_with_ties: None,
            limit_by: None,
        });
    }

    let mut nodes = tree.all_nodes();
    let first_tree = nodes
        .next()
        .ok_or_else(|| HogQlError::parsing("LIMIT is missing its value", tree.span))?;
    let first = convert_expr(conv, source, first_tree)?;

    let is_comma = tree.has_token(TokenKind::Comma);
    let is_offset_kw = tree.has_token(TokenKind::Offset);
    let (limit, offset) = if is_comma || is_offset_kw {
        let second_tree = nodes
            .next()
            .ok_or_else(|| HogQlError::parsing("LIMIT's second value is missing", tree.span))?;
        let second = convert_expr(conv, source, second_tree)?;
        if is_comma {
            (Some(second), Some(first))
        } else {
            (Some(first), Some(second))
        }
    } else {
        (Some(first), None)
    };

    let limit_with_ties = if tree.has_token(TokenKind::With) && tree.has_token(TokenKind::Ties) {
        Some(true)
    } else {
        None
    };

    let limit_by = if tree.has_token(TokenKind::By) {
        let by_tree = nodes
            .next()
            .ok_or_else(|| HogQlError::parsing("LIMIT ... BY is missing its column list", tree.span))?;
        let exprs = convert_column_expr_list(conv, source, by_tree)?;
        let n = limit
            .clone()
            .ok_or_else(|| HogQlError::parsing("LIMIT ... BY requires a limit value", tree.span))?;
        Some(conv.spanned(
            Node::LimitByExpr {
                n: boxed(n),
                offset_value: offset.clone().map(boxed),
                exprs,
            },
            tree,
        ))
    } else {
        None
    };

    Ok(LimitInfo { limit, offset, limit_with_ties, limit_by })
}

// ------------------------------------------------------------- windows

fn convert_window_clause(conv: &Converter, source: &str, tree: &Tree) -> Result<IndexMap<String, Spanned>, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let mut out = IndexMap::with_capacity(nodes.len() / 2);
    for pair in nodes.chunks(2) {
        match pair {
            [name_tree, body_tree] => {
                let name = identifier_text(source, name_tree)?;
                let body = convert_window_expr(conv, source, body_tree)?;
                out.insert(name, body);
            }
            _ => return Err(HogQlError::parsing("WINDOW clause has an unexpected shape", tree.span)),
        }
    }
    Ok(out)
}

/// The body of `OVER (…)` or a named `WINDOW` entry: `PARTITION BY … ORDER
/// BY … (ROWS|RANGE) …`, each optional and distinguished by rule tag alone.
pub fn convert_window_expr(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let partition_by = tree
        .node(Rule::ColumnExprList)
        .map(|n| convert_column_expr_list(conv, source, n))
        .transpose()?;
    let order_by = tree
        .node(Rule::OrderExprList)
        .map(|n| convert_order_expr_list(conv, source, n))
        .transpose()?;
    let (frame_method, frame_start, frame_end) = match tree.node(Rule::WinFrameClause) {
        Some(frame_tree) => convert_win_frame_clause(conv, source, frame_tree)?,
        None => (None, None, None),
    };
    Ok(conv.spanned(
        Node::WindowExpr {
            partition_by,
            order_by,
            frame_method,
            frame_start,
            frame_end,
        },
        tree,
    ))
}

type WinFrameParts = (Option<String>, Option<Box<Spanned>>, Option<Box<Spanned>>);

fn convert_win_frame_clause(conv: &Converter, source: &str, tree: &Tree) -> Result<WinFrameParts, HogQlError> {
    let frame_method = tree.children.iter().find_map(|c| match c {
        Child::Token(t) if t.kind == TokenKind::Rows => Some("ROWS".to_string()),
        Child::Token(t) if t.kind == TokenKind::Range => Some("RANGE".to_string()),
        _ => None,
    });
    let bounds: Vec<&Tree> = tree.all_nodes().collect();
    match bounds.as_slice() {
        [single] => {
            let start = convert_window_frame_bound(conv, source, single)?;
            Ok((frame_method, Some(boxed(start)), None))
        }
        [start, end] => {
            let start = convert_window_frame_bound(conv, source, start)?;
            let end = convert_window_frame_bound(conv, source, end)?;
            Ok((frame_method, Some(boxed(start)), Some(boxed(end))))
        }
        _ => Err(HogQlError::parsing("WinFrameClause has an unexpected shape", tree.span)),
    }
}

fn convert_window_frame_bound(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    if tree.has_token(TokenKind::Current) {
        return Ok(conv.spanned(
            Node::WindowFrameExpr {
                frame_type: "CURRENT ROW".to_string(),
                frame_value: None,
            },
            tree,
        ));
    }
    let direction = if tree.has_token(TokenKind::Preceding) {
        "PRECEDING"
    } else if tree.has_token(TokenKind::Following) {
        "FOLLOWING"
    } else {
        return Err(HogQlError::parsing("WindowFrameBound is missing PRECEDING/FOLLOWING", tree.span));
    };
    match tree.all_nodes().next() {
        Some(expr_tree) => {
            let value = convert_expr(conv, source, expr_tree)?;
            Ok(conv.spanned(
                Node::WindowFrameExpr {
                    frame_type: direction.to_string(),
                    frame_value: Some(boxed(value)),
                },
                tree,
            ))
        }
        None => Ok(conv.spanned(
            Node::WindowFrameExpr {
                frame_type: format!("UNBOUNDED {direction}"),
                frame_value: None,
            },
            tree,
        )),
    }
}
