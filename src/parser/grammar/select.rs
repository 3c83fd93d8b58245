//! `Select`, `SelectStmt`, joins, and every clause that hangs off a query:
//! `WITH`, `GROUP BY`, `ORDER BY`, `LIMIT`/`OFFSET`, `WINDOW`, `ARRAY JOIN`,
//! `SAMPLE`. Grounded on the same per-rule-function shape as
//! `column_expr.rs`; table/join structure is built close to the grammar
//! (`JoinExprTable`/`JoinExprOp`/`JoinExprCrossOp`/`JoinExprParens`) and
//! threaded into the `next_join` linked list later, by the converter
//! (spec §4.6) — the parser's job is only to recognize the shape.

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;
use crate::parser::grammar::{column_expr, hogqlx, literal};
use crate::parser::{node, Parser};
use crate::span::Span;

fn wrap(rule: Rule, span: Span, children: Vec<Child>) -> Tree {
    Tree { rule, span, children }
}

/// `Select`: a placeholder, a HogQLX tag, or a full `SelectSetStmt`.
pub fn select(p: &mut Parser) -> Result<Tree, HogQlError> {
    let _guard = p.enter()?;
    if literal::at_placeholder(p) {
        return literal::placeholder(p);
    }
    if hogqlx::at_tag_open(p) {
        return hogqlx::tag_element(p);
    }
    select_set_stmt(p)
}

fn select_set_stmt(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::SelectSetStmt, |p, children| {
        children.push(Child::Node(select_stmt_or_parens(p)?));
        while is_set_operator_start(p) {
            children.push(Child::Node(subsequent_select_set_clause(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn is_set_operator_start(p: &Parser) -> bool {
    matches!(p.peek(), TokenKind::Union | TokenKind::Intersect | TokenKind::Except)
}

fn subsequent_select_set_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::SubsequentSelectSetClause, |p, children| {
        match p.peek() {
            TokenKind::Union => {
                children.push(Child::Token(p.bump()));
                if matches!(p.peek(), TokenKind::All | TokenKind::Distinct) {
                    children.push(Child::Token(p.bump()));
                }
            }
            TokenKind::Intersect | TokenKind::Except => {
                children.push(Child::Token(p.bump()));
                if p.at(TokenKind::Distinct) {
                    children.push(Child::Token(p.bump()));
                }
            }
            _ => return Err(p.unexpected("UNION, INTERSECT, or EXCEPT")),
        }
        children.push(Child::Node(select_stmt_or_parens(p)?));
        Ok(())
    })?;
    Ok(tree)
}

fn select_stmt_or_parens(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::LParen) && p.peek_n(1) == TokenKind::Select {
        p.bump();
        let inner = select_set_stmt(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        return Ok(inner);
    }
    select_stmt(p)
}

/// `SelectStmt`: `SELECT [DISTINCT] columnExprList FROM … WHERE … GROUP BY
/// … HAVING … WINDOW … ORDER BY … LIMIT … ARRAY JOIN …`. Every clause is
/// optional except the leading `SELECT`; absent clauses simply contribute
/// no children, and the converter treats a missing child as `null`.
fn select_stmt(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::SelectStmt, |p, children| {
        if p.at(TokenKind::With) {
            children.push(Child::Node(with_expr_list(p)?));
        }
        children.push(Child::Token(p.expect(TokenKind::Select, "SELECT")?));
        if p.at(TokenKind::Distinct) {
            children.push(Child::Token(p.bump()));
        }
        if p.at(TokenKind::Top) {
            children.push(Child::Node(top_clause(p)?));
        }
        children.push(Child::Node(column_expr_list(p)?));

        if p.at(TokenKind::From) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(join_expr(p)?));
        }
        if matches!(p.peek(), TokenKind::Array) || is_left_array_join(p) {
            children.push(Child::Node(array_join_clause(p)?));
        }
        if p.at(TokenKind::Where) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        if p.at(TokenKind::Prewhere) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        if p.at(TokenKind::Group) {
            children.push(Child::Token(p.bump()));
            p.expect(TokenKind::By, "BY")?;
            children.push(Child::Node(column_expr_list(p)?));
        }
        if p.at(TokenKind::Having) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        if p.at(TokenKind::Window) {
            children.push(Child::Node(window_clause(p)?));
        }
        if p.at(TokenKind::Order) {
            children.push(Child::Node(order_expr_list_clause(p)?));
        }
        if p.at(TokenKind::Limit) || p.at(TokenKind::Offset) {
            children.push(Child::Node(limit_clause(p)?));
        }
        if p.at(TokenKind::Settings) {
            children.push(Child::Node(settings_clause(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn is_left_array_join(p: &Parser) -> bool {
    p.at(TokenKind::Left) && p.peek_n(1) == TokenKind::Array
}

/// Not part of the AST surface (spec §4.5 Non-goals); recorded so the
/// converter can raise `NotImplementedError` pointing at the right span.
fn top_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnExpr, |p, children| {
        children.push(Child::Token(p.expect(TokenKind::Top, "TOP")?));
        children.push(Child::Node(literal::number_literal(p)?));
        Ok(())
    })?;
    Ok(tree)
}

fn settings_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnExpr, |p, children| {
        children.push(Child::Token(p.expect(TokenKind::Settings, "SETTINGS")?));
        loop {
            children.push(Child::Node(literal::identifier(p)?));
            p.expect(TokenKind::Eq, "'='")?;
            children.push(Child::Node(column_expr::column_expr(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        Ok(())
    })?;
    Ok(tree)
}

/// `WITH name AS (subquery) | WITH expr AS name (, …)*`. Disambiguated per
/// entry: if `AS` is followed by `(`, it's a `WithExprSubquery`; the
/// `column` form (`WITH expr AS name`) parses the expression first.
fn with_expr_list(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WithExprList, |p, children| {
        p.expect(TokenKind::With, "WITH")?;
        loop {
            children.push(Child::Node(with_expr_entry(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        Ok(())
    })?;
    Ok(tree)
}

fn with_expr_entry(p: &mut Parser) -> Result<Tree, HogQlError> {
    if matches!(p.peek(), TokenKind::Ident) && p.peek_n(1) == TokenKind::As {
        let start = p.pos_checkpoint();
        let name = literal::identifier(p)?;
        p.bump();
        p.expect(TokenKind::LParen, "'('")?;
        let subquery = select_set_stmt(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::WithExprSubquery,
            Span::new(start, end),
            vec![Child::Node(name), Child::Node(subquery)],
        ));
    }
    let (_, tree) = node(p, Rule::WithExprColumn, |p, children| {
        children.push(Child::Node(column_expr::column_expr(p)?));
        p.expect(TokenKind::As, "AS")?;
        children.push(Child::Node(literal::identifier(p)?));
        Ok(())
    })?;
    Ok(tree)
}

/// `col (AS alias)? (, col (AS alias)?)*` — the `Alias` wrapping (if any)
/// happens in the converter per spec §4.7/§4.4 alias rules, since the
/// grammar's `columnExpr AS identifier` is just another `ColumnExpr` child
/// shape here (mirrors how every other binary-ish form is represented).
pub fn column_expr_list(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnExprList, |p, children| {
        if is_clause_boundary(p) {
            return Ok(());
        }
        loop {
            children.push(Child::Node(column_expr_maybe_aliased(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        Ok(())
    })?;
    Ok(tree)
}

fn column_expr_maybe_aliased(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let expr = column_expr::column_expr(p)?;
    let alias = if p.at(TokenKind::As) {
        p.bump();
        Some(literal::identifier(p)?)
    } else if matches!(p.peek(), TokenKind::Ident) {
        Some(literal::identifier(p)?)
    } else {
        None
    };
    match alias {
        Some(alias) => {
            let end = p.last_consumed_end();
            Ok(wrap(
                Rule::ColumnExpr,
                Span::new(start, end),
                vec![Child::Node(expr), Child::Node(alias)],
            ))
        }
        None => Ok(expr),
    }
}

fn is_clause_boundary(p: &Parser) -> bool {
    matches!(
        p.peek(),
        TokenKind::From
            | TokenKind::Where
            | TokenKind::Eof
            | TokenKind::RParen
            | TokenKind::Semicolon
    )
}

// ---------------------------------------------------------------- joins

fn join_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = join_expr_primary(p)?;
    loop {
        if p.at(TokenKind::Cross) && p.peek_n(1) == TokenKind::Join {
            let cross = p.bump();
            let join = p.bump();
            let right = join_expr_primary(p)?;
            let end = p.last_consumed_end();
            left = wrap(
                Rule::JoinExprCrossOp,
                Span::new(start, end),
                vec![Child::Node(left), Child::Token(cross), Child::Token(join), Child::Node(right)],
            );
        } else if is_join_op_start(p) {
            let mut op_tokens = Vec::new();
            while matches!(
                p.peek(),
                TokenKind::All
                    | TokenKind::Any
                    | TokenKind::Asof
                    | TokenKind::Inner
                    | TokenKind::Left
                    | TokenKind::Right
                    | TokenKind::Full
                    | TokenKind::Outer
                    | TokenKind::Semi
                    | TokenKind::Anti
            ) {
                op_tokens.push(Child::Token(p.bump()));
            }
            let join = p.expect(TokenKind::Join, "JOIN")?;
            let right = join_expr_primary(p)?;
            let constraint = if matches!(p.peek(), TokenKind::On | TokenKind::Using) {
                Some(join_constraint_clause(p)?)
            } else {
                None
            };
            let end = p.last_consumed_end();
            let mut children = vec![Child::Node(left)];
            children.extend(op_tokens);
            children.push(Child::Token(join));
            children.push(Child::Node(right));
            if let Some(c) = constraint {
                children.push(Child::Node(c));
            }
            left = wrap(Rule::JoinExprOp, Span::new(start, end), children);
        } else {
            break;
        }
    }
    Ok(left)
}

fn is_join_op_start(p: &Parser) -> bool {
    matches!(
        p.peek(),
        TokenKind::Join
            | TokenKind::All
            | TokenKind::Any
            | TokenKind::Asof
            | TokenKind::Inner
            | TokenKind::Left
            | TokenKind::Right
            | TokenKind::Full
            | TokenKind::Outer
            | TokenKind::Semi
            | TokenKind::Anti
    )
}

fn join_expr_primary(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::LParen) && p.peek_n(1) != TokenKind::Select {
        let start = p.pos_checkpoint();
        p.bump();
        let inner = join_expr(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        let end = p.last_consumed_end();
        return Ok(wrap(Rule::JoinExprParens, Span::new(start, end), vec![Child::Node(inner)]));
    }
    let start = p.pos_checkpoint();
    let table = table_expr(p)?;
    let final_tok = if p.at(TokenKind::Final) { Some(p.bump()) } else { None };
    let sample = if p.at(TokenKind::Sample) { Some(sample_clause(p)?) } else { None };
    let end = p.last_consumed_end();
    let mut children = vec![Child::Node(table)];
    if let Some(f) = final_tok {
        children.push(Child::Token(f));
    }
    if let Some(s) = sample {
        children.push(Child::Node(s));
    }
    Ok(wrap(Rule::JoinExprTable, Span::new(start, end), children))
}

fn join_constraint_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::JoinConstraintClause, |p, children| {
        match p.peek() {
            TokenKind::On => {
                children.push(Child::Token(p.bump()));
                children.push(Child::Node(column_expr::column_expr(p)?));
                while p.at(TokenKind::Comma) {
                    p.bump();
                    children.push(Child::Node(column_expr::column_expr(p)?));
                }
            }
            TokenKind::Using => {
                children.push(Child::Token(p.bump()));
                let paren = p.at(TokenKind::LParen);
                if paren {
                    p.bump();
                }
                children.push(Child::Node(column_expr::column_expr(p)?));
                while p.at(TokenKind::Comma) {
                    p.bump();
                    children.push(Child::Node(column_expr::column_expr(p)?));
                }
                if paren {
                    p.expect(TokenKind::RParen, "')'")?;
                }
            }
            _ => return Err(p.unexpected("ON or USING")),
        }
        Ok(())
    })?;
    Ok(tree)
}

fn table_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let base = if p.at(TokenKind::LParen) && p.peek_n(1) == TokenKind::Select {
        p.bump();
        let sel = select_set_stmt(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        let end = p.last_consumed_end();
        wrap(Rule::TableExprSubquery, Span::new(start, end), vec![Child::Node(sel)])
    } else if p.at(TokenKind::LParen) {
        p.bump();
        let inner = table_expr(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        inner
    } else {
        let tid = literal::table_identifier(p)?;
        if p.at(TokenKind::LParen) {
            let args = table_function_args(p)?;
            let end = p.last_consumed_end();
            wrap(Rule::TableExprFunction, Span::new(start, end), vec![Child::Node(tid), Child::Node(args)])
        } else {
            let end = p.last_consumed_end();
            wrap(Rule::TableExprIdentifier, Span::new(start, end), vec![Child::Node(tid)])
        }
    };

    if p.at(TokenKind::As) {
        p.bump();
        let alias = literal::identifier(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(Rule::TableExprAlias, Span::new(start, end), vec![Child::Node(base), Child::Node(alias)]));
    }
    Ok(base)
}

fn table_function_args(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnArgList, |p, children| {
        p.expect(TokenKind::LParen, "'('")?;
        while !p.at(TokenKind::RParen) {
            children.push(Child::Node(column_expr::column_expr(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        p.expect(TokenKind::RParen, "')'")?;
        Ok(())
    })?;
    Ok(tree)
}

fn sample_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::SampleClause, |p, children| {
        p.expect(TokenKind::Sample, "SAMPLE")?;
        children.push(Child::Node(ratio_expr(p)?));
        if p.at(TokenKind::Offset) {
            p.bump();
            children.push(Child::Node(ratio_expr(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn ratio_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::RatioExpr, |p, children| {
        children.push(Child::Node(literal::number_literal(p)?));
        if p.at(TokenKind::Slash) {
            p.bump();
            children.push(Child::Node(literal::number_literal(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

// ------------------------------------------------------- array join, order, limit

fn array_join_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ArrayJoinClause, |p, children| {
        if p.at(TokenKind::Left) {
            children.push(Child::Token(p.bump()));
        }
        children.push(Child::Token(p.expect(TokenKind::Array, "ARRAY")?));
        children.push(Child::Token(p.expect(TokenKind::Join, "JOIN")?));
        children.push(Child::Node(column_expr_list(p)?));
        Ok(())
    })?;
    Ok(tree)
}

fn order_expr_list_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::OrderExprList, |p, children| {
        p.expect(TokenKind::Order, "ORDER")?;
        p.expect(TokenKind::By, "BY")?;
        loop {
            children.push(Child::Node(order_expr(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        Ok(())
    })?;
    Ok(tree)
}

pub fn order_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::OrderExpr, |p, children| {
        children.push(Child::Node(column_expr::column_expr(p)?));
        if matches!(p.peek(), TokenKind::Asc | TokenKind::Desc) {
            children.push(Child::Token(p.bump()));
        }
        Ok(())
    })?;
    Ok(tree)
}

/// Covers `LIMIT a`, `LIMIT a, b`, `LIMIT a OFFSET b`, `LIMIT … WITH TIES`,
/// `LIMIT … BY …`, and bare `OFFSET b` (spec §4.5's offset/limit rules).
fn limit_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::Offset) {
        let (_, tree) = node(p, Rule::OffsetOnlyClause, |p, children| {
            p.bump();
            children.push(Child::Node(column_expr::column_expr(p)?));
            Ok(())
        })?;
        return Ok(tree);
    }
    let (_, tree) = node(p, Rule::LimitAndOffsetClause, |p, children| {
        p.expect(TokenKind::Limit, "LIMIT")?;
        let first = column_expr::column_expr(p)?;
        children.push(Child::Node(first));
        if p.at(TokenKind::Comma) {
            // `LIMIT offset, length` — ClickHouse's comma form reverses the
            // argument order from the `OFFSET` keyword form below, so the
            // comma itself is kept as a marker the converter can switch on.
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr::column_expr(p)?));
        } else if p.at(TokenKind::Offset) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        if p.at(TokenKind::With) && p.peek_n(1) == TokenKind::Ties {
            children.push(Child::Token(p.bump()));
            children.push(Child::Token(p.bump()));
        }
        if p.at(TokenKind::By) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr_list(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

// -------------------------------------------------------------- windows

fn window_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WindowExpr, |p, children| {
        p.expect(TokenKind::Window, "WINDOW")?;
        loop {
            children.push(Child::Node(literal::identifier(p)?));
            p.expect(TokenKind::As, "AS")?;
            p.expect(TokenKind::LParen, "'('")?;
            children.push(Child::Node(window_expr_body(p)?));
            p.expect(TokenKind::RParen, "')'")?;
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        Ok(())
    })?;
    Ok(tree)
}

/// The body of `OVER (…)`: `PARTITION BY … ORDER BY … (ROWS|RANGE) …`.
pub fn window_expr_body(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WindowExpr, |p, children| {
        if p.at(TokenKind::Partition) {
            p.bump();
            p.expect(TokenKind::By, "BY")?;
            children.push(Child::Node(column_expr_list(p)?));
        }
        if p.at(TokenKind::Order) {
            children.push(Child::Node(order_expr_list_clause(p)?));
        }
        if matches!(p.peek(), TokenKind::Rows | TokenKind::Range) {
            children.push(Child::Node(win_frame_clause(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn win_frame_clause(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WinFrameClause, |p, children| {
        children.push(Child::Token(p.bump()));
        if p.at(TokenKind::Between) {
            p.bump();
            children.push(Child::Node(window_frame_bound(p)?));
            p.expect(TokenKind::And, "AND")?;
            children.push(Child::Node(window_frame_bound(p)?));
        } else {
            children.push(Child::Node(window_frame_bound(p)?));
        }
        Ok(())
    })?;
    Ok(tree)
}

fn window_frame_bound(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::WindowFrameBound, |p, children| {
        if p.at(TokenKind::Current) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Token(p.expect(TokenKind::Row, "ROW")?));
            return Ok(());
        }
        if matches!(p.peek(), TokenKind::Ident) && p.current_text().eq_ignore_ascii_case("unbounded") {
            children.push(Child::Token(p.bump()));
        } else {
            children.push(Child::Node(column_expr::column_expr(p)?));
        }
        if matches!(p.peek(), TokenKind::Preceding | TokenKind::Following) {
            children.push(Child::Token(p.bump()));
        } else {
            return Err(p.unexpected("PRECEDING or FOLLOWING"));
        }
        Ok(())
    })?;
    Ok(tree)
}
