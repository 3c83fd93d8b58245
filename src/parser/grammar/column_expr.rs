//! `ColumnExpr`: the full expression grammar, precedence lowest to highest.
//! One function per tier (spec §4.7), each delegating to the next tier and
//! looping on left-associative operators at its own level — the classic
//! recursive-descent precedence ladder, not a generic Pratt loop, matching
//! `parser/grammar/value.rs`'s per-rule-function style.
//!
//! Every node here is tagged generically as `Rule::ColumnExpr`; which
//! production matched is recovered by the converter from the children it
//! finds (an operator token, a keyword, a particular shape) rather than a
//! dedicated `Rule` variant per alternative — mirroring spec §4.7's "the
//! converter only emits node kinds; precedence is handled entirely by the
//! grammar".

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::TokenKind;
use crate::parser::grammar::{hogqlx, literal};
use crate::parser::{node, Parser};
use crate::span::Span;

/// Tightest to loosest: multiplicative, additive, compare, ternary, not,
/// and, or. `NOT` sits between comparison and `AND` (spec SPEC_FULL.md §B);
/// ternary sits between comparison and the logical tier (spec §4.7's tier
/// listing order).
pub fn column_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let _guard = p.enter()?;
    or_expr(p)
}

fn wrap(rule: Rule, span: Span, children: Vec<Child>) -> Tree {
    Tree { rule, span, children }
}

fn or_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = and_expr(p)?;
    while p.at(TokenKind::Or) {
        let op = p.bump();
        let right = and_expr(p)?;
        let end = p.last_consumed_end();
        left = wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Node(left), Child::Token(op), Child::Node(right)],
        );
    }
    Ok(left)
}

fn and_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = not_expr(p)?;
    while p.at(TokenKind::And) {
        let op = p.bump();
        let right = not_expr(p)?;
        let end = p.last_consumed_end();
        left = wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Node(left), Child::Token(op), Child::Node(right)],
        );
    }
    Ok(left)
}

/// `NOT` binds tighter than `AND`/`OR` but looser than comparisons (spec
/// SPEC_FULL.md §B). A bare `NOT expr` never flattens into `And`/`Or`.
fn not_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::Not) {
        let start = p.pos_checkpoint();
        let not = p.bump();
        let inner = not_expr(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Token(not), Child::Node(inner)],
        ));
    }
    ternary(p)
}

fn ternary(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let cond = compare(p)?;
    if p.at(TokenKind::Question) {
        let q = p.bump();
        let then = ternary(p)?;
        let colon = p.expect(TokenKind::Colon, "':'")?;
        let else_ = ternary(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![
                Child::Node(cond),
                Child::Token(q),
                Child::Node(then),
                Child::Token(colon),
                Child::Node(else_),
            ],
        ));
    }
    Ok(cond)
}

const COMPARE_OPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::NotEq,
    TokenKind::Lt,
    TokenKind::LtEq,
    TokenKind::Gt,
    TokenKind::GtEq,
    TokenKind::RegexMatch,
    TokenKind::RegexNotMatch,
    TokenKind::IRegexMatch,
    TokenKind::IRegexNotMatch,
];

fn compare(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let left = additive(p)?;

    if COMPARE_OPS.contains(&p.peek()) {
        let op = p.bump();
        let right = additive(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Node(left), Child::Token(op), Child::Node(right)],
        ));
    }

    if p.at(TokenKind::Is) {
        let is = p.bump();
        let not = if p.at(TokenKind::Not) { Some(p.bump()) } else { None };
        let null = p.expect(TokenKind::Null, "NULL")?;
        let end = p.last_consumed_end();
        let mut children = vec![Child::Node(left), Child::Token(is)];
        if let Some(not) = not {
            children.push(Child::Token(not));
        }
        children.push(Child::Token(null));
        return Ok(wrap(Rule::ColumnExpr, Span::new(start, end), children));
    }

    let negated = if p.at(TokenKind::Not) { Some(p.bump()) } else { None };

    if p.at(TokenKind::Between) {
        let bw = p.bump();
        let low = additive(p)?;
        let and_tok = p.expect(TokenKind::And, "AND")?;
        let high = additive(p)?;
        let end = p.last_consumed_end();
        let mut children = vec![];
        if let Some(n) = negated {
            children.push(Child::Token(n));
        }
        children.push(Child::Node(left));
        children.push(Child::Token(bw));
        children.push(Child::Node(low));
        children.push(Child::Token(and_tok));
        children.push(Child::Node(high));
        return Ok(wrap(Rule::ColumnExprBetween, Span::new(start, end), children));
    }

    if let Some(kind) = match p.peek() {
        TokenKind::Like => Some(TokenKind::Like),
        TokenKind::Ilike => Some(TokenKind::Ilike),
        TokenKind::In => Some(TokenKind::In),
        _ => None,
    } {
        let op = p.bump();
        let in_cohort = kind == TokenKind::In && p.at(TokenKind::Cohort);
        let cohort = if in_cohort { Some(p.bump()) } else { None };
        let right = additive(p)?;
        let end = p.last_consumed_end();
        let mut children = vec![];
        if let Some(n) = negated {
            children.push(Child::Token(n));
        }
        children.push(Child::Node(left));
        children.push(Child::Token(op));
        if let Some(c) = cohort {
            children.push(Child::Token(c));
        }
        children.push(Child::Node(right));
        return Ok(wrap(Rule::ColumnExpr, Span::new(start, end), children));
    }

    if negated.is_some() {
        return Err(p.unexpected("LIKE, ILIKE, IN, or BETWEEN after NOT"));
    }

    Ok(left)
}

fn additive(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = multiplicative(p)?;
    loop {
        if matches!(p.peek(), TokenKind::Plus | TokenKind::Minus | TokenKind::Concat) {
            let op = p.bump();
            let right = multiplicative(p)?;
            let end = p.last_consumed_end();
            left = wrap(
                Rule::ColumnExpr,
                Span::new(start, end),
                vec![Child::Node(left), Child::Token(op), Child::Node(right)],
            );
        } else {
            break;
        }
    }
    Ok(left)
}

fn multiplicative(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = unary(p)?;
    loop {
        if matches!(p.peek(), TokenKind::Star | TokenKind::Slash | TokenKind::Percent) {
            let op = p.bump();
            let right = unary(p)?;
            let end = p.last_consumed_end();
            left = wrap(
                Rule::ColumnExpr,
                Span::new(start, end),
                vec![Child::Node(left), Child::Token(op), Child::Node(right)],
            );
        } else {
            break;
        }
    }
    Ok(left)
}

fn is_non_finite_word(text: &str) -> bool {
    matches!(text.to_ascii_lowercase().as_str(), "inf" | "nan")
}

fn unary(p: &mut Parser) -> Result<Tree, HogQlError> {
    if p.at(TokenKind::Minus)
        && p.peek_n(1) == TokenKind::Ident
        && is_non_finite_word(p.nth_text(1))
    {
        let start = p.pos_checkpoint();
        let minus = p.bump();
        let word = p.bump();
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::NumberLiteral,
            Span::new(start, end),
            vec![Child::Token(minus), Child::Token(word)],
        ));
    }
    if p.at(TokenKind::Minus) {
        let start = p.pos_checkpoint();
        let minus = p.bump();
        let operand = unary(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Token(minus), Child::Node(operand)],
        ));
    }
    nullish(p)
}

fn nullish(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut left = postfix(p)?;
    while p.at(TokenKind::Nullish) {
        let op = p.bump();
        let right = postfix(p)?;
        let end = p.last_consumed_end();
        left = wrap(
            Rule::ColumnExpr,
            Span::new(start, end),
            vec![Child::Node(left), Child::Token(op), Child::Node(right)],
        );
    }
    Ok(left)
}

/// Postfix chain: property/array/tuple access and call application, applied
/// left to right onto a primary expression.
fn postfix(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let mut base = primary(p)?;
    loop {
        match p.peek() {
            TokenKind::Dot => {
                let dot = p.bump();
                if matches!(p.peek(), TokenKind::IntLiteral) {
                    let idx = p.bump();
                    let end = p.last_consumed_end();
                    base = wrap(
                        Rule::ColumnExpr,
                        Span::new(start, end),
                        vec![Child::Node(base), Child::Token(dot), Child::Token(idx)],
                    );
                } else {
                    let name = literal::identifier(p)?;
                    let end = p.last_consumed_end();
                    base = wrap(
                        Rule::ColumnExpr,
                        Span::new(start, end),
                        vec![Child::Node(base), Child::Token(dot), Child::Node(name)],
                    );
                }
            }
            TokenKind::QuestionDot => {
                let dot = p.bump();
                let name = literal::identifier(p)?;
                let end = p.last_consumed_end();
                base = wrap(
                    Rule::ColumnExpr,
                    Span::new(start, end),
                    vec![Child::Node(base), Child::Token(dot), Child::Node(name)],
                );
            }
            TokenKind::LBracket => {
                let lb = p.bump();
                let index = column_expr(p)?;
                let rb = p.expect(TokenKind::RBracket, "']'")?;
                let end = p.last_consumed_end();
                base = wrap(
                    Rule::ColumnExpr,
                    Span::new(start, end),
                    vec![
                        Child::Node(base),
                        Child::Token(lb),
                        Child::Node(index),
                        Child::Token(rb),
                    ],
                );
            }
            TokenKind::QuestionLBracket => {
                let lb = p.bump();
                let index = column_expr(p)?;
                let rb = p.expect(TokenKind::RBracket, "']'")?;
                let end = p.last_consumed_end();
                base = wrap(
                    Rule::ColumnExpr,
                    Span::new(start, end),
                    vec![
                        Child::Node(base),
                        Child::Token(lb),
                        Child::Node(index),
                        Child::Token(rb),
                    ],
                );
            }
            TokenKind::LParen => {
                base = call_application(p, start, base)?;
            }
            _ => break,
        }
    }
    Ok(base)
}

/// `expr(args)` applied to an already-parsed expression (`ColumnExprCall`),
/// except when `expr` is a single bare identifier, which the caller treats
/// as a named function call instead — see `column_expr_function` for the
/// identifier-led case, which never reaches here.
fn call_application(p: &mut Parser, start: u32, base: Tree) -> Result<Tree, HogQlError> {
    if is_select_ahead(p) {
        p.bump();
        let select = super::select::select(p)?;
        p.expect(TokenKind::RParen, "')'")?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExprCallSelect,
            Span::new(start, end),
            vec![Child::Node(base), Child::Node(select)],
        ));
    }
    let args = arg_list(p, Rule::ColumnArgList)?;
    let end = p.last_consumed_end();
    Ok(wrap(
        Rule::ColumnExprCall,
        Span::new(start, end),
        vec![Child::Node(base), Child::Node(args)],
    ))
}

fn is_select_ahead(p: &Parser) -> bool {
    p.at(TokenKind::LParen) && p.peek_n(1) == TokenKind::Select
}

/// `( expr (, expr)* )`, possibly empty.
fn arg_list(p: &mut Parser, rule: Rule) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, rule, |p, children| {
        p.expect(TokenKind::LParen, "'('")?;
        if p.at(TokenKind::Distinct) {
            children.push(Child::Token(p.bump()));
        }
        while !p.at(TokenKind::RParen) {
            children.push(Child::Node(column_expr(p)?));
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

fn primary(p: &mut Parser) -> Result<Tree, HogQlError> {
    match p.peek() {
        TokenKind::LParen => paren_or_tuple(p),
        TokenKind::LBracket => array_literal(p),
        TokenKind::LBrace => dict_or_placeholder(p),
        TokenKind::IntLiteral | TokenKind::FloatLiteral => literal::number_literal(p),
        TokenKind::StringLiteral => literal::string_literal(p),
        TokenKind::QuotedIdent => literal::column_identifier(p),
        TokenKind::Null | TokenKind::True | TokenKind::False => atom_keyword(p),
        TokenKind::Case => case_expr(p),
        TokenKind::Trim | TokenKind::Leading | TokenKind::Trailing | TokenKind::Both => trim_expr(p),
        TokenKind::Interval => interval_expr(p),
        TokenKind::Star => asterisk(p),
        TokenKind::Lt if hogqlx::at_tag_open(p) => hogqlx::tag_element(p),
        TokenKind::Ident => identifier_led(p),
        _ => Err(p.unexpected("an expression")),
    }
}

fn paren_or_tuple(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    p.bump();
    let first = column_expr(p)?;
    if p.at(TokenKind::Comma) {
        let mut items = vec![Child::Node(first)];
        while p.at(TokenKind::Comma) {
            p.bump();
            if p.at(TokenKind::RParen) {
                break;
            }
            items.push(Child::Node(column_expr(p)?));
        }
        p.expect(TokenKind::RParen, "')'")?;
        let end = p.last_consumed_end();
        return Ok(wrap(Rule::Tuple, Span::new(start, end), items));
    }
    p.expect(TokenKind::RParen, "')'")?;
    Ok(first)
}

fn array_literal(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::Array, |p, children| {
        p.expect(TokenKind::LBracket, "'['")?;
        while !p.at(TokenKind::RBracket) {
            children.push(Child::Node(column_expr(p)?));
            if p.at(TokenKind::Comma) {
                p.bump();
            } else {
                break;
            }
        }
        p.expect(TokenKind::RBracket, "']'")?;
        Ok(())
    })?;
    Ok(tree)
}

/// `{expr}` is a placeholder; `{k: v, …}` is a `Dict` — disambiguated by a
/// `:` following the first expression.
fn dict_or_placeholder(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    p.bump();
    if p.at(TokenKind::RBrace) {
        p.bump();
        let end = p.last_consumed_end();
        return Ok(wrap(Rule::Dict, Span::new(start, end), Vec::new()));
    }
    let first_key = column_expr(p)?;
    if p.at(TokenKind::Colon) {
        p.bump();
        let first_val = column_expr(p)?;
        let mut items = vec![Child::Node(first_key), Child::Node(first_val)];
        while p.at(TokenKind::Comma) {
            p.bump();
            if p.at(TokenKind::RBrace) {
                break;
            }
            let k = column_expr(p)?;
            p.expect(TokenKind::Colon, "':'")?;
            let v = column_expr(p)?;
            items.push(Child::Node(k));
            items.push(Child::Node(v));
        }
        p.expect(TokenKind::RBrace, "'}'")?;
        let end = p.last_consumed_end();
        return Ok(wrap(Rule::Dict, Span::new(start, end), items));
    }
    p.expect(TokenKind::RBrace, "'}'")?;
    let end = p.last_consumed_end();
    Ok(wrap(
        Rule::Placeholder,
        Span::new(start, end),
        vec![Child::Node(first_key)],
    ))
}

fn atom_keyword(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let tok = p.bump();
    let end = p.last_consumed_end();
    Ok(wrap(Rule::ColumnExpr, Span::new(start, end), vec![Child::Token(tok)]))
}

fn asterisk(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let star = p.bump();
    let end = p.last_consumed_end();
    Ok(wrap(Rule::ColumnExpr, Span::new(start, end), vec![Child::Token(star)]))
}

/// Identifiers lead into several distinct productions: a bare/dotted field
/// reference, a function call (`name(args)` / `name(params)(args)`), or a
/// window function (`name(args) OVER …`). Parsed together since they all
/// start the same way and only diverge after the identifier.
fn identifier_led(p: &mut Parser) -> Result<Tree, HogQlError> {
    if is_non_finite_word(p.current_text())
        && !matches!(p.peek_n(1), TokenKind::Dot | TokenKind::LParen | TokenKind::QuestionDot)
    {
        let start = p.pos_checkpoint();
        let word = p.bump();
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::NumberLiteral,
            Span::new(start, end),
            vec![Child::Token(word)],
        ));
    }

    let start = p.pos_checkpoint();
    let first = literal::identifier(p)?;

    if p.at(TokenKind::Dot) || p.at(TokenKind::QuestionDot) {
        return column_identifier_tail(p, start, first);
    }

    if p.at(TokenKind::LParen) {
        return function_call(p, start, first);
    }

    let end = p.last_consumed_end();
    Ok(wrap(
        Rule::ColumnIdentifier,
        Span::new(start, end),
        vec![Child::Node(first)],
    ))
}

fn column_identifier_tail(p: &mut Parser, start: u32, first: Tree) -> Result<Tree, HogQlError> {
    let mut children = vec![Child::Node(first)];
    loop {
        match p.peek() {
            TokenKind::Dot => {
                children.push(Child::Token(p.bump()));
                if p.at(TokenKind::Star) {
                    children.push(Child::Token(p.bump()));
                    break;
                }
                children.push(Child::Node(literal::identifier(p)?));
            }
            _ => break,
        }
    }
    let end = p.last_consumed_end();
    Ok(wrap(Rule::ColumnIdentifier, Span::new(start, end), children))
}

fn function_call(p: &mut Parser, start: u32, name: Tree) -> Result<Tree, HogQlError> {
    if is_select_ahead(p) {
        let base = wrap(Rule::ColumnIdentifier, name.span, vec![Child::Node(name)]);
        return call_application(p, start, base);
    }
    let first_args = arg_list(p, Rule::ColumnArgList)?;

    if p.at(TokenKind::LParen) {
        // `name(params)(args)`: first group was parameters.
        let second_args = arg_list(p, Rule::ColumnArgList)?;
        let end = p.last_consumed_end();
        let params = Tree {
            rule: Rule::ColumnParamList,
            span: first_args.span,
            children: first_args.children,
        };
        return Ok(wrap(
            Rule::ColumnExprFunction,
            Span::new(start, end),
            vec![Child::Node(name), Child::Node(params), Child::Node(second_args)],
        ));
    }

    if p.at(TokenKind::Over) {
        let over = p.bump();
        if p.at(TokenKind::LParen) {
            p.bump();
            let window = super::select::window_expr_body(p)?;
            p.expect(TokenKind::RParen, "')'")?;
            let end = p.last_consumed_end();
            return Ok(wrap(
                Rule::ColumnExprWinFunction,
                Span::new(start, end),
                vec![Child::Node(name), Child::Node(first_args), Child::Token(over), Child::Node(window)],
            ));
        }
        let target = literal::identifier(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExprWinFunctionTarget,
            Span::new(start, end),
            vec![Child::Node(name), Child::Node(first_args), Child::Token(over), Child::Node(target)],
        ));
    }

    let end = p.last_consumed_end();
    Ok(wrap(
        Rule::ColumnExprFunction,
        Span::new(start, end),
        vec![Child::Node(name), Child::Node(first_args)],
    ))
}

fn case_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnExprCase, |p, children| {
        children.push(Child::Token(p.expect(TokenKind::Case, "CASE")?));
        if !p.at(TokenKind::When) {
            children.push(Child::Node(column_expr(p)?));
        }
        while p.at(TokenKind::When) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr(p)?));
            children.push(Child::Token(p.expect(TokenKind::Then, "THEN")?));
            children.push(Child::Node(column_expr(p)?));
        }
        if p.at(TokenKind::Else) {
            children.push(Child::Token(p.bump()));
            children.push(Child::Node(column_expr(p)?));
        }
        children.push(Child::Token(p.expect(TokenKind::End, "END")?));
        Ok(())
    })?;
    Ok(tree)
}

fn trim_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let (_, tree) = node(p, Rule::ColumnExprTrim, |p, children| {
        if matches!(p.peek(), TokenKind::Leading | TokenKind::Trailing | TokenKind::Both) {
            children.push(Child::Token(p.bump()));
        }
        children.push(Child::Token(p.expect(TokenKind::Trim, "TRIM")?));
        p.expect(TokenKind::LParen, "'('")?;
        if matches!(p.peek(), TokenKind::StringLiteral) && p.peek_n(1) == TokenKind::From {
            children.push(Child::Node(literal::string_literal(p)?));
            children.push(Child::Token(p.bump()));
        }
        children.push(Child::Node(column_expr(p)?));
        p.expect(TokenKind::RParen, "')'")?;
        Ok(())
    })?;
    Ok(tree)
}

fn interval_expr(p: &mut Parser) -> Result<Tree, HogQlError> {
    let start = p.pos_checkpoint();
    let interval = p.expect(TokenKind::Interval, "INTERVAL")?;
    if p.at(TokenKind::StringLiteral) {
        let text = literal::string_literal(p)?;
        let end = p.last_consumed_end();
        return Ok(wrap(
            Rule::ColumnExprIntervalString,
            Span::new(start, end),
            vec![Child::Token(interval), Child::Node(text)],
        ));
    }
    let amount = additive(p)?;
    let unit = literal::identifier(p)?;
    let end = p.last_consumed_end();
    Ok(wrap(
        Rule::ColumnExprInterval,
        Span::new(start, end),
        vec![Child::Token(interval), Child::Node(amount), Child::Node(unit)],
    ))
}
