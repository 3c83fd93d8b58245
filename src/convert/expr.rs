//! `ColumnExpr` and its generic-shape siblings (spec §4.6-§4.9): the bulk of
//! the converter. `Rule::ColumnExpr` is reused by the grammar for nearly
//! every binary/unary/ternary/postfix form, so this module recovers "which
//! production matched" the same way the parser built it — by inspecting the
//! operator token and child shape — rather than from a dedicated `Rule` per
//! alternative.

use crate::ast::{Node, Spanned};
use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

use super::{chain_of, decode_identifier_token, identifier_text, Converter};

pub fn convert_expr(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    match tree.rule {
        Rule::ColumnExpr => convert_generic(conv, source, tree),
        Rule::ColumnIdentifier => convert_column_identifier(conv, source, tree),
        Rule::Identifier => {
            let chain = vec![identifier_text(source, tree)?];
            Ok(conv.spanned(Node::Field { chain }, tree))
        }
        Rule::Placeholder => convert_placeholder(conv, source, tree),
        Rule::NumberLiteral => convert_number_literal(conv, source, tree),
        Rule::StringLiteralRule => convert_string_literal(conv, source, tree),
        Rule::Array => convert_list(conv, source, tree, |exprs| Node::Array { exprs }),
        Rule::Tuple => convert_list(conv, source, tree, |exprs| Node::Tuple { exprs }),
        Rule::Dict => convert_dict(conv, source, tree),
        Rule::ColumnExprCase => convert_case(conv, source, tree),
        Rule::ColumnExprFunction => convert_function(conv, source, tree),
        Rule::ColumnExprCall => convert_call(conv, source, tree),
        Rule::ColumnExprCallSelect => convert_call_select(conv, source, tree),
        Rule::ColumnExprWinFunction => convert_win_function(conv, source, tree, false),
        Rule::ColumnExprWinFunctionTarget => convert_win_function(conv, source, tree, true),
        Rule::ColumnExprTrim => convert_trim(conv, source, tree),
        Rule::ColumnExprInterval => convert_interval(conv, source, tree),
        Rule::ColumnExprIntervalString => convert_interval_string(conv, source, tree),
        Rule::ColumnExprBetween => convert_between(conv, source, tree),
        Rule::HogqlxTagElementClosed | Rule::HogqlxTagElementNested => {
            super::hogqlx::convert_tag(conv, source, tree)
        }
        Rule::FullTemplateString | Rule::TemplateString => convert_template_string(conv, source, tree),
        _ => Err(HogQlError::parsing(
            format!("unexpected rule {:?} in expression position", tree.rule),
            tree.span,
        )),
    }
}

fn boxed(s: Spanned) -> Box<Spanned> {
    Box::new(s)
}

// ------------------------------------------------------------- generic ColumnExpr

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

fn compare_op_str(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Eq => "=",
        TokenKind::NotEq => "!=",
        TokenKind::Lt => "<",
        TokenKind::LtEq => "<=",
        TokenKind::Gt => ">",
        TokenKind::GtEq => ">=",
        TokenKind::RegexMatch => "=~",
        TokenKind::RegexNotMatch => "!~",
        TokenKind::IRegexMatch => "=~*",
        TokenKind::IRegexNotMatch => "!~*",
        _ => unreachable!("not a comparison operator"),
    }
}

fn arithmetic_op_str(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn as_node(c: &Child) -> Option<&Tree> {
    match c {
        Child::Node(t) => Some(t),
        _ => None,
    }
}

fn as_token(c: &Child) -> Option<&Token> {
    match c {
        Child::Token(t) => Some(t),
        _ => None,
    }
}

/// Recovers which production matched a generic `Rule::ColumnExpr` node from
/// the token/child shape present, mirroring the order `column_expr.rs` built
/// it in.
fn convert_generic(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let ch = &tree.children;

    if ch.len() == 5 {
        if let [Child::Node(cond), Child::Token(q), Child::Node(then), Child::Token(_), Child::Node(else_)] =
            ch.as_slice()
        {
            if q.kind == TokenKind::Question {
                let cond = convert_expr(conv, source, cond)?;
                let then = convert_expr(conv, source, then)?;
                let else_ = convert_expr(conv, source, else_)?;
                return Ok(conv.spanned(
                    Node::Call {
                        name: "if".into(),
                        args: vec![cond, then, else_],
                        params: None,
                        distinct: None,
                    },
                    tree,
                ));
            }
        }
        if let [Child::Token(not), Child::Node(left), Child::Token(op), Child::Token(cohort), Child::Node(right)] =
            ch.as_slice()
        {
            if not.kind == TokenKind::Not && cohort.kind == TokenKind::Cohort {
                return convert_like_in(conv, source, tree, true, left, op.kind, true, right);
            }
        }
    }

    if ch.len() == 4 {
        if let [Child::Node(left), Child::Token(is), Child::Token(not), Child::Token(null)] = ch.as_slice() {
            if is.kind == TokenKind::Is && not.kind == TokenKind::Not && null.kind == TokenKind::Null {
                return convert_is_null(conv, source, tree, left, true);
            }
        }
        if let [Child::Token(not), Child::Node(left), Child::Token(op), Child::Node(right)] = ch.as_slice() {
            if not.kind == TokenKind::Not && matches!(op.kind, TokenKind::Like | TokenKind::Ilike | TokenKind::In) {
                return convert_like_in(conv, source, tree, true, left, op.kind, false, right);
            }
        }
        if let [Child::Node(left), Child::Token(op), Child::Token(cohort), Child::Node(right)] = ch.as_slice() {
            if op.kind == TokenKind::In && cohort.kind == TokenKind::Cohort {
                return convert_like_in(conv, source, tree, false, left, op.kind, true, right);
            }
        }
        if let [Child::Node(base), Child::Token(lb), Child::Node(idx), Child::Token(_rb)] = ch.as_slice() {
            let nullish = lb.kind == TokenKind::QuestionLBracket;
            if lb.kind == TokenKind::LBracket || nullish {
                let array = convert_expr(conv, source, base)?;
                let index = convert_expr(conv, source, idx)?;
                return Ok(conv.spanned(
                    Node::ArrayAccess {
                        array: boxed(array),
                        property: boxed(index),
                        nullish: if nullish { Some(true) } else { None },
                    },
                    tree,
                ));
            }
        }
    }

    if ch.len() == 3 {
        if let [Child::Node(left), Child::Token(op), Child::Node(right)] = ch.as_slice() {
            match op.kind {
                TokenKind::Or => return convert_or(conv, source, tree, left, right),
                TokenKind::And => return convert_and(conv, source, tree, left, right),
                TokenKind::Nullish => {
                    let cond = convert_expr(conv, source, left)?;
                    let alt = convert_expr(conv, source, right)?;
                    return Ok(conv.spanned(
                        Node::Call {
                            name: "ifNull".into(),
                            args: vec![cond, alt],
                            params: None,
                            distinct: None,
                        },
                        tree,
                    ));
                }
                TokenKind::Concat => return convert_concat(conv, source, tree, left, right),
                k if COMPARE_OPS.contains(&k) => {
                    let l = convert_expr(conv, source, left)?;
                    let r = convert_expr(conv, source, right)?;
                    return Ok(conv.spanned(
                        Node::CompareOperation {
                            left: boxed(l),
                            right: boxed(r),
                            op: compare_op_str(k).to_string(),
                        },
                        tree,
                    ));
                }
                TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
                    let l = convert_expr(conv, source, left)?;
                    let r = convert_expr(conv, source, right)?;
                    return Ok(conv.spanned(
                        Node::ArithmeticOperation {
                            left: boxed(l),
                            right: boxed(r),
                            op: arithmetic_op_str(op.kind).to_string(),
                        },
                        tree,
                    ));
                }
                TokenKind::Like | TokenKind::Ilike | TokenKind::In => {
                    return convert_like_in(conv, source, tree, false, left, op.kind, false, right);
                }
                _ => {}
            }
        }
        if let [Child::Node(left), Child::Token(is), Child::Token(null)] = ch.as_slice() {
            if is.kind == TokenKind::Is && null.kind == TokenKind::Null {
                return convert_is_null(conv, source, tree, left, false);
            }
        }
        if let [Child::Node(base), Child::Token(dot), Child::Token(idx)] = ch.as_slice() {
            if dot.kind == TokenKind::Dot && idx.kind == TokenKind::IntLiteral {
                let tuple = convert_expr(conv, source, base)?;
                let text = &source[idx.span.start as usize..idx.span.end as usize];
                let index: i64 = text.parse().map_err(|_| {
                    HogQlError::parsing(format!("invalid tuple index {text:?}"), idx.span)
                })?;
                return Ok(conv.spanned(
                    Node::TupleAccess {
                        tuple: boxed(tuple),
                        index,
                        nullish: None,
                    },
                    tree,
                ));
            }
        }
        if let [Child::Node(base), Child::Token(dot), Child::Node(name)] = ch.as_slice() {
            if dot.kind == TokenKind::Dot || dot.kind == TokenKind::QuestionDot {
                let array = convert_expr(conv, source, base)?;
                let field_name = identifier_text(source, name)?;
                return Ok(conv.spanned(
                    Node::ArrayAccess {
                        array: boxed(array),
                        property: boxed(conv.spanned(
                            Node::Constant {
                                value: crate::ast::Constant::String(field_name),
                                value_type: None,
                            },
                            name,
                        )),
                        nullish: if dot.kind == TokenKind::QuestionDot { Some(true) } else { None },
                    },
                    tree,
                ));
            }
        }
    }

    if ch.len() == 2 {
        if let [Child::Token(not), Child::Node(inner)] = ch.as_slice() {
            if not.kind == TokenKind::Not {
                let inner = convert_expr(conv, source, inner)?;
                return Ok(conv.spanned(Node::Not { expr: boxed(inner) }, tree));
            }
        }
        if let [Child::Token(minus), Child::Node(operand)] = ch.as_slice() {
            if minus.kind == TokenKind::Minus {
                let operand = convert_expr(conv, source, operand)?;
                let zero = conv.spanned(
                    Node::Constant {
                        value: crate::ast::Constant::Int(0),
                        value_type: None,
                    },
                    tree,
                );
                return Ok(conv.spanned(
                    Node::ArithmeticOperation {
                        left: boxed(zero),
                        right: boxed(operand),
                        op: "-".to_string(),
                    },
                    tree,
                ));
            }
        }
        if let [Child::Node(expr_tree), Child::Node(alias_tree)] = ch.as_slice() {
            let expr = convert_expr(conv, source, expr_tree)?;
            let alias = identifier_text(source, alias_tree)?;
            conv.check_not_reserved(&alias, alias_tree.span)?;
            return Ok(conv.spanned(Node::Alias { expr: boxed(expr), alias }, tree));
        }
    }

    if ch.len() == 1 {
        if let Some(tok) = as_token(&ch[0]) {
            return convert_atom_token(conv, tree, tok);
        }
    }

    Err(HogQlError::parsing(
        format!("unrecognized ColumnExpr shape with {} children", ch.len()),
        tree.span,
    ))
}

fn convert_atom_token(conv: &Converter, tree: &Tree, tok: &Token) -> Result<Spanned, HogQlError> {
    use crate::ast::Constant;
    let value = match tok.kind {
        TokenKind::Null => Constant::Null,
        TokenKind::True => Constant::Bool(true),
        TokenKind::False => Constant::Bool(false),
        TokenKind::Star => return Ok(conv.spanned(Node::Field { chain: vec!["*".to_string()] }, tree)),
        _ => {
            return Err(HogQlError::parsing(
                format!("unexpected atom token {:?}", tok.kind),
                tree.span,
            ))
        }
    };
    Ok(conv.spanned(Node::Constant { value, value_type: None }, tree))
}

/// Flattens nested same-operator chains into a single `n`-ary node (spec
/// §4.9): `a OR b OR c` becomes one `Or{exprs:[a,b,c]}`, not `Or{Or{a,b},c}`.
fn convert_or(conv: &Converter, source: &str, tree: &Tree, left: &Tree, right: &Tree) -> Result<Spanned, HogQlError> {
    let left = convert_expr(conv, source, left)?;
    let right = convert_expr(conv, source, right)?;
    let mut exprs = Vec::new();
    match left.node {
        Node::Or { exprs: inner } => exprs.extend(inner),
        _ => exprs.push(left),
    }
    match right.node {
        Node::Or { exprs: inner } => exprs.extend(inner),
        _ => exprs.push(right),
    }
    Ok(conv.spanned(Node::Or { exprs }, tree))
}

fn convert_and(conv: &Converter, source: &str, tree: &Tree, left: &Tree, right: &Tree) -> Result<Spanned, HogQlError> {
    let left = convert_expr(conv, source, left)?;
    let right = convert_expr(conv, source, right)?;
    let mut exprs = Vec::new();
    match left.node {
        Node::And { exprs: inner } => exprs.extend(inner),
        _ => exprs.push(left),
    }
    match right.node {
        Node::And { exprs: inner } => exprs.extend(inner),
        _ => exprs.push(right),
    }
    Ok(conv.spanned(Node::And { exprs }, tree))
}

/// `||` flattens the same way `AND`/`OR` do, but into a `concat` call rather
/// than a dedicated node (spec §4.9).
fn convert_concat(conv: &Converter, source: &str, tree: &Tree, left: &Tree, right: &Tree) -> Result<Spanned, HogQlError> {
    let left = convert_expr(conv, source, left)?;
    let right = convert_expr(conv, source, right)?;
    let mut args = Vec::new();
    push_concat_arg(&mut args, left);
    push_concat_arg(&mut args, right);
    Ok(conv.spanned(
        Node::Call {
            name: "concat".into(),
            args,
            params: None,
            distinct: None,
        },
        tree,
    ))
}

fn push_concat_arg(args: &mut Vec<Spanned>, seg: Spanned) {
    match seg.node {
        Node::Call { name, args: inner, .. } if name == "concat" => args.extend(inner),
        _ => args.push(seg),
    }
}

/// `TemplateString`/`FullTemplateString`: zero segments is an empty string,
/// one segment passes through unwrapped, two or more fold into a flattened
/// `concat` call (spec §4.11).
fn convert_template_string(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut segments = Vec::with_capacity(tree.children.len());
    for child in tree.all_nodes() {
        let segment = match child.rule {
            Rule::StringContentsText => {
                let token = child
                    .children
                    .iter()
                    .find_map(as_token)
                    .ok_or_else(|| HogQlError::parsing("StringContentsText has no token", child.span))?;
                let text = &source[token.span.start as usize..token.span.end as usize];
                let decoded = crate::string_literal::parse_string_text_ctx(text, false);
                conv.spanned(
                    Node::Constant {
                        value: crate::ast::Constant::String(decoded),
                        value_type: None,
                    },
                    child,
                )
            }
            Rule::StringContentsExpr => {
                let expr_tree = child
                    .all_nodes()
                    .next()
                    .ok_or_else(|| HogQlError::parsing("StringContentsExpr has no expression", child.span))?;
                convert_expr(conv, source, expr_tree)?
            }
            _ => {
                return Err(HogQlError::parsing(
                    format!("unexpected rule {:?} in a template string", child.rule),
                    child.span,
                ))
            }
        };
        segments.push(segment);
    }

    match segments.len() {
        0 => Ok(conv.spanned(
            Node::Constant {
                value: crate::ast::Constant::String(String::new()),
                value_type: None,
            },
            tree,
        )),
        1 => Ok(segments.into_iter().next().expect("len checked")),
        _ => {
            let mut args = Vec::with_capacity(segments.len());
            for seg in segments {
                push_concat_arg(&mut args, seg);
            }
            Ok(conv.spanned(
                Node::Call {
                    name: "concat".into(),
                    args,
                    params: None,
                    distinct: None,
                },
                tree,
            ))
        }
    }
}

fn convert_is_null(conv: &Converter, source: &str, tree: &Tree, left: &Tree, negated: bool) -> Result<Spanned, HogQlError> {
    let left = convert_expr(conv, source, left)?;
    let null = conv.spanned(
        Node::Constant {
            value: crate::ast::Constant::Null,
            value_type: None,
        },
        tree,
    );
    Ok(conv.spanned(
        Node::CompareOperation {
            left: boxed(left),
            right: boxed(null),
            op: if negated { "!=".to_string() } else { "=".to_string() },
        },
        tree,
    ))
}

fn convert_like_in(
    conv: &Converter,
    source: &str,
    tree: &Tree,
    negated: bool,
    left: &Tree,
    op: TokenKind,
    cohort: bool,
    right: &Tree,
) -> Result<Spanned, HogQlError> {
    let left = convert_expr(conv, source, left)?;
    let right = convert_expr(conv, source, right)?;
    let op_str = match (op, negated, cohort) {
        (TokenKind::Like, false, _) => "like",
        (TokenKind::Like, true, _) => "not like",
        (TokenKind::Ilike, false, _) => "ilike",
        (TokenKind::Ilike, true, _) => "not ilike",
        (TokenKind::In, false, false) => "in",
        (TokenKind::In, true, false) => "not in",
        (TokenKind::In, false, true) => "in cohort",
        (TokenKind::In, true, true) => "not in cohort",
        _ => unreachable!("only LIKE/ILIKE/IN reach this path"),
    };
    Ok(conv.spanned(
        Node::CompareOperation {
            left: boxed(left),
            right: boxed(right),
            op: op_str.to_string(),
        },
        tree,
    ))
}

fn convert_between(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let ch = &tree.children;
    let negated = ch.first().and_then(as_token).map(|t| t.kind == TokenKind::Not).unwrap_or(false);
    let nodes: Vec<&Tree> = ch.iter().filter_map(as_node).collect();
    let (expr, low, high) = match nodes.as_slice() {
        [e, l, h] => (*e, *l, *h),
        _ => {
            return Err(HogQlError::parsing(
                "ColumnExprBetween did not have exactly 3 sub-expressions",
                tree.span,
            ))
        }
    };
    let expr = convert_expr(conv, source, expr)?;
    let low = convert_expr(conv, source, low)?;
    let high = convert_expr(conv, source, high)?;
    Ok(conv.spanned(
        Node::BetweenExpr {
            expr: boxed(expr),
            low: boxed(low),
            high: boxed(high),
            negated,
        },
        tree,
    ))
}

// -------------------------------------------------------------- identifiers

fn convert_column_identifier(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    if let Some(Child::Node(inner)) = tree.children.first() {
        if inner.rule == Rule::Placeholder {
            return convert_placeholder(conv, source, inner);
        }
    }
    let chain = chain_of(source, tree)?;
    if chain.len() == 1 {
        match chain[0].to_ascii_lowercase().as_str() {
            "true" => {
                return Ok(conv.spanned(
                    Node::Constant {
                        value: crate::ast::Constant::Bool(true),
                        value_type: None,
                    },
                    tree,
                ))
            }
            "false" => {
                return Ok(conv.spanned(
                    Node::Constant {
                        value: crate::ast::Constant::Bool(false),
                        value_type: None,
                    },
                    tree,
                ))
            }
            _ => {}
        }
    }
    if chain.is_empty() {
        return Err(HogQlError::parsing("ColumnIdentifier has no chain segments", tree.span));
    }
    Ok(conv.spanned(Node::Field { chain }, tree))
}

fn convert_placeholder(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let inner = tree
        .node(Rule::ColumnExpr)
        .or_else(|| tree.all_nodes().next())
        .ok_or_else(|| HogQlError::parsing("Placeholder has no inner expression", tree.span))?;
    let expr = convert_expr(conv, source, inner)?;
    Ok(conv.spanned(Node::Placeholder { expr: boxed(expr) }, tree))
}

// ----------------------------------------------------------------- literals

fn is_non_finite_word(text: &str) -> Option<&'static str> {
    match text.to_ascii_lowercase().as_str() {
        "inf" => Some("Infinity"),
        "nan" => Some("NaN"),
        _ => None,
    }
}

fn convert_number_literal(_conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    use crate::ast::Constant;
    let tokens: Vec<&Token> = tree.children.iter().filter_map(as_token).collect();
    let (start, end, last_kind) = match tokens.as_slice() {
        [only] => (only.span.start, only.span.end, only.kind),
        [minus, word] => (minus.span.start, word.span.end, word.kind),
        _ => return Err(HogQlError::parsing("NumberLiteral has unexpected token shape", tree.span)),
    };
    let text = &source[start as usize..end as usize];
    let has_minus = tokens.len() == 2;

    if let TokenKind::Ident = last_kind {
        let word_text = &source[tokens.last().unwrap().span.start as usize..tokens.last().unwrap().span.end as usize];
        if let Some(tag) = is_non_finite_word(word_text) {
            let tag: &'static str = if has_minus {
                match tag {
                    "Infinity" => "-Infinity",
                    other => other,
                }
            } else {
                tag
            };
            return Ok(_conv.spanned(
                Node::Constant {
                    value: Constant::NonFinite(tag),
                    value_type: None,
                },
                tree,
            ));
        }
        return Err(HogQlError::parsing(format!("not a number literal: {text:?}"), tree.span));
    }

    let lowered = text.to_ascii_lowercase();
    let value = if lowered.contains('.') || lowered.contains('e') {
        let f: f64 = text
            .parse()
            .map_err(|_| HogQlError::parsing(format!("invalid float literal {text:?}"), tree.span))?;
        if f.is_finite() {
            Constant::Float(f)
        } else if f.is_nan() {
            Constant::NonFinite("NaN")
        } else if f > 0.0 {
            Constant::NonFinite("Infinity")
        } else {
            Constant::NonFinite("-Infinity")
        }
    } else {
        let i: i64 = text
            .parse()
            .map_err(|_| HogQlError::parsing(format!("invalid integer literal {text:?}"), tree.span))?;
        Constant::Int(i)
    };
    Ok(_conv.spanned(Node::Constant { value, value_type: None }, tree))
}

fn convert_string_literal(_conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let token = tree
        .children
        .iter()
        .find_map(as_token)
        .ok_or_else(|| HogQlError::parsing("StringLiteralRule has no token", tree.span))?;
    let text = &source[token.span.start as usize..token.span.end as usize];
    let decoded = crate::string_literal::parse_string_literal_text(text, token.span)?;
    Ok(_conv.spanned(
        Node::Constant {
            value: crate::ast::Constant::String(decoded),
            value_type: None,
        },
        tree,
    ))
}

fn convert_list(
    conv: &Converter,
    source: &str,
    tree: &Tree,
    build: impl FnOnce(Vec<Spanned>) -> Node,
) -> Result<Spanned, HogQlError> {
    let mut exprs = Vec::with_capacity(tree.children.len());
    for child in tree.all_nodes() {
        exprs.push(convert_expr(conv, source, child)?);
    }
    Ok(conv.spanned(build(exprs), tree))
}

fn convert_dict(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let mut items = Vec::new();
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    for pair in nodes.chunks(2) {
        if let [k, v] = pair {
            let key = convert_expr(conv, source, k)?;
            let val = convert_expr(conv, source, v)?;
            items.push((key, val));
        } else {
            return Err(HogQlError::parsing("Dict has an odd number of key/value children", tree.span));
        }
    }
    Ok(conv.spanned(Node::Dict { items }, tree))
}

// ------------------------------------------------------------------ CASE

/// Rewrites `CASE` per spec §4.9: with a subject expression, into
/// `transform(subject, [when...], [then...], else)`; without one, into
/// `if(cond, then, else)` for a single arm, or `multiIf(cond, then, ...,
/// else)` for several.
fn convert_case(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let ch = &tree.children;
    // Children are [Case, (subjectExpr)?, (When, cond, Then, then)+, (Else, elseExpr)?, End].
    let mut i = 1usize;
    let mut subject = None;
    if let Some(Child::Node(n)) = ch.get(i) {
        subject = Some(n);
        i += 1;
    }
    let mut whens = Vec::new();
    let mut thens = Vec::new();
    while let Some(Child::Token(t)) = ch.get(i) {
        if t.kind != TokenKind::When {
            break;
        }
        i += 1;
        let cond = as_node(&ch[i]).ok_or_else(|| HogQlError::parsing("CASE WHEN missing condition", tree.span))?;
        i += 1;
        i += 1; // THEN token
        let then = as_node(&ch[i]).ok_or_else(|| HogQlError::parsing("CASE THEN missing expression", tree.span))?;
        i += 1;
        whens.push(cond);
        thens.push(then);
    }
    let mut else_expr = None;
    if let Some(Child::Token(t)) = ch.get(i) {
        if t.kind == TokenKind::Else {
            i += 1;
            else_expr = as_node(&ch[i]);
        }
    }

    if let Some(subject) = subject {
        let subject = convert_expr(conv, source, subject)?;
        let mut when_exprs = Vec::new();
        let mut then_exprs = Vec::new();
        for (w, t) in whens.into_iter().zip(thens.into_iter()) {
            when_exprs.push(convert_expr(conv, source, w)?);
            then_exprs.push(convert_expr(conv, source, t)?);
        }
        let else_node = match else_expr {
            Some(e) => convert_expr(conv, source, e)?,
            None => conv.spanned(
                Node::Constant {
                    value: crate::ast::Constant::Null,
                    value_type: None,
                },
                tree,
            ),
        };
        let when_array = conv.spanned(Node::Array { exprs: when_exprs }, tree);
        let then_array = conv.spanned(Node::Array { exprs: then_exprs }, tree);
        return Ok(conv.spanned(
            Node::Call {
                name: "transform".into(),
                args: vec![subject, when_array, then_array, else_node],
                params: None,
                distinct: None,
            },
            tree,
        ));
    }

    if whens.len() == 1 {
        let cond = convert_expr(conv, source, whens[0])?;
        let then = convert_expr(conv, source, thens[0])?;
        let else_node = match else_expr {
            Some(e) => convert_expr(conv, source, e)?,
            None => conv.spanned(
                Node::Constant {
                    value: crate::ast::Constant::Null,
                    value_type: None,
                },
                tree,
            ),
        };
        return Ok(conv.spanned(
            Node::Call {
                name: "if".into(),
                args: vec![cond, then, else_node],
                params: None,
                distinct: None,
            },
            tree,
        ));
    }

    let mut args = Vec::new();
    for (w, t) in whens.into_iter().zip(thens.into_iter()) {
        args.push(convert_expr(conv, source, w)?);
        args.push(convert_expr(conv, source, t)?);
    }
    let else_node = match else_expr {
        Some(e) => convert_expr(conv, source, e)?,
        None => conv.spanned(
            Node::Constant {
                value: crate::ast::Constant::Null,
                value_type: None,
            },
            tree,
        ),
    };
    args.push(else_node);
    Ok(conv.spanned(
        Node::Call {
            name: "multiIf".into(),
            args,
            params: None,
            distinct: None,
        },
        tree,
    ))
}

// ------------------------------------------------------------- calls, trim, interval

pub(super) fn convert_arg_list(conv: &Converter, source: &str, tree: &Tree) -> Result<(bool, Vec<Spanned>), HogQlError> {
    let distinct = tree.has_token(TokenKind::Distinct);
    let mut args = Vec::new();
    for child in tree.all_nodes() {
        args.push(convert_expr(conv, source, child)?);
    }
    Ok((distinct, args))
}

fn convert_function(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    match nodes.as_slice() {
        [name, args] => {
            let fn_name = identifier_text(source, name)?;
            let (distinct, args) = convert_arg_list(conv, source, args)?;
            Ok(conv.spanned(
                Node::Call {
                    name: fn_name,
                    args,
                    params: None,
                    distinct: if distinct { Some(true) } else { None },
                },
                tree,
            ))
        }
        [name, params, args] => {
            let fn_name = identifier_text(source, name)?;
            let (_pd, params) = convert_arg_list(conv, source, params)?;
            let (distinct, args) = convert_arg_list(conv, source, args)?;
            Ok(conv.spanned(
                Node::Call {
                    name: fn_name,
                    args,
                    params: Some(params),
                    distinct: if distinct { Some(true) } else { None },
                },
                tree,
            ))
        }
        _ => Err(HogQlError::parsing("ColumnExprFunction has an unexpected shape", tree.span)),
    }
}

fn convert_call(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (base, args) = match nodes.as_slice() {
        [base, args] => (*base, *args),
        _ => return Err(HogQlError::parsing("ColumnExprCall has an unexpected shape", tree.span)),
    };
    let expr = convert_expr(conv, source, base)?;
    let (_distinct, args) = convert_arg_list(conv, source, args)?;
    Ok(conv.spanned(
        Node::ExprCall {
            expr: boxed(expr),
            args,
        },
        tree,
    ))
}

/// `foo(SELECT 1)`: a one-element `Field` chain is really a function name
/// applied to the subquery (`Call`), anything else is a callable expression
/// applied to it (`ExprCall`).
fn convert_call_select(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (base, select_tree) = match nodes.as_slice() {
        [base, select] => (*base, *select),
        _ => return Err(HogQlError::parsing("ColumnExprCallSelect has an unexpected shape", tree.span)),
    };
    let expr = convert_expr(conv, source, base)?;
    let select = super::select::convert_select(conv, source, select_tree)?;
    Ok(match expr.node {
        Node::Field { chain } if chain.len() == 1 => conv.spanned(
            Node::Call {
                name: chain.into_iter().next().expect("len checked"),
                args: vec![select],
                params: None,
                distinct: None,
            },
            tree,
        ),
        other => conv.spanned(
            Node::ExprCall {
                expr: boxed(Spanned { node: other, span: expr.span }),
                args: vec![select],
            },
            tree,
        ),
    })
}

fn convert_win_function(conv: &Converter, source: &str, tree: &Tree, has_target: bool) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (name, args, tail) = match nodes.as_slice() {
        [name, args, tail] => (*name, *args, *tail),
        _ => return Err(HogQlError::parsing("window function node has an unexpected shape", tree.span)),
    };
    let fn_name = identifier_text(source, name)?;
    let (_distinct, exprs) = convert_arg_list(conv, source, args)?;
    let (over_expr, over_identifier) = if has_target {
        (None, Some(identifier_text(source, tail)?))
    } else {
        (Some(boxed(super::select::convert_window_expr(conv, source, tail)?)), None)
    };
    Ok(conv.spanned(
        Node::WindowFunction {
            name: fn_name,
            exprs,
            // The two-call form (`quantile(0.5)(x) OVER (...)`, a second
            // parenthesized arg group before `OVER`) isn't in the grammar's
            // `function_call`, which only carries one group into `OVER`
            // position — see DESIGN.md's Select converter entry.
            args: Vec::new(),
            over_expr,
            over_identifier,
        },
        tree,
    ))
}

fn convert_trim(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let ch = &tree.children;
    let side = ch.first().and_then(as_token).map(|t| t.kind);
    let name = match side {
        Some(TokenKind::Leading) => "trimLeft",
        Some(TokenKind::Trailing) => "trimRight",
        _ => "trim",
    };
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (cut_set, expr_tree) = match nodes.as_slice() {
        [expr] => (None, *expr),
        [cut, expr] => (Some(*cut), *expr),
        _ => return Err(HogQlError::parsing("ColumnExprTrim has an unexpected shape", tree.span)),
    };
    let expr = convert_expr(conv, source, expr_tree)?;
    let mut args = vec![expr];
    if let Some(cut_set) = cut_set {
        args.push(convert_expr(conv, source, cut_set)?);
    }
    Ok(conv.spanned(
        Node::Call {
            name: name.to_string(),
            args,
            params: None,
            distinct: None,
        },
        tree,
    ))
}

/// The eight interval units the grammar accepts, each normalized to its
/// CamelCase `toInterval*` suffix regardless of the source text's case
/// (`day`, `Day`, and `DAY` all mean `toIntervalDay`).
fn interval_unit_camel(unit: &str) -> Option<&'static str> {
    match unit.to_ascii_lowercase().as_str() {
        "second" => Some("Second"),
        "minute" => Some("Minute"),
        "hour" => Some("Hour"),
        "day" => Some("Day"),
        "week" => Some("Week"),
        "month" => Some("Month"),
        "quarter" => Some("Quarter"),
        "year" => Some("Year"),
        _ => None,
    }
}

fn interval_call(conv: &Converter, unit: &str, amount: Spanned, tree: &Tree) -> Result<Spanned, HogQlError> {
    let cap = interval_unit_camel(unit)
        .ok_or_else(|| HogQlError::parsing(format!("unsupported interval unit {unit:?}"), tree.span))?;
    Ok(conv.spanned(
        Node::Call {
            name: format!("toInterval{cap}"),
            args: vec![amount],
            params: None,
            distinct: None,
        },
        tree,
    ))
}

fn convert_interval(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let nodes: Vec<&Tree> = tree.all_nodes().collect();
    let (amount, unit) = match nodes.as_slice() {
        [amount, unit] => (*amount, *unit),
        _ => return Err(HogQlError::parsing("ColumnExprInterval has an unexpected shape", tree.span)),
    };
    let amount = convert_expr(conv, source, amount)?;
    let unit_text = identifier_text(source, unit)?;
    interval_call(conv, &unit_text, amount, tree)
}

fn convert_interval_string(conv: &Converter, source: &str, tree: &Tree) -> Result<Spanned, HogQlError> {
    let string_node = tree
        .all_nodes()
        .next()
        .ok_or_else(|| HogQlError::parsing("ColumnExprIntervalString has no string literal", tree.span))?;
    let token = string_node
        .children
        .iter()
        .find_map(as_token)
        .ok_or_else(|| HogQlError::parsing("interval string literal has no token", tree.span))?;
    let text = &source[token.span.start as usize..token.span.end as usize];
    let decoded = crate::string_literal::parse_string_literal_text(text, token.span)?;
    let mut parts = decoded.split_whitespace();
    let amount_text = parts
        .next()
        .ok_or_else(|| HogQlError::syntax("interval string has no amount", tree.span))?;
    let unit_text = parts
        .next()
        .ok_or_else(|| HogQlError::syntax("interval string has no unit", tree.span))?;
    let amount: i64 = amount_text
        .parse()
        .map_err(|_| HogQlError::syntax(format!("invalid interval amount {amount_text:?}"), tree.span))?;
    let amount_node = conv.spanned(
        Node::Constant {
            value: crate::ast::Constant::Int(amount),
            value_type: None,
        },
        tree,
    );
    interval_call(conv, unit_text, amount_node, tree)
}
