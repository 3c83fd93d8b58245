//! Recursive-descent parser producing the `cst::Tree` parse tree.
//!
//! Grounded on `crates/apollo-parser/src/parser/grammar/*.rs`'s
//! `start_node`/`bump`/`peek` idiom, adapted from rowan's stateful tree
//! builder to a plain value-returning style: each grammar function builds
//! and returns its own `Tree` rather than pushing into a shared builder,
//! since (unlike the teacher) we never need the tree to outlive the single
//! conversion pass that consumes it (spec §5 — no incremental reparse).
//! Precise `Result<_, HogQlError>` propagation throughout replaces the
//! teacher's accumulate-errors-and-keep-going approach: spec §7 promises the
//! caller exactly one error or one AST, never a partial tree plus errors.

pub mod grammar;

use crate::cst::{Child, Rule, Tree};
use crate::error::HogQlError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::limit::{LimitTracker, DEFAULT_RECURSION_LIMIT};
use crate::span::Span;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: LimitTracker,
}

/// RAII guard returned by `Parser::enter` — decrements the depth counter
/// when a grammar function returns, by any path (including `?`).
pub struct DepthGuard<'p, 'a> {
    parser: &'p mut Parser<'a>,
}

impl Drop for DepthGuard<'_, '_> {
    fn drop(&mut self) {
        self.parser.depth.release();
    }
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, HogQlError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            depth: LimitTracker::new(DEFAULT_RECURSION_LIMIT),
        })
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.depth = LimitTracker::new(limit);
        self
    }

    /// Pushes one level of recursion depth; returns a guard that pops it on
    /// drop, and a `ParsingError` if the configured limit was exceeded.
    pub fn enter(&mut self) -> Result<DepthGuard<'_, 'a>, HogQlError> {
        self.depth.consume();
        if self.depth.limited() {
            return Err(HogQlError::parsing(
                "Parser recursion limit exceeded",
                self.current_span(),
            ));
        }
        Ok(DepthGuard { parser: self })
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    pub fn peek_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    pub fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    /// Byte offset the next token starts at — a checkpoint for grammar
    /// functions that build their own span rather than going through
    /// `node`.
    pub fn pos_checkpoint(&self) -> u32 {
        self.current_span().start
    }

    /// End offset of the most recently consumed token (0 if none yet).
    pub fn last_consumed_end(&self) -> u32 {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span.end
        } else {
            0
        }
    }

    pub fn text(&self, token: &Token) -> &'a str {
        &self.source[token.span.start as usize..token.span.end as usize]
    }

    pub fn current_text(&self) -> &'a str {
        self.text(&self.tokens[self.pos])
    }

    /// Text of the token `n` ahead of the current one, without consuming.
    pub fn nth_text(&self, n: usize) -> &'a str {
        match self.tokens.get(self.pos + n) {
            Some(t) => self.text(t),
            None => "",
        }
    }

    /// Consumes and returns the current token.
    pub fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if !self.at(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    pub fn bump_as(&mut self, kind: Rule) -> Tree {
        let token = self.bump();
        Tree {
            rule: kind,
            span: token.span,
            children: vec![Child::Token(token)],
        }
    }

    pub fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, HogQlError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(what))
        }
    }

    pub fn unexpected(&self, what: &str) -> HogQlError {
        HogQlError::syntax(
            format!(
                "Expected {what}, found {:?} ({:?})",
                self.peek(),
                self.current_text()
            ),
            self.current_span(),
        )
    }

    pub fn syntax_err(&self, message: impl Into<String>) -> HogQlError {
        HogQlError::syntax(message, self.current_span())
    }

    pub fn not_implemented(&self, message: impl Into<String>) -> HogQlError {
        HogQlError::not_implemented(message, self.current_span())
    }

    /// Requires that the whole input has been consumed (up to EOF). All five
    /// entry points call this after their rule so trailing garbage is a
    /// syntax error rather than silently ignored.
    pub fn expect_eof(&mut self) -> Result<(), HogQlError> {
        if self.at(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}

/// Builds a `Tree` by running `body`, recording the span from the first
/// token consumed to the last. Mirrors the teacher's `start_node` guard,
/// minus the shared-builder bookkeeping: `body` collects its own children
/// and returns them alongside its result.
pub fn node<'a, T>(
    p: &mut Parser<'a>,
    rule: Rule,
    body: impl FnOnce(&mut Parser<'a>, &mut Vec<Child>) -> Result<T, HogQlError>,
) -> Result<(T, Tree), HogQlError> {
    let start = p.current_span().start;
    let mut children = Vec::new();
    let value = body(p, &mut children)?;
    let end = if p.pos > 0 {
        p.tokens[p.pos - 1].span.end
    } else {
        start
    };
    Ok((
        value,
        Tree {
            rule,
            span: Span::new(start, end),
            children,
        },
    ))
}
