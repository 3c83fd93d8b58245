//! Error types returned by the lexer, parser, and converter.
//!
//! Mirrors the teacher's `Error` struct (`message` + a byte index) but
//! generalized to the three kinds spec §7 requires, each carrying a full
//! `Span` rather than a single index, and implementing `thiserror::Error`
//! plus `Serialize` so the outermost entry point can hand the caller a
//! `{error: true, type, message, start, end}` JSON object without a second
//! conversion step.
use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// The three error kinds distinguished in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// The input does not conform to HogQL syntax.
    SyntaxError,
    /// A recognized grammar construct the converter intentionally does not
    /// handle (`CAST`, `SUBSTRING`, `TOP`, `SETTINGS`, ...).
    NotImplementedError,
    /// An internal invariant violation — a bug in the converter or grammar,
    /// not a malformed input.
    ParsingError,
}

/// A single error produced anywhere in the lexer/parser/converter pipeline.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
pub struct HogQlError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl HogQlError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ErrorKind::SyntaxError,
            message: message.into(),
            span,
        }
    }

    pub fn not_implemented(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ErrorKind::NotImplementedError,
            message: message.into(),
            span,
        }
    }

    pub fn parsing(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ErrorKind::ParsingError,
            message: message.into(),
            span,
        }
    }

    /// `true` when the error was raised with no real span (the span-less
    /// exception case from spec §4.2/§7): both endpoints are zero.
    pub fn is_spanless(&self) -> bool {
        self.span == Span::default()
    }

    /// Re-raise this error with the enclosing rule's span, but only if it
    /// doesn't already have one. Used by the `visit` wrapper (§4.2) to turn
    /// span-less exceptions raised deep in the tree into located ones.
    pub fn respan(mut self, span: Span) -> Self {
        if self.is_spanless() {
            self.span = span;
        }
        self
    }
}

impl fmt::Display for HogQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for HogQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}@{}:{} {:?}",
            self.kind, self.span.start, self.span.end, self.message
        )
    }
}

/// The `{error: true, type, message, start, end}` object spec §7 mandates as
/// the sole alternative to a successful AST. Kept as a distinct type (rather
/// than deriving `Serialize` on `HogQlError` in this exact shape) because the
/// wire format spells `type`/`start`/`end` where `HogQlError` spells
/// `kind`/`span.start`/`span.end`.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub start: u32,
    pub end: u32,
}

impl From<&HogQlError> for ErrorResponse {
    fn from(err: &HogQlError) -> Self {
        Self {
            error: true,
            kind: err.kind,
            message: err.message.clone(),
            start: err.span.start,
            end: err.span.end,
        }
    }
}

impl HogQlError {
    /// Serialize this error to the wire shape described in spec §7.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&ErrorResponse::from(self))
            .expect("ErrorResponse serialization is infallible")
    }
}
