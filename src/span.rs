//! Byte spans and the line/column translation used only for JSON output.
//!
//! Everything inside the converter works in plain byte offsets (`Span`).
//! `Position` — the `{line, column, offset}` triple the wire format wants
//! per spec §6.3 — is only ever computed once, at serialization time, via
//! `LineIndex`. `offset` is the only field downstream consumers should rely
//! on; `line`/`column` are informational.

use line_index::{LineCol, LineIndex};
use serde::Serialize;

/// Half-open byte range `[start, end)` into the original input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

/// Thin wrapper so callers don't need to depend on `line_index` directly.
pub struct Lines(LineIndex);

impl Lines {
    pub fn new(input: &str) -> Self {
        Self(LineIndex::new(input))
    }

    pub fn position(&self, offset: u32) -> Position {
        let LineCol { line, col } = self.0.line_col(line_index::TextSize::from(offset));
        Position {
            line,
            column: col,
            offset,
        }
    }
}
