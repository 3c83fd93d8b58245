use std::fmt;

/// Tracks recursion depth and reports how close a parse came to a limit.
///
/// Used two ways in this crate: as the parser's general recursive-descent
/// depth guard, and — a second, independent instance — as the join-chain
/// tail-walk cap described in spec §4.6 (depth ≥ 1000 before it's considered
/// malformed input rather than a legitimately long `JOIN` chain).
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct LimitTracker {
    current: usize,
    /// High-water mark for this limit.
    pub high: usize,
    pub limit: usize,
}

impl LimitTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            current: 0,
            high: 0,
            limit,
        }
    }

    pub fn limited(&self) -> bool {
        self.current > self.limit
    }

    pub fn consume(&mut self) {
        self.current += 1;
        if self.current > self.high {
            self.high = self.current;
        }
    }

    pub fn release(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

impl fmt::Debug for LimitTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recursion limit: {}, high: {}", self.limit, self.high)
    }
}

/// Default recursive-descent depth for the parser itself. Chosen generously
/// above anything a hand-written query or script should need; exceeding it
/// means either pathological input or a real stack-overflow risk, not a
/// legitimate deeply-nested query.
pub const DEFAULT_RECURSION_LIMIT: usize = 500;

/// Depth cap for the `JoinExpr.next_join` tail walk (spec §4.6 / §9).
pub const JOIN_CHAIN_LIMIT: usize = 1000;
