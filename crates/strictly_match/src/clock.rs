//! Per-side match clocks.
//!
//! Each side starts with the same allowance. The side to move burns time
//! until its move is accepted, then gains a fixed increment. The clock is a
//! plain value; whoever owns it measures elapsed time and feeds it in.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strictly_chess::Color;

/// Allowance each side starts with.
pub const DEFAULT_INITIAL_TIME: Duration = Duration::from_secs(10 * 60);

/// Time credited to a side after each of its moves.
pub const DEFAULT_INCREMENT: Duration = Duration::from_secs(5);

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Remaining time of both sides, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchClock {
    white_ms: u64,
    black_ms: u64,
    initial_ms: u64,
    increment_ms: u64,
}

impl Default for MatchClock {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_TIME, DEFAULT_INCREMENT)
    }
}

impl MatchClock {
    /// Both sides at `initial`, gaining `increment` per move.
    pub fn new(initial: Duration, increment: Duration) -> Self {
        let initial_ms = millis(initial);
        Self {
            white_ms: initial_ms,
            black_ms: initial_ms,
            initial_ms,
            increment_ms: millis(increment),
        }
    }

    /// Time left to `color`.
    pub fn remaining(&self, color: Color) -> Duration {
        Duration::from_millis(match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        })
    }

    /// Allowance each side started with.
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    /// Per-move increment.
    pub fn increment(&self) -> Duration {
        Duration::from_millis(self.increment_ms)
    }

    /// Whether `color` has used up its time after `elapsed` on move.
    pub fn is_flagged(&self, color: Color, elapsed: Duration) -> bool {
        elapsed >= self.remaining(color)
    }

    /// `elapsed` taken off `color`, floored at zero.
    pub fn charged(&self, color: Color, elapsed: Duration) -> Self {
        let spent = millis(elapsed);
        let mut next = *self;
        match color {
            Color::White => next.white_ms = next.white_ms.saturating_sub(spent),
            Color::Black => next.black_ms = next.black_ms.saturating_sub(spent),
        }
        next
    }

    /// Clock after `color` moved having thought for `elapsed`.
    pub fn after_move(&self, color: Color, elapsed: Duration) -> Self {
        let mut next = self.charged(color, elapsed);
        match color {
            Color::White => next.white_ms = next.white_ms.saturating_add(self.increment_ms),
            Color::Black => next.black_ms = next.black_ms.saturating_add(self.increment_ms),
        }
        next
    }

    /// Fresh clock with the same allowance and increment.
    pub fn restarted(&self) -> Self {
        Self {
            white_ms: self.initial_ms,
            black_ms: self.initial_ms,
            ..*self
        }
    }
}
