//! Position tracking

use crate::data::Candle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// Long position
    Long,
    /// Short position
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    /// Whether `a` is more favourable than `b` for a stop on this side
    /// (higher for longs, lower for shorts).
    pub fn is_tighter(&self, a: f64, b: f64) -> bool {
        match self {
            PositionSide::Long => a > b,
            PositionSide::Short => a < b,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => f.write_str("LONG"),
            PositionSide::Short => f.write_str("SHORT"),
        }
    }
}

/// Simulated position
///
/// Size is tracked as the remaining fraction of the opening notional so that
/// partial exits can be booked proportionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Sequential position id within one run
    pub id: usize,
    /// Position side (Long/Short)
    pub side: PositionSide,
    /// Fill price of the entry
    pub entry_price: f64,
    /// Bar index of the entry fill
    pub entry_index: usize,
    /// Stop loss price
    pub stop_loss: f64,
    /// Take profit price
    pub take_profit: f64,
    /// Trailing stop, once one has been set
    pub trailing_stop: Option<f64>,
    /// Whether the partial take-profit has fired
    pub partial_taken: bool,
    /// Remaining fraction of the opening size, in (0, 1]
    pub remaining: f64,
    /// Entry score of the signal that opened the position
    pub score: f64,
}

impl Position {
    /// Create new position
    pub fn new(
        id: usize,
        side: PositionSide,
        entry_price: f64,
        entry_index: usize,
        stop_loss: f64,
        take_profit: f64,
    ) -> Self {
        Self {
            id,
            side,
            entry_price,
            entry_index,
            stop_loss,
            take_profit,
            trailing_stop: None,
            partial_taken: false,
            remaining: 1.0,
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Stop in force: the tighter of the stop loss and the trailing stop
    pub fn effective_stop(&self) -> f64 {
        match self.trailing_stop {
            Some(trail) if self.side.is_tighter(trail, self.stop_loss) => trail,
            _ => self.stop_loss,
        }
    }

    /// Whether the trailing stop is what currently protects the position
    pub fn is_trailing(&self) -> bool {
        self.trailing_stop
            .map(|trail| self.side.is_tighter(trail, self.stop_loss))
            .unwrap_or(false)
    }

    /// Check if the bar touched the effective stop
    pub fn is_stop_loss_hit(&self, candle: &Candle) -> bool {
        let stop = self.effective_stop();
        match self.side {
            PositionSide::Long => candle.low <= stop,
            PositionSide::Short => candle.high >= stop,
        }
    }

    /// Check if the bar reached `level` in the position's favour
    pub fn is_level_reached(&self, candle: &Candle, level: f64) -> bool {
        match self.side {
            PositionSide::Long => candle.high >= level,
            PositionSide::Short => candle.low <= level,
        }
    }

    /// Check if take profit is hit
    pub fn is_take_profit_hit(&self, candle: &Candle) -> bool {
        self.is_level_reached(candle, self.take_profit)
    }

    /// Stop fill: the stop price, or the open when the bar gapped through it
    pub fn stop_fill(&self, candle: &Candle) -> f64 {
        let stop = self.effective_stop();
        match self.side {
            PositionSide::Long => candle.open.min(stop),
            PositionSide::Short => candle.open.max(stop),
        }
    }

    /// Partial take-profit trigger at `fraction` of the entry-to-target distance
    pub fn partial_level(&self, fraction: f64) -> f64 {
        self.entry_price + (self.take_profit - self.entry_price) * fraction
    }

    /// Tighten the trailing stop to `candidate`; never loosens it.
    /// Returns whether the trail moved.
    pub fn update_trailing_stop(&mut self, candidate: f64) -> bool {
        if !candidate.is_finite() {
            return false;
        }
        match self.trailing_stop {
            Some(trail) if !self.side.is_tighter(candidate, trail) => false,
            _ => {
                self.trailing_stop = Some(candidate);
                true
            }
        }
    }

    /// Move the stop loss to `level` only if that tightens it
    pub fn tighten_stop_loss(&mut self, level: f64) -> bool {
        if self.side.is_tighter(level, self.stop_loss) {
            self.stop_loss = level;
            true
        } else {
            false
        }
    }

    /// Price return of an exit at `price`, signed by side
    pub fn return_at(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }

    /// Bars held as of bar `index`
    pub fn bars_held(&self, index: usize) -> usize {
        index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(open, high, low, close, 0.0, Utc.timestamp_opt(0, 0).single().unwrap())
    }

    #[test]
    fn test_trailing_only_tightens() {
        let mut long = Position::new(0, PositionSide::Long, 100.0, 1, 95.0, 110.0);
        assert!(long.update_trailing_stop(97.0));
        assert!(!long.update_trailing_stop(96.0));
        assert_eq!(long.effective_stop(), 97.0);
        assert!(long.is_trailing());

        let mut short = Position::new(1, PositionSide::Short, 100.0, 1, 105.0, 90.0);
        assert!(short.update_trailing_stop(103.0));
        assert!(!short.update_trailing_stop(104.0));
        assert_eq!(short.effective_stop(), 103.0);
    }

    #[test]
    fn test_loose_trail_does_not_replace_stop() {
        let mut long = Position::new(0, PositionSide::Long, 100.0, 1, 95.0, 110.0);
        long.update_trailing_stop(90.0);
        assert_eq!(long.effective_stop(), 95.0);
        assert!(!long.is_trailing());
    }

    #[test]
    fn test_gap_fill_uses_open() {
        let long = Position::new(0, PositionSide::Long, 100.0, 1, 95.0, 110.0);
        let gap = bar(93.0, 94.0, 92.0, 93.5);
        assert!(long.is_stop_loss_hit(&gap));
        assert_eq!(long.stop_fill(&gap), 93.0);
        let touch = bar(97.0, 98.0, 94.0, 96.0);
        assert_eq!(long.stop_fill(&touch), 95.0);
    }

    #[test]
    fn test_return_is_side_aware() {
        let short = Position::new(0, PositionSide::Short, 100.0, 1, 105.0, 90.0);
        assert!((short.return_at(90.0) - 0.1).abs() < 1e-12);
        assert!((short.partial_level(0.5) - 95.0).abs() < 1e-12);
    }
}
