//! Entry signals

use crate::portfolio::PositionSide;
use serde::Serialize;

/// Result of evaluating the signal function at one bar
///
/// `stop` and `take_profit` are absolute prices relative to the price the
/// signal was evaluated at; they are only meaningful when `ok` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    /// Entry accepted
    pub ok: bool,
    /// Side that was evaluated
    pub side: PositionSide,
    /// Stop loss price
    pub stop: f64,
    /// Take profit price
    pub take_profit: f64,
    /// Entry score (0-100)
    pub score: f64,
    /// Human readable explanation
    pub reason: String,
}

impl Signal {
    /// Accepted entry
    pub fn enter(side: PositionSide, stop: f64, take_profit: f64, score: f64, reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            side,
            stop,
            take_profit,
            score,
            reason: reason.into(),
        }
    }

    /// Rejected entry
    pub fn reject(side: PositionSide, score: f64, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            side,
            stop: f64::NAN,
            take_profit: f64::NAN,
            score,
            reason: reason.into(),
        }
    }

    /// Rejection before any score could be computed
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::reject(PositionSide::Long, 0.0, reason)
    }

    /// Distance from `price` to the stop
    pub fn stop_distance(&self, price: f64) -> f64 {
        (price - self.stop).abs()
    }

    /// Distance from `price` to the target
    pub fn take_profit_distance(&self, price: f64) -> f64 {
        (self.take_profit - price).abs()
    }

    /// Stop and target on the correct side of `price` for the signal's side
    pub fn has_valid_levels(&self, price: f64) -> bool {
        match self.side {
            PositionSide::Long => self.stop < price && self.take_profit > price,
            PositionSide::Short => self.stop > price && self.take_profit < price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let long = Signal::enter(PositionSide::Long, 95.0, 110.0, 80.0, "ok");
        assert!(long.has_valid_levels(100.0));
        assert_eq!(long.stop_distance(100.0), 5.0);
        assert_eq!(long.take_profit_distance(100.0), 10.0);

        let inverted = Signal::enter(PositionSide::Short, 95.0, 110.0, 80.0, "bad");
        assert!(!inverted.has_valid_levels(100.0));
        assert!(!Signal::no_data("warm-up").ok);
    }
}
