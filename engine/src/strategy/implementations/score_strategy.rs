//! Score-based entry strategy

use crate::config::{ParameterSet, ScoreWeights, SideFilter};
use crate::indicators::{IndicatorFrame, IndicatorSnapshot};
use crate::portfolio::PositionSide;
use crate::strategy::{build_reason, score, trend_ok, Signal, Strategy};
use tracing::debug;

/// Signal function over a precomputed [`IndicatorFrame`]
///
/// An entry needs a snapshot, a positive price and ATR, ATR/price at or
/// above the volatility floor, a score of at least `enter_score` and the
/// trend condition of the chosen side. Stops sit `atr * stop_atr` away from
/// the price and targets `stop distance * tp_r` away.
#[derive(Debug, Clone)]
pub struct ScoreStrategy<'a> {
    frame: &'a IndicatorFrame,
    params: ParameterSet,
    weights: ScoreWeights,
}

impl<'a> ScoreStrategy<'a> {
    /// Create new score strategy
    pub fn new(frame: &'a IndicatorFrame, params: ParameterSet, weights: ScoreWeights) -> Self {
        Self {
            frame,
            params,
            weights,
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Side to evaluate under the parameter set's filter
    ///
    /// With both sides allowed a short is only taken when the short trend
    /// holds and the long trend does not.
    pub fn choose_side(&self, snapshot: &IndicatorSnapshot, price: f64) -> PositionSide {
        match self.params.side {
            SideFilter::Long => PositionSide::Long,
            SideFilter::Short => PositionSide::Short,
            SideFilter::Both => {
                if trend_ok(snapshot, price, PositionSide::Short) && !trend_ok(snapshot, price, PositionSide::Long) {
                    PositionSide::Short
                } else {
                    PositionSide::Long
                }
            }
        }
    }

    /// Score of `side` at bar `index`, `None` during warm-up
    pub fn score_at(&self, price: f64, index: usize, side: PositionSide) -> Option<f64> {
        self.frame
            .snapshot(index)
            .map(|snapshot| score(&snapshot, price, side, &self.weights))
    }

    /// Evaluate a fixed side, ignoring the side filter
    pub fn evaluate_side(&self, price: f64, index: usize, side: PositionSide) -> Signal {
        let Some(snapshot) = self.frame.snapshot(index) else {
            return Signal::no_data("insufficient data");
        };
        self.evaluate_snapshot(&snapshot, price, side)
    }

    fn evaluate_snapshot(&self, snapshot: &IndicatorSnapshot, price: f64, side: PositionSide) -> Signal {
        if !(price > 0.0) {
            return Signal::no_data(format!("invalid price {}", price));
        }
        if !(snapshot.atr > 0.0) {
            return Signal::no_data("atr is zero");
        }
        let volatility = snapshot.atr / price;
        if volatility < self.weights.min_volatility {
            return Signal::no_data(format!(
                "volatility {:.5} below floor {}",
                volatility, self.weights.min_volatility
            ));
        }

        let points = score(snapshot, price, side, &self.weights);
        let reason = build_reason(side, price, snapshot, points);
        if points < self.params.enter_score {
            return Signal::reject(side, points, reason);
        }
        if !trend_ok(snapshot, price, side) {
            return Signal::reject(side, points, format!("{} trend not confirmed", reason));
        }

        let stop_distance = snapshot.atr * self.params.stop_atr;
        let tp_distance = stop_distance * self.params.tp_r;
        let sign = side.sign();
        let stop = price - sign * stop_distance;
        let take_profit = price + sign * tp_distance;

        debug!(
            index = snapshot.index,
            side = %side,
            price,
            score = points,
            stop,
            take_profit,
            "entry signal"
        );
        Signal::enter(side, stop, take_profit, points, reason)
    }
}

impl Strategy for ScoreStrategy<'_> {
    fn evaluate(&self, price: f64, index: usize) -> Signal {
        let Some(snapshot) = self.frame.snapshot(index) else {
            return Signal::no_data("insufficient data");
        };
        let side = self.choose_side(&snapshot, price);
        self.evaluate_snapshot(&snapshot, price, side)
    }

    fn name(&self) -> &str {
        "score"
    }
}
