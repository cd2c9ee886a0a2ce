//! Simulator configuration

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Trading costs as fractions of traded notional, charged on every leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Taker fee per leg (0.0006 = 0.06%)
    pub fee_rate: f64,
    /// Expected slippage per leg
    pub slippage: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fee_rate: 0.0006,
            slippage: 0.0005,
        }
    }
}

impl CostModel {
    pub fn new(fee_rate: f64, slippage: f64) -> Self {
        Self { fee_rate, slippage }
    }

    /// Cost of one leg as a fraction of notional
    pub fn leg_cost(&self) -> f64 {
        self.fee_rate + self.slippage
    }

    /// Entry plus exit: `2 * fee + 2 * slippage`
    pub fn round_trip_cost(&self) -> f64 {
        2.0 * self.fee_rate + 2.0 * self.slippage
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        for (field, v) in [("fee_rate", self.fee_rate), ("slippage", self.slippage)] {
            if !(0.0..1.0).contains(&v) {
                return Err(EngineError::invalid(field, format!("{} is outside [0, 1)", v)));
            }
        }
        Ok(())
    }
}

/// ATR trailing stop, tightened only in the position's favour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingConfig {
    /// Distance from the close as an ATR multiple
    pub atr_mult: f64,
    /// ATR period used by the simulator for trailing
    pub atr_period: usize,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            atr_mult: 1.0,
            atr_period: 14,
        }
    }
}

/// Partial exit on the way to the full target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialTakeProfit {
    /// Trigger at this fraction of the entry-to-target distance
    pub at_fraction: f64,
    /// Share of the remaining size closed at the trigger
    pub close_fraction: f64,
    /// Move the stop to the entry price after the partial exit
    pub move_stop_to_breakeven: bool,
}

impl Default for PartialTakeProfit {
    fn default() -> Self {
        Self {
            at_fraction: 0.5,
            close_fraction: 0.5,
            move_stop_to_breakeven: true,
        }
    }
}

/// Backtest simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub costs: CostModel,
    /// Notional per position in quote currency
    pub notional: f64,
    /// Reference balance for percentage drawdown
    pub initial_balance: f64,
    /// Bars skipped before the strategy is first queried
    pub warmup_bars: usize,
    pub trailing: Option<TrailingConfig>,
    pub partial_tp: Option<PartialTakeProfit>,
    /// Close at the bar close after this many bars held
    pub time_exit_bars: Option<usize>,
    /// Bars without new entries after a position is fully closed
    pub cooldown_bars: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            costs: CostModel::default(),
            notional: 100.0,
            initial_balance: 1000.0,
            warmup_bars: 60,
            trailing: None,
            partial_tp: None,
            time_exit_bars: None,
            cooldown_bars: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        self.costs.validate()?;
        if !self.notional.is_finite() || self.notional < 0.0 {
            return Err(EngineError::invalid("notional", "must be a finite amount >= 0"));
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(EngineError::invalid("initial_balance", "must be a finite amount >= 0"));
        }
        if let Some(trailing) = &self.trailing {
            if !(trailing.atr_mult > 0.0) {
                return Err(EngineError::invalid("trailing.atr_mult", "must be positive"));
            }
            if trailing.atr_period == 0 {
                return Err(EngineError::invalid("trailing.atr_period", "must be positive"));
            }
        }
        if let Some(partial) = &self.partial_tp {
            if !(partial.at_fraction > 0.0 && partial.at_fraction < 1.0) {
                return Err(EngineError::invalid("partial_tp.at_fraction", "must be inside (0, 1)"));
            }
            if !(partial.close_fraction > 0.0 && partial.close_fraction < 1.0) {
                return Err(EngineError::invalid("partial_tp.close_fraction", "must be inside (0, 1)"));
            }
        }
        if self.time_exit_bars == Some(0) {
            return Err(EngineError::invalid("time_exit_bars", "use null to disable"));
        }
        Ok(())
    }
}
