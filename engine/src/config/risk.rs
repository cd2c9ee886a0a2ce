//! Trading mode risk profiles

use crate::config::{ParameterSet, SideFilter};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Risk mode of the live trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Low leverage, small orders, strict entry score
    #[default]
    Safe,
    /// Higher leverage, bigger orders, looser entry score
    Aggro,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Safe => f.write_str("SAFE"),
            TradingMode::Aggro => f.write_str("AGGRO"),
        }
    }
}

impl FromStr for TradingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(TradingMode::Safe),
            "aggro" | "attack" => Ok(TradingMode::Aggro),
            other => Err(EngineError::invalid("mode", format!("unknown mode `{}`", other))),
        }
    }
}

/// Per-mode order sizing and exit parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Leverage set on the exchange before the first entry
    pub leverage: u32,
    /// Margin per order in USDT; notional is `order_usdt * leverage`
    pub order_usdt: f64,
    /// Stop distance as an ATR multiple
    pub stop_atr: f64,
    /// Take-profit R-multiple of the stop distance
    pub tp_r: f64,
    /// Minimum entry score
    pub enter_score: f64,
}

impl ModeProfile {
    pub fn safe() -> Self {
        Self {
            leverage: 3,
            order_usdt: 5.0,
            stop_atr: 1.8,
            tp_r: 1.5,
            enter_score: 65.0,
        }
    }

    pub fn aggro() -> Self {
        Self {
            leverage: 8,
            order_usdt: 12.0,
            stop_atr: 1.3,
            tp_r: 2.0,
            enter_score: 55.0,
        }
    }

    /// Built-in profile for a mode
    pub fn for_mode(mode: TradingMode) -> Self {
        match mode {
            TradingMode::Safe => Self::safe(),
            TradingMode::Aggro => Self::aggro(),
        }
    }

    /// Parameter set the signal function runs with in this mode
    pub fn params(&self, side: SideFilter) -> ParameterSet {
        ParameterSet::new(self.enter_score, self.stop_atr, self.tp_r, side)
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.leverage == 0 {
            return Err(EngineError::invalid("leverage", "must be at least 1"));
        }
        if !(self.order_usdt > 0.0) {
            return Err(EngineError::invalid("order_usdt", "must be positive"));
        }
        self.params(SideFilter::Both).validate()
    }
}
