//! Strategy configuration

use crate::error::EngineError;
use crate::portfolio::PositionSide;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Indicator periods used to build an [`crate::indicators::IndicatorFrame`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Fast EMA period
    pub ema_fast: usize,
    /// Slow EMA period
    pub ema_slow: usize,
    /// RSI period
    pub rsi_period: usize,
    /// ATR period
    pub atr_period: usize,
    /// Explicit warm-up override; derived from the periods when unset
    pub warmup_bars: Option<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            rsi_period: 14,
            atr_period: 14,
            warmup_bars: None,
        }
    }
}

impl IndicatorConfig {
    /// First bar index at which snapshots are considered reliable.
    pub fn warmup(&self) -> usize {
        self.warmup_bars.unwrap_or_else(|| {
            self.ema_slow
                .max(self.ema_fast)
                .max(self.rsi_period + 1)
                .max(self.atr_period + 1)
                + 10
        })
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        for (field, period) in [
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
        ] {
            if period == 0 {
                return Err(EngineError::invalid(field, "period must be positive"));
            }
        }
        if self.ema_fast >= self.ema_slow {
            return Err(EngineError::invalid(
                "ema_fast",
                format!("fast period {} must be below slow period {}", self.ema_fast, self.ema_slow),
            ));
        }
        Ok(())
    }
}

/// Point weights of the entry score
///
/// Defaults add up to 100: price beyond the slow EMA (25), price beyond the
/// fast EMA (20), RSI inside the neutral band (20), ATR/price inside the
/// volatility band (15) and EMA ordering (20).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub slow_trend: f64,
    pub fast_trend: f64,
    pub rsi_band: f64,
    pub volatility: f64,
    pub ema_order: f64,
    /// Lower RSI bound (exclusive)
    pub rsi_low: f64,
    /// Upper RSI bound (exclusive)
    pub rsi_high: f64,
    /// ATR/price floor; below it no entry is taken at all
    pub min_volatility: f64,
    /// ATR/price ceiling for the volatility points (exclusive)
    pub max_volatility: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            slow_trend: 25.0,
            fast_trend: 20.0,
            rsi_band: 20.0,
            volatility: 15.0,
            ema_order: 20.0,
            rsi_low: 45.0,
            rsi_high: 65.0,
            min_volatility: 0.002,
            max_volatility: 0.02,
        }
    }
}

impl ScoreWeights {
    /// Maximum reachable score
    pub fn total(&self) -> f64 {
        self.slow_trend + self.fast_trend + self.rsi_band + self.volatility + self.ema_order
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        for (field, w) in [
            ("slow_trend", self.slow_trend),
            ("fast_trend", self.fast_trend),
            ("rsi_band", self.rsi_band),
            ("volatility", self.volatility),
            ("ema_order", self.ema_order),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::invalid(field, format!("weight {} must be >= 0", w)));
            }
        }
        if !(0.0..=100.0).contains(&self.rsi_low) || self.rsi_low >= self.rsi_high || self.rsi_high > 100.0 {
            return Err(EngineError::invalid(
                "rsi_low",
                format!("band ({}, {}) is not inside [0, 100]", self.rsi_low, self.rsi_high),
            ));
        }
        if self.min_volatility < 0.0 || self.min_volatility >= self.max_volatility {
            return Err(EngineError::invalid(
                "min_volatility",
                format!("band [{}, {}) is empty", self.min_volatility, self.max_volatility),
            ));
        }
        Ok(())
    }
}

/// Which sides a parameter set may trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SideFilter {
    Long,
    Short,
    #[default]
    Both,
}

impl SideFilter {
    pub fn allows(&self, side: PositionSide) -> bool {
        matches!(
            (self, side),
            (SideFilter::Both, _)
                | (SideFilter::Long, PositionSide::Long)
                | (SideFilter::Short, PositionSide::Short)
        )
    }
}

impl fmt::Display for SideFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SideFilter::Long => "long",
            SideFilter::Short => "short",
            SideFilter::Both => "both",
        };
        f.write_str(s)
    }
}

impl FromStr for SideFilter {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(SideFilter::Long),
            "short" => Ok(SideFilter::Short),
            "both" => Ok(SideFilter::Both),
            other => Err(EngineError::invalid("side", format!("unknown side `{}`", other))),
        }
    }
}

/// Entry/exit parameters shared by the backtester and the live trader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Minimum score (0-100) for an entry
    pub enter_score: f64,
    /// Stop distance as an ATR multiple
    pub stop_atr: f64,
    /// Take-profit distance as a multiple of the stop distance
    pub tp_r: f64,
    /// Allowed sides
    pub side: SideFilter,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            enter_score: 65.0,
            stop_atr: 1.8,
            tp_r: 1.5,
            side: SideFilter::Both,
        }
    }
}

impl ParameterSet {
    pub fn new(enter_score: f64, stop_atr: f64, tp_r: f64, side: SideFilter) -> Self {
        Self {
            enter_score,
            stop_atr,
            tp_r,
            side,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if !(0.0..=100.0).contains(&self.enter_score) {
            return Err(EngineError::invalid(
                "enter_score",
                format!("{} is outside [0, 100]", self.enter_score),
            ));
        }
        if !(self.stop_atr > 0.0) {
            return Err(EngineError::invalid("stop_atr", "must be positive"));
        }
        if !(self.tp_r > 0.0) {
            return Err(EngineError::invalid("tp_r", "must be positive"));
        }
        Ok(())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "enter_score={} stop_atr={} tp_r={} side={}",
            self.enter_score, self.stop_atr, self.tp_r, self.side
        )
    }
}
