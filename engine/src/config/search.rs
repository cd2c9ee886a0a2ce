//! Parameter search configuration

use crate::config::{ParameterSet, SideFilter};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Axes of the parameter grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub enter_scores: Vec<f64>,
    pub stop_atrs: Vec<f64>,
    pub tp_rs: Vec<f64>,
    pub sides: Vec<SideFilter>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            enter_scores: vec![55.0, 60.0, 65.0, 70.0, 75.0],
            stop_atrs: vec![1.2, 1.5, 1.8, 2.1],
            tp_rs: vec![1.2, 1.5, 2.0],
            sides: vec![SideFilter::Both],
        }
    }
}

impl ParameterGrid {
    /// Grid holding a single parameter set
    pub fn single(params: ParameterSet) -> Self {
        Self {
            enter_scores: vec![params.enter_score],
            stop_atrs: vec![params.stop_atr],
            tp_rs: vec![params.tp_r],
            sides: vec![params.side],
        }
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.enter_scores.len() * self.stop_atrs.len() * self.tp_rs.len() * self.sides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All combinations, enter score outermost, side innermost
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut out = Vec::with_capacity(self.len());
        for &enter_score in &self.enter_scores {
            for &stop_atr in &self.stop_atrs {
                for &tp_r in &self.tp_rs {
                    for &side in &self.sides {
                        out.push(ParameterSet::new(enter_score, stop_atr, tp_r, side));
                    }
                }
            }
        }
        out
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.is_empty() {
            return Err(EngineError::invalid("grid", "every axis needs at least one value"));
        }
        self.combinations()
            .iter()
            .try_for_each(|params| params.validate())
    }
}

/// How the history is cut into train/test windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WindowScheme {
    /// Expanding train window: fold k trains on `[0, step*k)` and tests on
    /// `[step*k, step*(k+1))` with `step = len / (folds + 1)`
    Anchored { folds: usize },
    /// Fixed-size train window followed by a test window, advanced by the
    /// test length
    Rolling { train_bars: usize, test_bars: usize },
}

impl Default for WindowScheme {
    fn default() -> Self {
        WindowScheme::Anchored { folds: 4 }
    }
}

/// Walk-forward search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParameterGrid,
    pub scheme: WindowScheme,
    /// Windows need at least this many bars on both sides (inclusive: a side
    /// of exactly `min_window_bars` is kept)
    pub min_window_bars: usize,
    /// Test windows with fewer round trips score `-inf`
    pub min_trades: usize,
    /// Score is `net_pnl - drawdown_penalty * max_drawdown`
    pub drawdown_penalty: f64,
    /// Stability is `worst_weight * worst + (1 - worst_weight) * mean`
    pub worst_weight: f64,
    /// Leaderboard length
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: ParameterGrid::default(),
            scheme: WindowScheme::default(),
            min_window_bars: 200,
            min_trades: 15,
            drawdown_penalty: 1.3,
            worst_weight: 0.6,
            top_n: 10,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        self.grid.validate()?;
        match self.scheme {
            WindowScheme::Anchored { folds } if folds == 0 => {
                return Err(EngineError::invalid("scheme.folds", "must be positive"));
            }
            WindowScheme::Rolling { train_bars, test_bars } if train_bars == 0 || test_bars == 0 => {
                return Err(EngineError::invalid("scheme", "train and test bars must be positive"));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.worst_weight) {
            return Err(EngineError::invalid("worst_weight", "must be inside [0, 1]"));
        }
        if !self.drawdown_penalty.is_finite() || self.drawdown_penalty < 0.0 {
            return Err(EngineError::invalid("drawdown_penalty", "must be >= 0"));
        }
        Ok(())
    }
}
