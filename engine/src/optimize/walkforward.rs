//! Walk-forward parameter selection
//!
//! Every combination is simulated on the train slice (reported only) and on
//! the test slice (scored) of each window. The selected combination
//! maximises `worst_weight * worst + (1 - worst_weight) * mean` of its test
//! scores, which favours parameters that hold up in their weakest window.

use crate::backtest::{BacktestResult, Simulator};
use crate::config::{IndicatorConfig, ParameterSet, ScoreWeights, SearchConfig, SimConfig, WindowScheme};
use crate::data::Candle;
use crate::error::EngineError;
use crate::indicators::IndicatorFrame;
use crate::strategy::ScoreStrategy;
use crate::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, info};

/// One train/test pair, as bar ranges of the full history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Cut `len` bars into windows; pairs with a side shorter than
/// `min_window_bars` are dropped.
pub fn split_windows(len: usize, scheme: &WindowScheme, min_window_bars: usize) -> Vec<Window> {
    let mut windows = Vec::new();
    match *scheme {
        WindowScheme::Anchored { folds } => {
            let step = len / (folds + 1);
            if step == 0 {
                return windows;
            }
            for k in 1..=folds {
                windows.push(Window {
                    train: 0..step * k,
                    test: step * k..step * (k + 1),
                });
            }
        }
        WindowScheme::Rolling { train_bars, test_bars } => {
            if train_bars == 0 || test_bars == 0 {
                return windows;
            }
            let mut start = 0;
            while start + train_bars + test_bars <= len {
                let split = start + train_bars;
                windows.push(Window {
                    train: start..split,
                    test: split..split + test_bars,
                });
                start += test_bars;
            }
        }
    }
    windows.retain(|w| w.train.len() >= min_window_bars && w.test.len() >= min_window_bars);
    windows
}

/// Fewest bars for which `scheme` yields at least one window
fn bars_needed(scheme: &WindowScheme, min_window_bars: usize) -> usize {
    match *scheme {
        WindowScheme::Anchored { folds } => (folds + 1) * min_window_bars.max(1),
        WindowScheme::Rolling { train_bars, test_bars } => {
            train_bars.max(min_window_bars) + test_bars.max(min_window_bars)
        }
    }
}

/// Test-window score: `-inf` below `min_trades` round trips, otherwise
/// net PnL minus the drawdown penalty.
pub fn score_result(result: &BacktestResult, config: &SearchConfig) -> f64 {
    if result.round_trips < config.min_trades {
        return f64::NEG_INFINITY;
    }
    result.net_pnl - config.drawdown_penalty * result.max_drawdown
}

/// Blend of worst and mean window score; `-inf` if any window is not finite
pub fn stability(scores: &[f64], worst_weight: f64) -> f64 {
    if scores.is_empty() || scores.iter().any(|s| !s.is_finite()) {
        return f64::NEG_INFINITY;
    }
    let worst = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    worst_weight * worst + (1.0 - worst_weight) * mean
}

/// Headline numbers of one simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub round_trips: usize,
    pub net_pnl: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
}

impl From<&BacktestResult> for WindowStats {
    fn from(result: &BacktestResult) -> Self {
        Self {
            round_trips: result.round_trips,
            net_pnl: result.net_pnl,
            win_rate: result.win_rate,
            max_drawdown: result.max_drawdown,
        }
    }
}

/// Train and test outcome of one combination in one window
#[derive(Debug, Clone, Serialize)]
pub struct WindowOutcome {
    pub train: WindowStats,
    pub test: WindowStats,
    pub score: f64,
}

/// Evaluation of one parameter combination across all windows
#[derive(Debug, Clone, Serialize)]
pub struct CombinationReport {
    pub params: ParameterSet,
    pub windows: Vec<WindowOutcome>,
    pub mean_score: f64,
    pub worst_score: f64,
    pub stability: f64,
}

impl CombinationReport {
    /// Every test window met the trade floor
    pub fn is_viable(&self) -> bool {
        self.stability.is_finite()
    }
}

/// Walk-forward search output
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardReport {
    pub best: CombinationReport,
    /// Best `top_n` combinations by stability
    pub leaderboard: Vec<CombinationReport>,
    pub windows: Vec<Window>,
    /// Number of combinations evaluated
    pub evaluated: usize,
}

struct WindowFrames {
    train: IndicatorFrame,
    test: IndicatorFrame,
}

/// Run the walk-forward search over `candles`
pub fn walk_forward(
    candles: &[Candle],
    search: &SearchConfig,
    indicators: &IndicatorConfig,
    weights: &ScoreWeights,
    sim: &SimConfig,
) -> Result<WalkForwardReport> {
    search.validate()?;
    weights.validate()?;
    let simulator = Simulator::new(sim.clone())?;

    let windows = split_windows(candles.len(), &search.scheme, search.min_window_bars);
    if windows.is_empty() {
        return Err(EngineError::NotEnoughCandles {
            needed: bars_needed(&search.scheme, search.min_window_bars),
            available: candles.len(),
        }
        .into());
    }

    let frames = windows
        .iter()
        .map(|w| {
            Ok(WindowFrames {
                train: IndicatorFrame::compute(&candles[w.train.clone()], indicators)?,
                test: IndicatorFrame::compute(&candles[w.test.clone()], indicators)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let combos = search.grid.combinations();
    info!(
        combinations = combos.len(),
        windows = windows.len(),
        candles = candles.len(),
        "walk-forward search started"
    );

    let mut reports: Vec<CombinationReport> = combos
        .par_iter()
        .map(|params| {
            let outcomes: Vec<WindowOutcome> = windows
                .iter()
                .zip(&frames)
                .map(|(window, frame)| {
                    let train_strategy = ScoreStrategy::new(&frame.train, *params, weights.clone());
                    let test_strategy = ScoreStrategy::new(&frame.test, *params, weights.clone());
                    let train = simulator.run(&candles[window.train.clone()], &train_strategy);
                    let test = simulator.run(&candles[window.test.clone()], &test_strategy);
                    WindowOutcome {
                        train: WindowStats::from(&train),
                        test: WindowStats::from(&test),
                        score: score_result(&test, search),
                    }
                })
                .collect();

            let scores: Vec<f64> = outcomes.iter().map(|o| o.score).collect();
            let worst_score = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;
            let report = CombinationReport {
                params: *params,
                stability: stability(&scores, search.worst_weight),
                windows: outcomes,
                mean_score,
                worst_score,
            };
            debug!(params = %report.params, stability = report.stability, "combination evaluated");
            report
        })
        .collect();

    // stable: equal stability keeps grid order
    reports.sort_by(|a, b| b.stability.total_cmp(&a.stability));

    let best = match reports.first() {
        Some(first) if first.is_viable() => first.clone(),
        _ => {
            return Err(EngineError::NoViableCombination {
                min_trades: search.min_trades,
            }
            .into())
        }
    };
    info!(
        params = %best.params,
        stability = best.stability,
        worst = best.worst_score,
        mean = best.mean_score,
        "walk-forward selection"
    );

    let evaluated = reports.len();
    reports.truncate(search.top_n.max(1));
    Ok(WalkForwardReport {
        best,
        leaderboard: reports,
        windows,
        evaluated,
    })
}
