//! Parallel grid search over one history

use crate::backtest::{BacktestResult, Simulator};
use crate::config::{IndicatorConfig, ParameterGrid, ParameterSet, ScoreWeights, SimConfig};
use crate::data::Candle;
use crate::indicators::IndicatorFrame;
use crate::strategy::ScoreStrategy;
use crate::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::info;

/// Outcome of one parameter combination
#[derive(Debug, Clone, Serialize)]
pub struct GridResult {
    /// Position of the combination in grid order
    pub grid_index: usize,
    pub params: ParameterSet,
    pub result: BacktestResult,
}

/// Simulate every combination of `grid` on `candles`
///
/// Indicators are computed once and shared by all combinations. Results are
/// sorted by net PnL, then win rate; ties keep grid order.
pub fn run_grid(
    candles: &[Candle],
    grid: &ParameterGrid,
    indicators: &IndicatorConfig,
    weights: &ScoreWeights,
    sim: &SimConfig,
) -> Result<Vec<GridResult>> {
    grid.validate()?;
    weights.validate()?;
    let frame = IndicatorFrame::compute(candles, indicators)?;
    let simulator = Simulator::new(sim.clone())?;
    let combos = grid.combinations();
    info!(combinations = combos.len(), candles = candles.len(), "grid search started");

    let mut results: Vec<GridResult> = combos
        .par_iter()
        .enumerate()
        .map(|(grid_index, params)| {
            let strategy = ScoreStrategy::new(&frame, *params, weights.clone());
            GridResult {
                grid_index,
                params: *params,
                result: simulator.run(candles, &strategy),
            }
        })
        .collect();

    results.sort_by(compare_results);
    if let Some(best) = results.first() {
        info!(
            params = %best.params,
            net_pnl = best.result.net_pnl,
            win_rate = best.result.win_rate,
            trades = best.result.round_trips,
            "grid search finished"
        );
    }
    Ok(results)
}

/// Best first: higher net PnL, then higher win rate
fn compare_results(a: &GridResult, b: &GridResult) -> Ordering {
    b.result
        .net_pnl
        .total_cmp(&a.result.net_pnl)
        .then_with(|| b.result.win_rate.total_cmp(&a.result.win_rate))
}
