//! Backtest trade records and performance metrics

use crate::portfolio::PositionSide;
use serde::Serialize;
use std::fmt;

/// Why a (partial) position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOutcome {
    StopLoss,
    TrailingStop,
    TakeProfit,
    PartialTakeProfit,
    TimeExit,
    EndOfData,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeOutcome::StopLoss => "stop_loss",
            TradeOutcome::TrailingStop => "trailing_stop",
            TradeOutcome::TakeProfit => "take_profit",
            TradeOutcome::PartialTakeProfit => "partial_take_profit",
            TradeOutcome::TimeExit => "time_exit",
            TradeOutcome::EndOfData => "end_of_data",
        };
        f.write_str(s)
    }
}

/// One full or partial close
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub position_id: usize,
    pub side: PositionSide,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Share of the opening size closed by this record
    pub fraction: f64,
    pub outcome: TradeOutcome,
    /// Realized PnL after fees and slippage
    pub pnl: f64,
    /// Fees charged for this share, entry and exit leg
    pub fees: f64,
    /// Slippage charged for this share, entry and exit leg
    pub slippage: f64,
    /// Entry score of the opening signal
    pub score: f64,
}

/// Backtest result
#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestResult {
    /// Every close in order
    pub records: Vec<TradeRecord>,
    /// Number of positions opened and closed
    pub round_trips: usize,
    /// Positions with a positive total PnL
    pub wins: usize,
    /// Positions with a zero or negative total PnL
    pub losses: usize,
    /// Win rate in percent
    pub win_rate: f64,
    /// Net PnL after costs
    pub net_pnl: f64,
    /// Fees plus slippage paid
    pub costs_paid: f64,
    /// Largest peak-to-trough fall of the realized equity curve
    pub max_drawdown: f64,
    /// `max_drawdown` relative to the initial balance, in percent
    pub max_drawdown_pct: f64,
    pub initial_balance: f64,
    pub final_equity: f64,
    pub profit_factor: f64,
    /// Average PnL per position
    pub expectancy: f64,
}

impl BacktestResult {
    /// Result without any trade
    pub fn empty(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            final_equity: initial_balance,
            ..Default::default()
        }
    }

    /// Aggregate metrics over `records`
    pub fn from_records(records: Vec<TradeRecord>, initial_balance: f64) -> Self {
        let pnls = MetricsCalculator::position_pnls(&records);
        let wins = pnls.iter().filter(|p| **p > 0.0).count();
        let round_trips = pnls.len();
        let net_pnl: f64 = records.iter().map(|r| r.pnl).sum();
        let costs_paid: f64 = records.iter().map(|r| r.fees + r.slippage).sum();
        let max_drawdown = MetricsCalculator::max_drawdown(&records);

        Self {
            round_trips,
            wins,
            losses: round_trips - wins,
            win_rate: if round_trips == 0 {
                0.0
            } else {
                wins as f64 / round_trips as f64 * 100.0
            },
            net_pnl,
            costs_paid,
            max_drawdown,
            max_drawdown_pct: if initial_balance > 0.0 {
                max_drawdown / initial_balance * 100.0
            } else {
                0.0
            },
            initial_balance,
            final_equity: initial_balance + net_pnl,
            profit_factor: MetricsCalculator::profit_factor(&pnls),
            expectancy: MetricsCalculator::expectancy(&pnls),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of one outcome
    pub fn count_outcome(&self, outcome: TradeOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Calculate metrics from trade records
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Total PnL per position, in opening order
    pub fn position_pnls(records: &[TradeRecord]) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        let mut current: Option<usize> = None;
        for record in records {
            if current == Some(record.position_id) {
                if let Some(last) = out.last_mut() {
                    *last += record.pnl;
                    continue;
                }
            }
            out.push(record.pnl);
            current = Some(record.position_id);
        }
        out
    }

    /// Max drawdown of the realized equity curve starting at 0
    pub fn max_drawdown(records: &[TradeRecord]) -> f64 {
        let mut equity = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut max_dd = 0.0_f64;
        for record in records {
            equity += record.pnl;
            peak = peak.max(equity);
            max_dd = max_dd.max(peak - equity);
        }
        max_dd
    }

    /// Gross profit over gross loss; infinite without losses, 0 without trades
    pub fn profit_factor(pnls: &[f64]) -> f64 {
        let profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
        let loss: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| -p).sum();
        if loss > 0.0 {
            profit / loss
        } else if profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Calculate expectancy
    pub fn expectancy(pnls: &[f64]) -> f64 {
        if pnls.is_empty() {
            return 0.0;
        }
        pnls.iter().sum::<f64>() / pnls.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(position_id: usize, pnl: f64, outcome: TradeOutcome) -> TradeRecord {
        TradeRecord {
            position_id,
            side: PositionSide::Long,
            entry_index: 0,
            exit_index: 1,
            entry_price: 100.0,
            exit_price: 100.0,
            fraction: 1.0,
            outcome,
            pnl,
            fees: 0.1,
            slippage: 0.05,
            score: 70.0,
        }
    }

    #[test]
    fn test_partial_records_count_as_one_position() {
        let records = vec![
            record(0, 2.0, TradeOutcome::PartialTakeProfit),
            record(0, -0.5, TradeOutcome::StopLoss),
            record(1, -3.0, TradeOutcome::StopLoss),
            record(2, 4.0, TradeOutcome::TakeProfit),
        ];
        let result = BacktestResult::from_records(records, 1000.0);
        assert_eq!(result.round_trips, 3);
        assert_eq!(result.wins, 2);
        assert_eq!(result.losses, 1);
        assert!((result.net_pnl - 2.5).abs() < 1e-12);
        assert!((result.max_drawdown - 3.5).abs() < 1e-12);
        assert!((result.max_drawdown_pct - 0.35).abs() < 1e-12);
        assert!((result.profit_factor - 5.5 / 3.0).abs() < 1e-12);
        assert!((result.costs_paid - 0.6).abs() < 1e-12);
        assert_eq!(result.count_outcome(TradeOutcome::StopLoss), 2);
    }

    #[test]
    fn test_empty_result() {
        let result = BacktestResult::from_records(Vec::new(), 500.0);
        assert_eq!(result.round_trips, 0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.final_equity, 500.0);
        assert_eq!(result.profit_factor, 0.0);
    }
}
