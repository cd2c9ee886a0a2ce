//! Backtest report generation

use crate::backtest::{BacktestResult, TradeOutcome};

/// Backtest report
#[derive(Debug)]
pub struct BacktestReport {
    result: BacktestResult,
}

impl BacktestReport {
    /// Create new report from result
    pub fn new(result: BacktestResult) -> Self {
        Self { result }
    }

    /// Format report as string
    pub fn format(&self) -> String {
        let r = &self.result;
        format!(
            r#"
Backtest Results
================
Initial Balance: ${:.2}
Final Equity: ${:.2}
Net PnL: ${:.2}
Costs Paid: ${:.2}
Round Trips: {}
Wins: {}
Losses: {}
Win Rate: {:.2}%
Profit Factor: {:.2}
Expectancy: ${:.4}
Maximum Drawdown: ${:.2} ({:.2}%)

Exits
-----
Stop Loss: {}
Trailing Stop: {}
Take Profit: {}
Partial Take Profit: {}
Time Exit: {}
End Of Data: {}
"#,
            r.initial_balance,
            r.final_equity,
            r.net_pnl,
            r.costs_paid,
            r.round_trips,
            r.wins,
            r.losses,
            r.win_rate,
            r.profit_factor,
            r.expectancy,
            r.max_drawdown,
            r.max_drawdown_pct,
            r.count_outcome(TradeOutcome::StopLoss),
            r.count_outcome(TradeOutcome::TrailingStop),
            r.count_outcome(TradeOutcome::TakeProfit),
            r.count_outcome(TradeOutcome::PartialTakeProfit),
            r.count_outcome(TradeOutcome::TimeExit),
            r.count_outcome(TradeOutcome::EndOfData),
        )
    }

    /// One line per trade record
    pub fn format_trades(&self) -> String {
        let mut out = String::from("id  side   entry_i  exit_i  entry       exit        frac  outcome              pnl\n");
        for t in &self.result.records {
            out.push_str(&format!(
                "{:<3} {:<6} {:>7}  {:>6}  {:<10.4}  {:<10.4}  {:.2}  {:<19}  {:.4}\n",
                t.position_id,
                t.side.to_string(),
                t.entry_index,
                t.exit_index,
                t.entry_price,
                t.exit_price,
                t.fraction,
                t.outcome.to_string(),
                t.pnl
            ));
        }
        out
    }

    /// Get result reference
    pub fn result(&self) -> &BacktestResult {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = BacktestReport::new(BacktestResult::empty(1000.0));
        let text = report.format();
        assert!(text.contains("Round Trips: 0"));
        assert!(text.contains("Final Equity: $1000.00"));
        assert_eq!(report.format_trades().lines().count(), 1);
    }
}
