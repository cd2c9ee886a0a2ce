use anyhow::Result;
use clap::Args;
use quant_engine::config::{BotConfig, SearchConfig, WindowScheme};
use quant_engine::optimize::{walk_forward, CombinationReport, WalkForwardReport};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use super::load_candles;

#[derive(Args, Debug, Clone)]
pub struct WalkforwardArgs {
    /// Kline CSV with a `timestamp,open,high,low,close,volume` header
    #[arg(long)]
    pub data: PathBuf,

    /// Anchored scheme with this many folds
    #[arg(long, conflicts_with_all = ["train_bars", "test_bars"])]
    pub folds: Option<usize>,

    /// Rolling scheme train length in bars
    #[arg(long, requires = "test_bars")]
    pub train_bars: Option<usize>,

    /// Rolling scheme test length in bars
    #[arg(long, requires = "train_bars")]
    pub test_bars: Option<usize>,

    /// Minimum round trips in every test window
    #[arg(long)]
    pub min_trades: Option<usize>,

    /// Leaderboard rows to print
    #[arg(long)]
    pub top: Option<usize>,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl WalkforwardArgs {
    fn search(&self, base: &SearchConfig) -> SearchConfig {
        let mut search = base.clone();
        if let Some(folds) = self.folds {
            search.scheme = WindowScheme::Anchored { folds };
        }
        if let (Some(train_bars), Some(test_bars)) = (self.train_bars, self.test_bars) {
            search.scheme = WindowScheme::Rolling { train_bars, test_bars };
        }
        if let Some(min_trades) = self.min_trades {
            search.min_trades = min_trades;
        }
        if let Some(top) = self.top {
            search.top_n = top;
        }
        search
    }
}

fn format_row(rank: usize, entry: &CombinationReport) -> String {
    let test_trades: usize = entry.windows.iter().map(|w| w.test.round_trips).sum();
    let test_pnl: f64 = entry.windows.iter().map(|w| w.test.net_pnl).sum();
    format!(
        "{:<4}  {:<44}  {:>10.4}  {:>10.4}  {:>10.4}  {:>6}  {:>10.4}",
        rank,
        entry.params.to_string(),
        entry.stability,
        entry.mean_score,
        entry.worst_score,
        test_trades,
        test_pnl
    )
}

pub(crate) fn format_report(report: &WalkForwardReport) -> String {
    let mut out = format!(
        "{} combinations over {} windows\n\nBest: {}\n",
        report.evaluated,
        report.windows.len(),
        report.best.params
    );
    for (i, (window, outcome)) in report.windows.iter().zip(&report.best.windows).enumerate() {
        out.push_str(&format!(
            "  window {}: train {:?} ({} trades, pnl {:.4}) | test {:?} ({} trades, pnl {:.4}) | score {:.4}\n",
            i + 1,
            window.train,
            outcome.train.round_trips,
            outcome.train.net_pnl,
            window.test,
            outcome.test.round_trips,
            outcome.test.net_pnl,
            outcome.score
        ));
    }
    out.push_str(&format!(
        "\n{:<4}  {:<44}  {:>10}  {:>10}  {:>10}  {:>6}  {:>10}\n",
        "rank", "params", "stability", "mean", "worst", "trades", "test_pnl"
    ));
    for (rank, entry) in report.leaderboard.iter().enumerate() {
        out.push_str(&format_row(rank + 1, entry));
        out.push('\n');
    }
    out
}

pub fn run(config: &BotConfig, args: &WalkforwardArgs) -> Result<()> {
    let search = args.search(&config.search);
    let candles = load_candles(&args.data)?;
    let mut sim = config.sim.clone();
    sim.warmup_bars = sim.warmup_bars.max(config.indicators.warmup());

    let started = Instant::now();
    let report = walk_forward(candles.candles(), &search, &config.indicators, &config.weights, &sim)?;
    info!(
        best = %report.best.params,
        stability = report.best.stability,
        evaluated = report.evaluated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "walk-forward finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: WalkforwardArgs,
    }

    #[test]
    fn test_rolling_scheme_from_flags() {
        let harness = Harness::parse_from([
            "wf",
            "--data",
            "k.csv",
            "--train-bars",
            "800",
            "--test-bars",
            "200",
            "--min-trades",
            "5",
        ]);
        let search = harness.args.search(&SearchConfig::default());
        assert_eq!(
            search.scheme,
            WindowScheme::Rolling {
                train_bars: 800,
                test_bars: 200
            }
        );
        assert_eq!(search.min_trades, 5);
    }

    #[test]
    fn test_folds_conflict_with_rolling_flags() {
        let parsed = Harness::try_parse_from(["wf", "--data", "k.csv", "--folds", "3", "--train-bars", "10"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_defaults_kept_without_flags() {
        let harness = Harness::parse_from(["wf", "--data", "k.csv"]);
        assert_eq!(harness.args.search(&SearchConfig::default()), SearchConfig::default());
    }
}
