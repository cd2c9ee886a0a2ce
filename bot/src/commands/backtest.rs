use anyhow::Result;
use clap::Args;
use quant_engine::backtest::{BacktestReport, Simulator};
use quant_engine::config::{BotConfig, ParameterSet, PartialTakeProfit, SideFilter, SimConfig, TrailingConfig};
use quant_engine::indicators::IndicatorFrame;
use quant_engine::strategy::ScoreStrategy;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use super::load_candles;

#[derive(Args, Debug, Clone)]
pub struct BacktestArgs {
    /// Kline CSV with a `timestamp,open,high,low,close,volume` header
    #[arg(long)]
    pub data: PathBuf,

    /// Minimum score to enter
    #[arg(long)]
    pub enter_score: Option<f64>,

    /// Stop distance as an ATR multiple
    #[arg(long)]
    pub stop_atr: Option<f64>,

    /// Target distance as a multiple of the stop distance
    #[arg(long)]
    pub tp_r: Option<f64>,

    /// long, short or both
    #[arg(long)]
    pub side: Option<SideFilter>,

    /// Enable an ATR trailing stop at this multiple
    #[arg(long)]
    pub trail_atr: Option<f64>,

    /// Close half the position at this fraction of the way to the target
    #[arg(long)]
    pub partial_at: Option<f64>,

    /// Close after this many bars held
    #[arg(long)]
    pub time_exit: Option<usize>,

    /// Bars without entries after a close
    #[arg(long)]
    pub cooldown: Option<usize>,

    /// Print every trade record
    #[arg(long, default_value_t = false)]
    pub trades: bool,

    /// Print the result as JSON instead of the text report
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl BacktestArgs {
    fn params(&self, base: ParameterSet) -> ParameterSet {
        ParameterSet {
            enter_score: self.enter_score.unwrap_or(base.enter_score),
            stop_atr: self.stop_atr.unwrap_or(base.stop_atr),
            tp_r: self.tp_r.unwrap_or(base.tp_r),
            side: self.side.unwrap_or(base.side),
        }
    }

    fn sim(&self, config: &BotConfig) -> SimConfig {
        let mut sim = config.sim.clone();
        if let Some(atr_mult) = self.trail_atr {
            sim.trailing = Some(TrailingConfig {
                atr_mult,
                atr_period: config.indicators.atr_period,
            });
        }
        if let Some(at_fraction) = self.partial_at {
            sim.partial_tp = Some(PartialTakeProfit {
                at_fraction,
                ..Default::default()
            });
        }
        if self.time_exit.is_some() {
            sim.time_exit_bars = self.time_exit;
        }
        if let Some(cooldown) = self.cooldown {
            sim.cooldown_bars = cooldown;
        }
        // never query the strategy before its indicators are warm
        sim.warmup_bars = sim.warmup_bars.max(config.indicators.warmup());
        sim
    }
}

pub fn run(config: &BotConfig, args: &BacktestArgs) -> Result<()> {
    let params = args.params(config.params);
    params.validate()?;
    let sim = args.sim(config);
    sim.validate()?;

    let candles = load_candles(&args.data)?;
    let frame = IndicatorFrame::compute(candles.candles(), &config.indicators)?;
    let strategy = ScoreStrategy::new(&frame, params, config.weights.clone());

    let started = Instant::now();
    let result = Simulator::new(sim)?.run(candles.candles(), &strategy);
    info!(
        params = %params,
        trades = result.round_trips,
        net_pnl = result.net_pnl,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "backtest finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let report = BacktestReport::new(result);
    println!("Parameters: {}", params);
    println!("{}", report.format());
    if args.trades {
        println!("{}", report.format_trades());
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
        args: BacktestArgs,
    }

    #[test]
    fn test_overrides_merge_with_config() {
        let harness = Harness::parse_from([
            "bt",
            "--data",
            "k.csv",
            "--enter-score",
            "72",
            "--side",
            "short",
            "--trail-atr",
            "1.5",
            "--time-exit",
            "24",
        ]);
        let config = BotConfig::default();

        let params = harness.args.params(config.params);
        assert_eq!(params.enter_score, 72.0);
        assert_eq!(params.side, SideFilter::Short);
        assert_eq!(params.stop_atr, config.params.stop_atr);

        let sim = harness.args.sim(&config);
        assert_eq!(sim.trailing.map(|t| t.atr_mult), Some(1.5));
        assert_eq!(sim.time_exit_bars, Some(24));
        assert!(sim.partial_tp.is_none());
        assert!(sim.warmup_bars >= config.indicators.warmup());
    }
}
