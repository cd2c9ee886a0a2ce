use anyhow::Result;
use clap::Args;
use quant_engine::config::BotConfig;
use quant_engine::optimize::{run_grid, GridResult};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use super::load_candles;

#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Kline CSV with a `timestamp,open,high,low,close,volume` header
    #[arg(long)]
    pub data: PathBuf,

    /// Rows to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Print the top rows as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub(crate) fn format_table(results: &[GridResult]) -> String {
    let mut out = String::from("rank  grid  enter  stop_atr  tp_r  side   trades  win%    net_pnl     max_dd\n");
    for (rank, row) in results.iter().enumerate() {
        let p = &row.params;
        let r = &row.result;
        out.push_str(&format!(
            "{:<4}  {:<4}  {:<5}  {:<8}  {:<4}  {:<5}  {:>6}  {:>6.2}  {:>10.4}  {:>9.4}\n",
            rank + 1,
            row.grid_index,
            p.enter_score,
            p.stop_atr,
            p.tp_r,
            p.side.to_string(),
            r.round_trips,
            r.win_rate,
            r.net_pnl,
            r.max_drawdown
        ));
    }
    out
}

pub fn run(config: &BotConfig, args: &GridArgs) -> Result<()> {
    let candles = load_candles(&args.data)?;
    let mut sim = config.sim.clone();
    sim.warmup_bars = sim.warmup_bars.max(config.indicators.warmup());

    let started = Instant::now();
    let results = run_grid(
        candles.candles(),
        &config.search.grid,
        &config.indicators,
        &config.weights,
        &sim,
    )?;
    info!(
        combinations = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "grid finished"
    );

    let top = &results[..args.top.min(results.len())];
    if args.json {
        println!("{}", serde_json::to_string_pretty(top)?);
    } else {
        println!("{} combinations on {} candles", results.len(), candles.len());
        print!("{}", format_table(top));
    }
    Ok(())
}
