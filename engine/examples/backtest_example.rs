//! Example: score strategy backtest on synthetic candles

use chrono::{Duration, Utc};
use quant_engine::backtest::{BacktestReport, Simulator};
use quant_engine::config::{IndicatorConfig, ParameterSet, PartialTakeProfit, ScoreWeights, SimConfig, TrailingConfig};
use quant_engine::data::{Candle, CandleSeries};
use quant_engine::indicators::IndicatorFrame;
use quant_engine::strategy::ScoreStrategy;
use quant_engine::Result;

fn create_test_candles(count: usize, base_price: f64) -> Vec<Candle> {
    let base_time = Utc::now() - Duration::minutes(15 * count as i64);
    let mut prev = base_price;

    (0..count)
        .map(|i| {
            // slow swings with a faster ripple on top
            let swing = 12.0 * (i as f64 / 60.0).sin();
            let ripple = 1.5 * (i as f64 / 5.0).sin();
            let close = base_price + swing + ripple;
            let open = prev;
            prev = close;
            Candle::new(
                open,
                open.max(close) + 0.4,
                open.min(close) - 0.4,
                close,
                1000.0,
                base_time + Duration::minutes(15 * i as i64),
            )
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Quant-Engine Backtest Example ===\n");

    let series = CandleSeries::from_vec(create_test_candles(1_000, 100.0));
    let indicators = IndicatorConfig::default();
    let frame = IndicatorFrame::compute(series.candles(), &indicators)?;

    let strategy = ScoreStrategy::new(&frame, ParameterSet::default(), ScoreWeights::default());
    let simulator = Simulator::new(SimConfig {
        warmup_bars: indicators.warmup(),
        trailing: Some(TrailingConfig::default()),
        partial_tp: Some(PartialTakeProfit::default()),
        time_exit_bars: Some(24),
        ..Default::default()
    })?;

    println!("Running backtest over {} candles...", series.len());
    let result = simulator.run(series.candles(), &strategy);

    let report = BacktestReport::new(result);
    println!("{}", report.format());
    println!("{}", report.format_trades());

    Ok(())
}
