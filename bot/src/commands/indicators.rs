use anyhow::Result;
use clap::Args;
use quant_engine::config::{BotConfig, ScoreWeights};
use quant_engine::data::Candle;
use quant_engine::indicators::IndicatorFrame;
use quant_engine::portfolio::PositionSide;
use quant_engine::strategy::score;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use super::load_candles;

#[derive(Args, Debug, Clone)]
pub struct IndicatorsArgs {
    /// Kline CSV with a `timestamp,open,high,low,close,volume` header
    #[arg(long)]
    pub data: PathBuf,

    /// Write here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Include warm-up rows (score columns stay empty)
    #[arg(long, default_value_t = false)]
    pub all: bool,
}

/// Indicator and score columns, one row per bar
pub(crate) fn write_frame<W: Write>(
    writer: W,
    candles: &[Candle],
    frame: &IndicatorFrame,
    weights: &ScoreWeights,
    include_warmup: bool,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "timestamp",
        "close",
        "ema_fast",
        "ema_slow",
        "rsi",
        "atr",
        "score_long",
        "score_short",
    ])?;

    let mut rows = 0;
    for (i, candle) in candles.iter().enumerate() {
        let snapshot = frame.snapshot(i);
        if snapshot.is_none() && !include_warmup {
            continue;
        }
        let (long, short) = match &snapshot {
            Some(s) => (
                format!("{:.2}", score(s, candle.close, PositionSide::Long, weights)),
                format!("{:.2}", score(s, candle.close, PositionSide::Short, weights)),
            ),
            None => (String::new(), String::new()),
        };
        wtr.write_record([
            candle.timestamp.timestamp_millis().to_string(),
            candle.close.to_string(),
            format!("{:.6}", frame.ema_fast()[i]),
            format!("{:.6}", frame.ema_slow()[i]),
            format!("{:.4}", frame.rsi()[i]),
            format!("{:.6}", frame.atr()[i]),
            long,
            short,
        ])?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

pub fn run(config: &BotConfig, args: &IndicatorsArgs) -> Result<()> {
    let candles = load_candles(&args.data)?;
    let frame = IndicatorFrame::compute(candles.candles(), &config.indicators)?;

    let rows = match &args.output {
        Some(path) => write_frame(File::create(path)?, candles.candles(), &frame, &config.weights, args.all)?,
        None => write_frame(std::io::stdout().lock(), candles.candles(), &frame, &config.weights, args.all)?,
    };
    tracing::info!(rows, warmup = frame.warmup(), "indicator dump written");
    Ok(())
}
