//! Subcommand implementations

use anyhow::{bail, Result};
use quant_engine::data::{load_csv, CandleSeries};
use std::path::Path;
use tracing::info;

pub mod backtest;
pub mod grid;
pub mod indicators;
pub mod paper;
pub mod version;
pub mod walkforward;

pub use backtest::BacktestArgs;
pub use grid::GridArgs;
pub use indicators::IndicatorsArgs;
pub use paper::PaperArgs;
pub use walkforward::WalkforwardArgs;

/// Load a kline CSV, refusing an empty file
pub(crate) fn load_candles(path: &Path) -> Result<CandleSeries> {
    let series = load_csv(path)?;
    if series.is_empty() {
        bail!("{} holds no candles", path.display());
    }
    info!(
        path = %path.display(),
        candles = series.len(),
        first = %series.candles()[0].timestamp,
        last = %series.candles()[series.len() - 1].timestamp,
        "klines loaded"
    );
    Ok(series)
}
