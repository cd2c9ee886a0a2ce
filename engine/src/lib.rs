//! Quant-Engine: signal engine, backtester and walk-forward optimizer for a
//! USDT-margined futures bot.
//!
//! The crate is built around a few pure pieces:
//! - [ta-rs](https://github.com/greyblake/ta-rs) backed technical indicators (EMA, RSI, ATR)
//! - a weighted point score that turns indicator snapshots into entry signals
//! - a bar-by-bar simulator with fees, slippage, trailing stops and partial exits
//! - grid and walk-forward parameter search that favours robust parameter sets
//!
//! Exchange and chat connectivity are not part of the crate: the [`live`]
//! module only defines the seams (`Exchange`, `Notifier`) plus the retry
//! policy and session state that a live loop needs.
//!
//! # Features
//!
//! - **Data Management**: OHLCV candles and the `timestamp,open,high,low,close,volume` CSV format
//! - **Technical Indicators**: EMA, RSI, ATR as series functions and streaming structs
//! - **Strategy Engine**: score-based signal function shared by backtests and live trading
//! - **Backtesting**: bar-by-bar simulation with trade records and performance metrics
//! - **Optimization**: parallel grid search and walk-forward selection
//!
//! # Example
//!
//! ```no_run
//! use quant_engine::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let candles = load_csv("data/BTCUSDT_15m.csv")?;
//!     let frame = IndicatorFrame::compute(candles.candles(), &IndicatorConfig::default())?;
//!     let strategy = ScoreStrategy::new(&frame, ParameterSet::default(), ScoreWeights::default());
//!     let simulator = Simulator::new(SimConfig::default())?;
//!     let result = simulator.run(candles.candles(), &strategy);
//!     println!("{}", BacktestReport::new(result).format());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod live;
pub mod optimize;
pub mod portfolio;
pub mod strategy;
pub mod backtest;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::indicators::*;
    pub use crate::live::*;
    pub use crate::optimize::*;
    pub use crate::portfolio::*;
    pub use crate::strategy::*;
    pub use crate::backtest::*;

    pub use anyhow::{Result, Context};
}

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
