//! Data management module
//!
//! OHLCV candles and the kline CSV interchange format.

pub mod candle;
pub mod klines;

pub use candle::*;
pub use klines::*;
