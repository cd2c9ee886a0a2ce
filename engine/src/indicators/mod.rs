//! Technical indicators module
//!
//! EMA is delegated to the `ta` crate; RSI and ATR use Wilder smoothing
//! on top of `ta`'s true range. Every indicator exists as a streaming
//! struct and as a series function over a slice.

pub mod ema;
pub mod rsi;
pub mod atr;
pub mod frame;

pub use ema::*;
pub use rsi::*;
pub use atr::*;
pub use frame::*;

/// Indicator trait for all indicators
pub trait Indicator<T = f64> {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, input: T);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}
