//! Signal function trait

use crate::strategy::Signal;

/// Signal function queried by the simulator at a bar's close
///
/// `index` is the bar index in the candle slice being simulated, so
/// strategies can look up precomputed indicators without lookahead.
pub trait Strategy {
    /// Evaluate an entry at `price` on bar `index`
    fn evaluate(&self, price: f64, index: usize) -> Signal;

    /// Get strategy name
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Strategy for F
where
    F: Fn(f64, usize) -> Signal,
{
    fn evaluate(&self, price: f64, index: usize) -> Signal {
        self(price, index)
    }
}
