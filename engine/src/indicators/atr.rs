//! ATR (Average True Range) indicator

use crate::data::Candle;
use crate::error::EngineError;
use crate::indicators::Indicator;
use crate::Result;
use ta::indicators::TrueRange;
use ta::Next;

/// Wilder ATR over `ta`'s true range
///
/// The first `period` bars use the running mean of the true ranges seen so
/// far (exposed through [`Atr::current`]); `value()` stays `None` until the
/// seed window is full.
#[derive(Debug, Clone)]
pub struct Atr {
    true_range: TrueRange,
    period: usize,
    update_count: usize,
    current: f64,
}

impl Atr {
    /// Create new ATR indicator
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::InvalidPeriod {
                indicator: "ATR",
                period,
            }
            .into());
        }
        Ok(Self {
            true_range: TrueRange::new(),
            period,
            update_count: 0,
            current: 0.0,
        })
    }

    /// Get ATR period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Latest estimate including the warm-up running mean
    pub fn current(&self) -> f64 {
        self.current
    }
}

impl<'a> Indicator<&'a Candle> for Atr {
    fn name(&self) -> &str {
        "ATR"
    }

    fn update(&mut self, candle: &'a Candle) {
        let tr = self.true_range.next(candle).max(0.0);
        self.update_count += 1;
        let n = self.update_count.min(self.period) as f64;
        // running mean until the window fills, Wilder smoothing after
        self.current += (tr - self.current) / n;
    }

    fn value(&self) -> Option<f64> {
        self.is_ready().then_some(self.current)
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.period
    }
}

/// ATR of every candle; warm-up bars carry the running mean of true ranges.
pub fn atr(candles: &[Candle], period: usize) -> Result<Vec<f64>> {
    let mut atr = Atr::new(period)?;
    Ok(candles
        .iter()
        .map(|c| {
            atr.update(c);
            atr.current()
        })
        .collect())
}

/// ATR after the last candle, `None` before the seed window is full.
pub fn last_atr(candles: &[Candle], period: usize) -> Result<Option<f64>> {
    let mut atr = Atr::new(period)?;
    for c in candles {
        atr.update(c);
    }
    Ok(atr.value())
}
