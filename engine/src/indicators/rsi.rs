//! RSI (Relative Strength Index) indicator

use crate::error::EngineError;
use crate::indicators::Indicator;
use crate::Result;

/// RSI reported while there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Wilder-smoothed RSI
///
/// The first average is the simple mean of the first `period` gains and
/// losses; afterwards `avg = (avg * (period - 1) + x) / period`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    diffs: usize,
    avg_gain: f64,
    avg_loss: f64,
    last_value: Option<f64>,
}

impl Rsi {
    /// Create new RSI indicator
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::InvalidPeriod {
                indicator: "RSI",
                period,
            }
            .into());
        }
        Ok(Self {
            period,
            prev: None,
            diffs: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            last_value: None,
        })
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }

    fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        let total = avg_gain + avg_loss;
        if total <= 0.0 {
            // no movement at all
            return NEUTRAL_RSI;
        }
        (100.0 * avg_gain / total).clamp(0.0, 100.0)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        let Some(prev) = self.prev.replace(value) else {
            return;
        };
        let diff = value - prev;
        let gain = diff.max(0.0);
        let loss = (-diff).max(0.0);
        let p = self.period as f64;

        self.diffs += 1;
        if self.diffs <= self.period {
            // accumulate sums, averaged once the seed window is full
            self.avg_gain += gain;
            self.avg_loss += loss;
            if self.diffs == self.period {
                self.avg_gain /= p;
                self.avg_loss /= p;
                self.last_value = Some(Self::from_averages(self.avg_gain, self.avg_loss));
            }
        } else {
            self.avg_gain = (self.avg_gain * (p - 1.0) + gain) / p;
            self.avg_loss = (self.avg_loss * (p - 1.0) + loss) / p;
            self.last_value = Some(Self::from_averages(self.avg_gain, self.avg_loss));
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        // needs period+1 values
        self.last_value.is_some()
    }
}

/// RSI of every point in `values`; warm-up bars read [`NEUTRAL_RSI`].
pub fn rsi(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut rsi = Rsi::new(period)?;
    Ok(values
        .iter()
        .map(|&v| {
            rsi.update(v);
            rsi.value().unwrap_or(NEUTRAL_RSI)
        })
        .collect())
}

/// RSI of the full slice, `None` when fewer than `period + 1` values.
pub fn last_rsi(values: &[f64], period: usize) -> Result<Option<f64>> {
    let mut rsi = Rsi::new(period)?;
    for &v in values {
        rsi.update(v);
    }
    Ok(rsi.value())
}
