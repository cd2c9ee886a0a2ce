//! EMA (Exponential Moving Average) indicator

use crate::error::EngineError;
use crate::indicators::Indicator;
use crate::Result;
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

/// EMA indicator wrapper
///
/// `ta`'s EMA is seeded with the first input and smooths with
/// `k = 2 / (period + 1)` afterwards, so a value exists from the first update.
#[derive(Debug, Clone)]
pub struct Ema {
    inner: ExponentialMovingAverage,
    period: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl Ema {
    /// Create new EMA indicator
    pub fn new(period: usize) -> Result<Self> {
        let inner = ExponentialMovingAverage::new(period).map_err(|_| EngineError::InvalidPeriod {
            indicator: "EMA",
            period,
        })?;
        Ok(Self {
            inner,
            period,
            update_count: 0,
            last_value: None,
        })
    }

    /// Get EMA period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor `2 / (period + 1)`
    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "EMA"
    }

    fn update(&mut self, value: f64) {
        self.last_value = Some(self.inner.next(value));
        self.update_count += 1;
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.period
    }
}

/// EMA of every point in `values`, seeded with the first value.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut ema = Ema::new(period)?;
    Ok(values
        .iter()
        .map(|&v| {
            ema.update(v);
            ema.value().unwrap_or(v)
        })
        .collect())
}

/// Last EMA value of `values`, `None` for an empty slice.
pub fn last_ema(values: &[f64], period: usize) -> Result<Option<f64>> {
    Ok(ema(values, period)?.last().copied())
}
