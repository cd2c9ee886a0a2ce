//! Precomputed indicator columns for one candle slice

use crate::config::IndicatorConfig;
use crate::data::Candle;
use crate::indicators::{atr, ema, rsi};
use crate::Result;
use serde::Serialize;

/// Indicator values at one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub index: usize,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub atr: f64,
}

impl IndicatorSnapshot {
    /// ATR relative to the close, 0 for a non-positive close
    pub fn volatility(&self) -> f64 {
        if self.close > 0.0 {
            self.atr / self.close
        } else {
            0.0
        }
    }
}

/// Fast/slow EMA, RSI and ATR computed once per candle slice
///
/// Indices are positions in the slice the frame was computed on. Snapshots
/// before the warm-up index are not available.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    closes: Vec<f64>,
    ema_fast: Vec<f64>,
    ema_slow: Vec<f64>,
    rsi: Vec<f64>,
    atr: Vec<f64>,
    warmup: usize,
}

impl IndicatorFrame {
    /// Compute all columns for `candles`
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Result<Self> {
        config.validate()?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        Ok(Self {
            ema_fast: ema(&closes, config.ema_fast)?,
            ema_slow: ema(&closes, config.ema_slow)?,
            rsi: rsi(&closes, config.rsi_period)?,
            atr: atr(candles, config.atr_period)?,
            warmup: config.warmup(),
            closes,
        })
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// First index with a snapshot
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Indicator values at `index`, `None` during warm-up or out of range
    pub fn snapshot(&self, index: usize) -> Option<IndicatorSnapshot> {
        if index < self.warmup || index >= self.len() {
            return None;
        }
        Some(IndicatorSnapshot {
            index,
            close: self.closes[index],
            ema_fast: self.ema_fast[index],
            ema_slow: self.ema_slow[index],
            rsi: self.rsi[index],
            atr: self.atr[index],
        })
    }

    /// Snapshot of the last bar
    pub fn last_snapshot(&self) -> Option<IndicatorSnapshot> {
        self.len().checked_sub(1).and_then(|i| self.snapshot(i))
    }

    pub fn ema_fast(&self) -> &[f64] {
        &self.ema_fast
    }

    pub fn ema_slow(&self) -> &[f64] {
        &self.ema_slow
    }

    pub fn rsi(&self) -> &[f64] {
        &self.rsi
    }

    pub fn atr(&self) -> &[f64] {
        &self.atr
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn flat(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let ts = Utc.timestamp_opt(i as i64 * 900, 0).single().unwrap();
                Candle::new(100.0, 100.0, 100.0, 100.0, 1.0, ts)
            })
            .collect()
    }

    #[test]
    fn test_snapshot_respects_warmup() {
        let frame = IndicatorFrame::compute(&flat(100), &IndicatorConfig::default()).unwrap();
        assert_eq!(frame.warmup(), 60);
        assert!(frame.snapshot(59).is_none());
        assert!(frame.snapshot(100).is_none());

        let snap = frame.snapshot(60).unwrap();
        assert_eq!(snap.rsi, 50.0);
        assert_eq!(snap.atr, 0.0);
        assert!((snap.ema_fast - 100.0).abs() < 1e-9);
        assert_eq!(frame.last_snapshot().unwrap().index, 99);
    }

    #[test]
    fn test_short_input_has_no_snapshot() {
        let frame = IndicatorFrame::compute(&flat(10), &IndicatorConfig::default()).unwrap();
        assert_eq!(frame.len(), 10);
        assert!(frame.last_snapshot().is_none());

        let empty = IndicatorFrame::compute(&[], &IndicatorConfig::default()).unwrap();
        assert!(empty.is_empty());
        assert!(empty.last_snapshot().is_none());
    }
}
