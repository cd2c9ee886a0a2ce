//! OHLCV candle data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// OHLCV candle data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
    /// Candle open time
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    /// Create a new candle
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }

    /// Get total range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }
}

// Lets `ta` indicators (TrueRange, ...) consume candles directly.
impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Collection of candles, ascending by timestamp
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Create new empty series
    pub fn new() -> Self {
        Self {
            candles: Vec::new(),
        }
    }

    /// Create from vector of candles
    pub fn from_vec(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Add a candle
    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    /// Get number of candles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get candle at index
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Get last candle
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Get all candles
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Sub-slice of the series; out-of-range bounds are clamped.
    pub fn slice(&self, range: Range<usize>) -> &[Candle] {
        let end = range.end.min(self.candles.len());
        let start = range.start.min(end);
        &self.candles[start..end]
    }

    /// Get close prices as vector
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Sort by timestamp (oldest first)
    pub fn sort_by_time(&mut self) {
        self.candles.sort_by_key(|c| c.timestamp);
    }

    /// Drop candles whose timestamp repeats; keeps the first occurrence.
    /// Expects the series to be sorted.
    pub fn dedup_by_time(&mut self) {
        self.candles.dedup_by_key(|c| c.timestamp);
    }

    /// Whether timestamps are strictly increasing
    pub fn is_ascending(&self) -> bool {
        self.candles
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::from_vec(candles)
    }
}

impl AsRef<[Candle]> for CandleSeries {
    fn as_ref(&self) -> &[Candle] {
        &self.candles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let candle = Candle::new(100.0, 104.0, 99.0, 103.0, 1.0, at(0));
        assert_eq!(candle.true_range(None), 5.0);
        // gap down from 110: |99 - 110| dominates
        assert_eq!(candle.true_range(Some(110.0)), 11.0);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut series = CandleSeries::from_vec(vec![
            Candle::new(1.0, 1.0, 1.0, 1.0, 0.0, at(60)),
            Candle::new(2.0, 2.0, 2.0, 2.0, 0.0, at(0)),
            Candle::new(3.0, 3.0, 3.0, 3.0, 0.0, at(60)),
        ]);
        series.sort_by_time();
        series.dedup_by_time();
        assert_eq!(series.len(), 2);
        assert!(series.is_ascending());
        assert_eq!(series.closes(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_slice_clamps() {
        let series = CandleSeries::from_vec(vec![
            Candle::new(1.0, 1.0, 1.0, 1.0, 0.0, at(0)),
            Candle::new(2.0, 2.0, 2.0, 2.0, 0.0, at(60)),
        ]);
        assert_eq!(series.slice(1..10).len(), 1);
        assert!(series.slice(5..10).is_empty());
    }
}
