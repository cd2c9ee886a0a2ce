//! Exchange backed by recorded klines
//!
//! The cursor marks the bar that is "now": prices are that bar's close and
//! klines end at it. Orders are filled instantly and only recorded.

use async_trait::async_trait;
use quant_engine::data::Candle;
use quant_engine::live::{Exchange, ExchangeError, OrderAck, OrderRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

pub struct ReplayExchange {
    candles: Vec<Candle>,
    cursor: AtomicUsize,
    orders: Mutex<Vec<OrderRequest>>,
    leverage: Mutex<Option<u32>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ReplayExchange {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            cursor: AtomicUsize::new(0),
            orders: Mutex::new(Vec::new()),
            leverage: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Move the cursor to `index`, clamped to the last bar
    pub fn seek(&self, index: usize) {
        let last = self.candles.len().saturating_sub(1);
        self.cursor.store(index.min(last), Ordering::SeqCst);
    }

    /// Bar under the cursor
    pub fn current(&self) -> Option<&Candle> {
        self.candles.get(self.cursor())
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        locked(&self.orders).clone()
    }

    pub fn leverage(&self) -> Option<u32> {
        *locked(&self.leverage)
    }
}

#[async_trait]
impl Exchange for ReplayExchange {
    async fn get_price(&self, _symbol: &str) -> Result<f64, ExchangeError> {
        self.current()
            .map(|c| c.close)
            .ok_or_else(|| ExchangeError::Malformed("no recorded klines".to_string()))
    }

    async fn get_klines(&self, _symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Candle>, ExchangeError> {
        if self.candles.is_empty() {
            return Ok(Vec::new());
        }
        let end = self.cursor() + 1;
        let start = end.saturating_sub(limit);
        Ok(self.candles[start..end].to_vec())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        let mut orders = locked(&self.orders);
        orders.push(order.clone());
        let order_id = format!("replay-{}", orders.len());
        debug!(%order_id, side = %order.side, qty = order.qty, reduce_only = order.reduce_only, "replay order filled");
        Ok(OrderAck { order_id })
    }

    async fn set_leverage(&self, _symbol: &str, leverage: u32) -> Result<(), ExchangeError> {
        *locked(&self.leverage) = Some(leverage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use quant_engine::portfolio::PositionSide;

    fn exchange(n: usize) -> ReplayExchange {
        let t0 = Utc.timestamp_opt(0, 0).single().unwrap();
        let candles = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle::new(close, close + 1.0, close - 1.0, close, 1.0, t0 + Duration::minutes(i as i64))
            })
            .collect();
        ReplayExchange::new(candles)
    }

    #[tokio::test]
    async fn test_klines_end_at_cursor() {
        let ex = exchange(10);
        ex.seek(4);
        assert_eq!(ex.get_price("BTCUSDT").await.unwrap(), 104.0);

        let klines = ex.get_klines("BTCUSDT", "15", 3).await.unwrap();
        let closes: Vec<f64> = klines.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![102.0, 103.0, 104.0]);

        let all = ex.get_klines("BTCUSDT", "15", 100).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_seek_clamps_to_last_bar() {
        let ex = exchange(3);
        ex.seek(50);
        assert_eq!(ex.cursor(), 2);
        assert_eq!(ex.get_price("X").await.unwrap(), 102.0);
    }

    #[tokio::test]
    async fn test_orders_are_recorded() {
        let ex = exchange(3);
        ex.set_leverage("BTCUSDT", 5).await.unwrap();
        let ack = ex
            .place_order(&OrderRequest::open("BTCUSDT", PositionSide::Short, 0.5))
            .await
            .unwrap();
        assert_eq!(ack.order_id, "replay-1");
        assert_eq!(ex.orders().len(), 1);
        assert_eq!(ex.leverage(), Some(5));
    }

    #[tokio::test]
    async fn test_empty_history() {
        let ex = exchange(0);
        assert!(ex.get_price("X").await.is_err());
        assert!(ex.get_klines("X", "15", 10).await.unwrap().is_empty());
    }
}
