//! Exchange capability

use crate::data::Candle;
use crate::portfolio::PositionSide;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of an exchange call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("exchange returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("order rejected: {0}")]
    Rejected(String),
}

impl ExchangeError {
    /// Transport-level failures are worth another attempt; answers from the
    /// exchange itself are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Http(_) | ExchangeError::Timeout | ExchangeError::RateLimited | ExchangeError::Malformed(_)
        )
    }

    /// Safe to resend an order after this error
    ///
    /// A timed out or garbled order response may still have been filled.
    pub fn is_order_retryable(&self) -> bool {
        matches!(self, ExchangeError::RateLimited)
    }
}

/// Market order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that opens `position`
    pub fn opening(position: PositionSide) -> Self {
        match position {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Side that closes `position`
    pub fn closing(position: PositionSide) -> Self {
        Self::opening(position.opposite())
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("Buy"),
            OrderSide::Sell => f.write_str("Sell"),
        }
    }
}

/// Market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: f64,
    pub reduce_only: bool,
}

impl OrderRequest {
    pub fn open(symbol: impl Into<String>, position: PositionSide, qty: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::opening(position),
            qty,
            reduce_only: false,
        }
    }

    pub fn close(symbol: impl Into<String>, position: PositionSide, qty: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::closing(position),
            qty,
            reduce_only: true,
        }
    }
}

/// Exchange acknowledgement of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
}

/// Market data and order entry for one futures venue
///
/// Klines are returned in ascending time order.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError>;

    async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>, ExchangeError>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError>;
}
