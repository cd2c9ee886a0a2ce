//! Retry with exponential back-off

use crate::data::Candle;
use crate::error::EngineError;
use crate::live::{Exchange, ExchangeError, OrderAck, OrderRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently a failing call is repeated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay_ms: u64,
    /// Growth factor per further failure
    pub multiplier: f64,
    /// Upper bound of a single delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `max_attempts` attempts without sleeping in between
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Sleep after the `failures`-th failed attempt (1-based)
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let millis = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.max_attempts == 0 {
            return Err(EngineError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.multiplier >= 1.0) {
            return Err(EngineError::invalid("retry.multiplier", "must be >= 1"));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(EngineError::invalid("retry.max_delay_ms", "must be >= base_delay_ms"));
        }
        Ok(())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error or runs out
/// of attempts. The last error is returned.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut failures = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if failures >= policy.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(failures);
                warn!(
                    error = %err,
                    attempt = failures,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "call failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exchange decorator that retries transient failures
///
/// Orders are only resent when the exchange refused them outright.
#[derive(Debug, Clone)]
pub struct RetryingExchange<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Exchange> RetryingExchange<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

#[async_trait]
impl<E: Exchange> Exchange for RetryingExchange<E> {
    async fn get_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        retry(&self.policy, ExchangeError::is_retryable, || self.inner.get_price(symbol)).await
    }

    async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>, ExchangeError> {
        retry(&self.policy, ExchangeError::is_retryable, || {
            self.inner.get_klines(symbol, interval, limit)
        })
        .await
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        retry(&self.policy, ExchangeError::is_order_retryable, || self.inner.place_order(order)).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError> {
        retry(&self.policy, ExchangeError::is_retryable, || {
            self.inner.set_leverage(symbol, leverage)
        })
        .await
    }
}
