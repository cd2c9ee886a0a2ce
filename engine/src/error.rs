//! Domain errors

use thiserror::Error;

/// Errors raised by the engine itself.
///
/// Library entry points return [`crate::Result`] (anyhow); callers that need to
/// branch on the failure kind can `downcast_ref::<EngineError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid indicator period {period} for {indicator}")]
    InvalidPeriod { indicator: &'static str, period: usize },

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedConfigVersion { found: u32, expected: u32 },

    #[error("CSV row {row}: {reason}")]
    CsvRow { row: usize, reason: String },

    #[error("not enough candles: need {needed}, have {available}")]
    NotEnoughCandles { needed: usize, available: usize },

    #[error("no parameter combination met the minimum of {min_trades} trades in every window")]
    NoViableCombination { min_trades: usize },
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
