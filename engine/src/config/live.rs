//! Live trading loop configuration

use crate::config::{ModeProfile, SideFilter, TradingMode};
use crate::error::EngineError;
use crate::live::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Longest accepted exit timer or cooldown, in seconds (one year)
pub const MAX_LIVE_DURATION_SECS: i64 = 365 * 24 * 60 * 60;

/// Settings of the live/paper trading loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Contract symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Kline interval in minutes as the exchange expects it (e.g., "15")
    pub interval: String,
    /// Klines requested per tick
    pub kline_limit: usize,
    /// Fewer klines than this and no signal is computed
    pub min_klines: usize,
    /// Seconds between ticks
    pub loop_seconds: u64,
    /// Skip leverage and order calls, track positions locally
    pub dry_run: bool,
    /// Mode at start-up
    pub mode: TradingMode,
    /// Sides the trader scans
    pub side: SideFilter,
    /// Trailing stop on/off
    pub trailing: bool,
    /// Trailing distance as an ATR multiple
    pub trail_atr_mult: f64,
    /// Close after this many minutes in a position
    pub time_exit_minutes: i64,
    /// Seconds without new entries after an entry or exit
    pub cooldown_secs: i64,
    pub max_entries_per_day: u32,
    /// Close when the score of the held side falls to this value
    pub exit_score_drop: f64,
    /// Trading is switched off after this many losses in a row
    pub max_consec_losses: u32,
    /// Minimum seconds between throttled notifications
    pub alert_cooldown_secs: i64,
    /// Minimum seconds between error notifications
    pub error_cooldown_secs: i64,
    pub safe: ModeProfile,
    pub aggro: ModeProfile,
    pub retry: RetryPolicy,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "15".to_string(),
            kline_limit: 240,
            min_klines: 120,
            loop_seconds: 20,
            dry_run: true,
            mode: TradingMode::Safe,
            side: SideFilter::Both,
            trailing: true,
            trail_atr_mult: 1.0,
            time_exit_minutes: 360,
            cooldown_secs: 1200,
            max_entries_per_day: 6,
            exit_score_drop: 35.0,
            max_consec_losses: 3,
            alert_cooldown_secs: 60,
            error_cooldown_secs: 120,
            safe: ModeProfile::safe(),
            aggro: ModeProfile::aggro(),
            retry: RetryPolicy::default(),
        }
    }
}

impl LiveConfig {
    /// Profile of a mode
    pub fn profile(&self, mode: TradingMode) -> &ModeProfile {
        match mode {
            TradingMode::Safe => &self.safe,
            TradingMode::Aggro => &self.aggro,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::invalid("symbol", "must not be empty"));
        }
        if self.kline_limit < self.min_klines {
            return Err(EngineError::invalid(
                "kline_limit",
                format!("{} is below min_klines {}", self.kline_limit, self.min_klines),
            ));
        }
        if self.loop_seconds == 0 {
            return Err(EngineError::invalid("loop_seconds", "must be positive"));
        }
        if self.trailing && !(self.trail_atr_mult > 0.0) {
            return Err(EngineError::invalid("trail_atr_mult", "must be positive"));
        }
        if self.time_exit_minutes <= 0 || self.time_exit_minutes > MAX_LIVE_DURATION_SECS / 60 {
            return Err(EngineError::invalid(
                "time_exit_minutes",
                format!("must be inside [1, {}]", MAX_LIVE_DURATION_SECS / 60),
            ));
        }
        for (field, secs) in [
            ("cooldown_secs", self.cooldown_secs),
            ("alert_cooldown_secs", self.alert_cooldown_secs),
            ("error_cooldown_secs", self.error_cooldown_secs),
        ] {
            if !(0..=MAX_LIVE_DURATION_SECS).contains(&secs) {
                return Err(EngineError::invalid(
                    field,
                    format!("must be inside [0, {}]", MAX_LIVE_DURATION_SECS),
                ));
            }
        }
        self.safe.validate()?;
        self.aggro.validate()?;
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LiveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_durations_are_bounded() {
        let year_minutes = MAX_LIVE_DURATION_SECS / 60;
        let ok = LiveConfig {
            time_exit_minutes: year_minutes,
            cooldown_secs: MAX_LIVE_DURATION_SECS,
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let cases = [
            LiveConfig {
                time_exit_minutes: i64::MAX,
                ..Default::default()
            },
            LiveConfig {
                time_exit_minutes: year_minutes + 1,
                ..Default::default()
            },
            LiveConfig {
                cooldown_secs: i64::MAX,
                ..Default::default()
            },
            LiveConfig {
                alert_cooldown_secs: MAX_LIVE_DURATION_SECS + 1,
                ..Default::default()
            },
            LiveConfig {
                error_cooldown_secs: -1,
                ..Default::default()
            },
        ];
        for cfg in cases {
            assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig { .. })));
        }
    }
}
