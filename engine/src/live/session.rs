//! Trading session state
//!
//! Everything the live trader remembers between ticks lives in one
//! [`Session`] value owned by the trader.

use crate::config::{LiveConfig, ModeProfile, TradingMode};
use crate::portfolio::PositionSide;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Wins needed before win-rate milestones are announced
pub const MILESTONE_MIN_WINS: u32 = 20;
/// Win-rate gain (percentage points) between two announcements
pub const MILESTONE_STEP: f64 = 5.0;

/// `secs` as a duration, saturating instead of panicking out of range
fn seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(if secs < 0 { Duration::MIN } else { Duration::MAX })
}

/// Why a live position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    TimeExit,
    ScoreDrop,
    Manual,
    Panic,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP",
            ExitReason::TrailingStop => "TRAIL",
            ExitReason::TakeProfit => "TAKE PROFIT",
            ExitReason::TimeExit => "TIME EXIT",
            ExitReason::ScoreDrop => "SCORE DROP",
            ExitReason::Manual => "MANUAL",
            ExitReason::Panic => "PANIC",
        };
        f.write_str(s)
    }
}

/// Open position of the live trader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivePosition {
    pub side: PositionSide,
    pub entry_price: f64,
    pub stop: f64,
    pub take_profit: f64,
    pub trail: Option<f64>,
    pub entry_time: DateTime<Utc>,
    pub qty: f64,
    pub score: f64,
    pub reason: String,
}

impl LivePosition {
    /// Stop in force: the tighter of the initial stop and the trail
    pub fn effective_stop(&self) -> f64 {
        match (self.trail, self.side) {
            (Some(trail), PositionSide::Long) => self.stop.max(trail),
            (Some(trail), PositionSide::Short) => self.stop.min(trail),
            (None, _) => self.stop,
        }
    }

    /// The trail is tighter than the initial stop
    pub fn is_trailing(&self) -> bool {
        self.trail
            .map_or(false, |trail| self.side.is_tighter(trail, self.stop))
    }

    /// Move the trail to `candidate` if that tightens it
    pub fn update_trail(&mut self, candidate: f64) -> bool {
        let tighter = match self.trail {
            Some(current) => self.side.is_tighter(candidate, current),
            None => true,
        };
        if tighter && candidate.is_finite() {
            self.trail = Some(candidate);
            return true;
        }
        false
    }

    pub fn stop_hit(&self, price: f64) -> bool {
        match self.side {
            PositionSide::Long => price <= self.effective_stop(),
            PositionSide::Short => price >= self.effective_stop(),
        }
    }

    pub fn target_hit(&self, price: f64) -> bool {
        match self.side {
            PositionSide::Long => price >= self.take_profit,
            PositionSide::Short => price <= self.take_profit,
        }
    }

    /// Realized PnL in quote currency when closed at `price`
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign() * self.qty
    }

    pub fn held_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.entry_time
    }
}

/// A closed live position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub side: PositionSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub qty: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}

/// Mutable state of one trading session
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: TradingMode,
    pub trading_enabled: bool,
    pub dry_run: bool,
    pub position: Option<LivePosition>,
    pub wins: u32,
    pub losses: u32,
    pub consec_losses: u32,
    pub day_profit: f64,
    pub entries_today: u32,
    pub last_price: Option<f64>,
    pub last_event: String,
    day_key: Option<NaiveDate>,
    cooldown_until: Option<DateTime<Utc>>,
    leverage_set: Option<u32>,
    last_notified_win_rate: f64,
    last_alert: Option<DateTime<Utc>>,
    last_error: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(mode: TradingMode, dry_run: bool) -> Self {
        Self {
            mode,
            trading_enabled: true,
            dry_run,
            position: None,
            wins: 0,
            losses: 0,
            consec_losses: 0,
            day_profit: 0.0,
            entries_today: 0,
            last_price: None,
            last_event: String::new(),
            day_key: None,
            cooldown_until: None,
            leverage_set: None,
            last_notified_win_rate: 0.0,
            last_alert: None,
            last_error: None,
        }
    }

    pub fn from_config(config: &LiveConfig) -> Self {
        Self::new(config.mode, config.dry_run)
    }

    /// Reset the daily counters on a new UTC day; true when it rolled
    pub fn roll_day(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if self.day_key == Some(today) {
            return false;
        }
        self.day_key = Some(today);
        self.entries_today = 0;
        self.day_profit = 0.0;
        self.wins = 0;
        self.losses = 0;
        true
    }

    /// Win rate in percent, 0 without closed trades
    pub fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            return 0.0;
        }
        self.wins as f64 / total as f64 * 100.0
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map_or(false, |until| now < until)
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    pub fn start_cooldown(&mut self, now: DateTime<Utc>, secs: i64) {
        let until = now
            .checked_add_signed(seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.cooldown_until = Some(until);
    }

    /// Leverage must be (re)applied before the next entry
    pub fn needs_leverage(&self, leverage: u32) -> bool {
        self.leverage_set != Some(leverage)
    }

    pub fn mark_leverage(&mut self, leverage: u32) {
        self.leverage_set = Some(leverage);
    }

    /// Record a new position
    pub fn open(&mut self, position: LivePosition, cooldown_secs: i64) {
        self.start_cooldown(position.entry_time, cooldown_secs);
        self.entries_today += 1;
        self.last_event = format!("ENTER {}", position.side);
        self.position = Some(position);
    }

    /// Close the open position at `price` and update the statistics
    pub fn close(
        &mut self,
        price: f64,
        reason: ExitReason,
        now: DateTime<Utc>,
        cooldown_secs: i64,
    ) -> Option<ClosedTrade> {
        let position = self.position.take()?;
        let pnl = position.pnl_at(price);
        self.day_profit += pnl;
        if pnl >= 0.0 {
            self.wins += 1;
            self.consec_losses = 0;
        } else {
            self.losses += 1;
            self.consec_losses += 1;
        }
        self.start_cooldown(now, cooldown_secs);
        self.last_event = format!("EXIT {} ({})", position.side, reason);
        Some(ClosedTrade {
            side: position.side,
            entry_price: position.entry_price,
            exit_price: price,
            qty: position.qty,
            pnl,
            reason,
        })
    }

    fn throttle(last: &mut Option<DateTime<Utc>>, now: DateTime<Utc>, secs: i64) -> bool {
        let open = last.map_or(true, |at| now - at >= seconds(secs));
        if open {
            *last = Some(now);
        }
        open
    }

    /// Whether a throttled alert may go out now; records it if so
    pub fn allow_alert(&mut self, now: DateTime<Utc>, secs: i64) -> bool {
        Self::throttle(&mut self.last_alert, now, secs)
    }

    /// Whether an error notification may go out now; records it if so
    pub fn allow_error(&mut self, now: DateTime<Utc>, secs: i64) -> bool {
        Self::throttle(&mut self.last_error, now, secs)
    }

    /// New win-rate high worth announcing
    ///
    /// Fires once at least [`MILESTONE_MIN_WINS`] wins are in and the rate is
    /// [`MILESTONE_STEP`] points above the last announced value.
    pub fn win_rate_milestone(&mut self) -> Option<f64> {
        let rate = self.win_rate();
        if self.wins >= MILESTONE_MIN_WINS && rate >= self.last_notified_win_rate + MILESTONE_STEP {
            self.last_notified_win_rate = rate;
            return Some(rate);
        }
        None
    }

    pub fn status_text(&self, profile: &ModeProfile) -> String {
        let mut lines = vec![
            format!(
                "dry_run={} | on={} | mode={}",
                self.dry_run, self.trading_enabled, self.mode
            ),
            format!(
                "lev={} | order_usdt={} | enter_score>={}",
                profile.leverage, profile.order_usdt, profile.enter_score
            ),
        ];
        if let Some(price) = self.last_price {
            lines.push(format!("price={:.2}", price));
        }
        match &self.position {
            Some(p) => {
                lines.push(format!("pos={} entry={:.2} qty={}", p.side, p.entry_price, p.qty));
                let trail = p.trail.map_or_else(|| "-".to_string(), |t| format!("{:.2}", t));
                lines.push(format!("stop={:.2} | tp={:.2} | trail={}", p.stop, p.take_profit, trail));
            }
            None => lines.push("pos=None".to_string()),
        }
        lines.push(format!(
            "day_profit={:.2} | winrate={:.1}% (W{}/L{})",
            self.day_profit,
            self.win_rate(),
            self.wins,
            self.losses
        ));
        if !self.last_event.is_empty() {
            lines.push(format!("last={}", self.last_event));
        }
        lines.join("\n")
    }
}
