//! Live trading loop
//!
//! One [`Trader::tick`] fetches the last price and recent klines, then
//! either looks for an entry (when flat) or manages the open position.
//! Exchange failures end the tick with a throttled notification; they never
//! abort the loop.

use crate::config::{BotConfig, IndicatorConfig, LiveConfig, ModeProfile, ScoreWeights};
use crate::data::Candle;
use crate::indicators::IndicatorFrame;
use crate::live::{
    ClosedTrade, Command, CommandSource, Exchange, ExchangeError, ExitReason, LivePosition, Notifier, OrderRequest,
    RetryingExchange, Session,
};
use crate::portfolio::{qty_from_order_usdt, PositionSide};
use crate::strategy::{build_reason, score, ScoreStrategy, Signal};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What a tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    /// Trading is switched off
    Disabled,
    /// The consecutive-loss limit switched trading off
    Halted { consec_losses: u32 },
    /// Price or klines could not be fetched
    DataUnavailable,
    CoolingDown,
    DailyLimit,
    /// Flat, no acceptable signal
    Waiting { side: PositionSide, score: f64 },
    Entered { side: PositionSide, price: f64, qty: f64, score: f64 },
    Holding { side: PositionSide, score: Option<f64>, stop: f64 },
    Exited(ClosedTrade),
    /// An order or leverage call failed; state is unchanged
    OrderFailed,
}

/// Score-driven futures trader over injected exchange and notifier
pub struct Trader<E, N> {
    config: LiveConfig,
    indicators: IndicatorConfig,
    weights: ScoreWeights,
    exchange: RetryingExchange<E>,
    notifier: N,
    session: Session,
}

impl<E: Exchange, N: Notifier> Trader<E, N> {
    pub fn new(
        config: LiveConfig,
        indicators: IndicatorConfig,
        weights: ScoreWeights,
        exchange: E,
        notifier: N,
    ) -> Result<Self> {
        config.validate()?;
        indicators.validate()?;
        weights.validate()?;
        let session = Session::from_config(&config);
        let exchange = RetryingExchange::new(exchange, config.retry.clone());
        Ok(Self {
            config,
            indicators,
            weights,
            exchange,
            notifier,
            session,
        })
    }

    /// Trader with the live, indicator and weight sections of a bot config
    pub fn from_config(config: &BotConfig, exchange: E, notifier: N) -> Result<Self> {
        Self::new(
            config.live.clone(),
            config.indicators.clone(),
            config.weights.clone(),
            exchange,
            notifier,
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// The wrapped exchange
    pub fn exchange(&self) -> &E {
        self.exchange.inner()
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Profile of the current mode
    pub fn profile(&self) -> &ModeProfile {
        self.config.profile(self.session.mode)
    }

    /// Run ticks every `loop_seconds` and handle commands as they arrive
    ///
    /// Stops after `max_ticks` ticks when given, otherwise runs forever.
    pub async fn run<C: CommandSource>(&mut self, commands: &mut C, max_ticks: Option<u64>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.config.loop_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;
        let mut ticks = 0u64;
        info!(symbol = %self.config.symbol, mode = %self.session.mode, dry_run = self.session.dry_run, "trader started");

        loop {
            tokio::select! {
                biased;
                command = commands.receive_command(), if commands_open => match command {
                    Some(command) => {
                        self.handle_command(command, Utc::now()).await;
                    }
                    None => {
                        debug!("command source closed");
                        commands_open = false;
                    }
                },
                _ = interval.tick() => {
                    let event = self.tick(Utc::now()).await;
                    debug!(?event, "tick");
                    ticks += 1;
                    if max_ticks.map_or(false, |max| ticks >= max) {
                        break;
                    }
                }
            }
        }
    }

    /// One pass of the trading loop at `now`
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickEvent {
        if self.session.roll_day(now) {
            debug!(day = %now.date_naive(), "new trading day");
        }

        if !self.session.trading_enabled {
            self.session.last_event = "trading off".to_string();
            return TickEvent::Disabled;
        }

        if self.session.consec_losses >= self.config.max_consec_losses {
            self.session.trading_enabled = false;
            let consec_losses = self.session.consec_losses;
            warn!(consec_losses, "consecutive loss limit reached");
            if self.session.allow_alert(now, self.config.alert_cooldown_secs) {
                self.notify(&format!(
                    "consecutive loss limit reached ({}), trading stopped",
                    consec_losses
                ))
                .await;
            }
            return TickEvent::Halted { consec_losses };
        }

        let price = match self.exchange.get_price(&self.config.symbol).await {
            Ok(price) => price,
            Err(err) => {
                self.report_error(now, format!("price failed: {}", err)).await;
                return TickEvent::DataUnavailable;
            }
        };
        self.session.last_price = Some(price);

        let frame = match self.fetch_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                self.report_error(now, format!("klines failed: {}", err)).await;
                if self.session.position.is_none() {
                    return TickEvent::DataUnavailable;
                }
                None
            }
        };

        if self.session.position.is_none() {
            self.try_enter(now, price, frame.as_ref()).await
        } else {
            self.manage(now, price, frame.as_ref()).await
        }
    }

    /// Apply an operator command; the reply is sent and returned
    pub async fn handle_command(&mut self, command: Command, now: DateTime<Utc>) -> String {
        info!(%command, "command received");
        let reply = match command {
            Command::Start => {
                self.session.trading_enabled = true;
                self.session.consec_losses = 0;
                "trading ON".to_string()
            }
            Command::Stop => {
                self.session.trading_enabled = false;
                "trading OFF".to_string()
            }
            Command::Mode(mode) => {
                self.session.mode = mode;
                let profile = self.profile();
                format!(
                    "{} mode (lev={} order_usdt={} enter_score>={})",
                    mode, profile.leverage, profile.order_usdt, profile.enter_score
                )
            }
            Command::Status => self.session.status_text(self.profile()),
            Command::Buy => self.manual_enter(PositionSide::Long, now).await,
            Command::Short => self.manual_enter(PositionSide::Short, now).await,
            Command::Sell => self.manual_exit(ExitReason::Manual, now).await,
            Command::Panic => {
                let closed = if self.session.position.is_some() {
                    self.manual_exit(ExitReason::Panic, now).await
                } else {
                    "no open position".to_string()
                };
                self.session.trading_enabled = false;
                format!("PANIC: {}\ntrading OFF", closed)
            }
            Command::Help => help_text().to_string(),
        };
        self.notify(&reply).await;
        reply
    }

    async fn try_enter(&mut self, now: DateTime<Utc>, price: f64, frame: Option<&IndicatorFrame>) -> TickEvent {
        if self.session.in_cooldown(now) {
            self.session.last_event = "waiting: cooldown".to_string();
            return TickEvent::CoolingDown;
        }
        if self.session.entries_today >= self.config.max_entries_per_day {
            self.session.last_event = "waiting: daily entry limit".to_string();
            return TickEvent::DailyLimit;
        }

        let profile = self.profile().clone();
        if let Err(err) = self.ensure_leverage(profile.leverage).await {
            self.report_error(now, format!("leverage failed: {}", err)).await;
            return TickEvent::OrderFailed;
        }

        let signal = match frame {
            Some(frame) => self.best_signal(frame, price, &profile),
            None => Signal::no_data("not enough klines"),
        };
        if !signal.ok {
            self.session.last_event = format!("waiting: score={:.0} ({})", signal.score, signal.reason);
            return TickEvent::Waiting {
                side: signal.side,
                score: signal.score,
            };
        }

        let qty = qty_from_order_usdt(profile.order_usdt, profile.leverage, price);
        if qty <= 0.0 {
            self.session.last_event = "waiting: qty<=0".to_string();
            return TickEvent::Waiting {
                side: signal.side,
                score: signal.score,
            };
        }

        let position = LivePosition {
            side: signal.side,
            entry_price: price,
            stop: signal.stop,
            take_profit: signal.take_profit,
            trail: None,
            entry_time: now,
            qty,
            score: signal.score,
            reason: signal.reason,
        };
        match self.open_position(position).await {
            Ok(message) => {
                self.notify(&message).await;
                TickEvent::Entered {
                    side: signal.side,
                    price,
                    qty,
                    score: signal.score,
                }
            }
            Err(err) => {
                self.report_error(now, format!("entry order failed: {}", err)).await;
                TickEvent::OrderFailed
            }
        }
    }

    async fn manage(&mut self, now: DateTime<Utc>, price: f64, frame: Option<&IndicatorFrame>) -> TickEvent {
        let snapshot = frame.and_then(IndicatorFrame::last_snapshot);
        let trailing = self.config.trailing;
        let trail_mult = self.config.trail_atr_mult;
        let time_limit = Duration::try_minutes(self.config.time_exit_minutes).unwrap_or(Duration::MAX);
        let exit_score_drop = self.config.exit_score_drop;

        let Some(position) = self.session.position.as_mut() else {
            return TickEvent::Disabled;
        };
        let side = position.side;
        let held_score = snapshot.as_ref().map(|s| score(s, price, side, &self.weights));

        if trailing {
            if let Some(snapshot) = snapshot.as_ref().filter(|s| s.atr > 0.0) {
                let candidate = price - side.sign() * snapshot.atr * trail_mult;
                if position.update_trail(candidate) {
                    debug!(trail = candidate, "trailing stop moved");
                }
            }
        }

        let reason = if position.held_for(now) > time_limit {
            Some(ExitReason::TimeExit)
        } else if held_score.map_or(false, |s| s <= exit_score_drop) {
            Some(ExitReason::ScoreDrop)
        } else if position.stop_hit(price) {
            Some(if position.is_trailing() {
                ExitReason::TrailingStop
            } else {
                ExitReason::StopLoss
            })
        } else if position.target_hit(price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        };

        match reason {
            Some(reason) => self.exit(now, price, reason).await,
            None => {
                let stop = position.effective_stop();
                self.session.last_event = format!(
                    "HOLD {} score={} stop={:.2} tp={:.2}",
                    side,
                    held_score.map_or_else(|| "-".to_string(), |s| format!("{:.0}", s)),
                    stop,
                    position.take_profit
                );
                TickEvent::Holding {
                    side,
                    score: held_score,
                    stop,
                }
            }
        }
    }

    async fn exit(&mut self, now: DateTime<Utc>, price: f64, reason: ExitReason) -> TickEvent {
        match self.close_position(now, price, reason).await {
            Ok(Some(closed)) => {
                let message = exit_message(&closed, self.session.day_profit);
                self.notify(&message).await;
                self.announce_milestone().await;
                TickEvent::Exited(closed)
            }
            Ok(None) => TickEvent::Disabled,
            Err(err) => {
                self.report_error(now, format!("exit order failed: {}", err)).await;
                TickEvent::OrderFailed
            }
        }
    }

    async fn manual_enter(&mut self, side: PositionSide, now: DateTime<Utc>) -> String {
        self.session.roll_day(now);
        if self.session.position.is_some() {
            return "already in a position, see status".to_string();
        }

        let price = match self.exchange.get_price(&self.config.symbol).await {
            Ok(price) => price,
            Err(err) => return format!("manual entry failed: {}", err),
        };
        self.session.last_price = Some(price);
        let profile = self.profile().clone();
        if let Err(err) = self.ensure_leverage(profile.leverage).await {
            return format!("manual entry failed: {}", err);
        }

        let qty = qty_from_order_usdt(profile.order_usdt, profile.leverage, price);
        if qty <= 0.0 {
            return "manual entry failed: qty calculation".to_string();
        }

        let snapshot = match self.fetch_frame().await {
            Ok(frame) => frame.as_ref().and_then(IndicatorFrame::last_snapshot),
            Err(err) => return format!("manual entry failed: {}", err),
        };
        let Some(snapshot) = snapshot.filter(|s| s.atr > 0.0) else {
            return "manual entry failed: not enough market data for stop levels".to_string();
        };

        let (stop, take_profit) = exit_levels(side, price, snapshot.atr, &profile);
        let points = score(&snapshot, price, side, &self.weights);
        let position = LivePosition {
            side,
            entry_price: price,
            stop,
            take_profit,
            trail: None,
            entry_time: now,
            qty,
            score: points,
            reason: build_reason(side, price, &snapshot, points),
        };
        match self.open_position(position).await {
            Ok(message) => format!("manual {}", message),
            Err(err) => format!("manual entry failed: {}", err),
        }
    }

    async fn manual_exit(&mut self, reason: ExitReason, now: DateTime<Utc>) -> String {
        if self.session.position.is_none() {
            return "no open position".to_string();
        }
        let price = match self.exchange.get_price(&self.config.symbol).await {
            Ok(price) => price,
            Err(err) => return format!("exit failed: {}", err),
        };
        self.session.last_price = Some(price);
        match self.close_position(now, price, reason).await {
            Ok(Some(closed)) => {
                self.announce_milestone().await;
                exit_message(&closed, self.session.day_profit)
            }
            Ok(None) => "no open position".to_string(),
            Err(err) => format!("exit failed: {}", err),
        }
    }

    /// Best acceptable-or-not signal over the sides the config allows
    ///
    /// The short side replaces the long one only with a strictly higher score.
    fn best_signal(&self, frame: &IndicatorFrame, price: f64, profile: &ModeProfile) -> Signal {
        let strategy = ScoreStrategy::new(frame, profile.params(self.config.side), self.weights.clone());
        let index = frame.len().saturating_sub(1);
        let mut best: Option<Signal> = None;
        for side in [PositionSide::Long, PositionSide::Short] {
            if !self.config.side.allows(side) {
                continue;
            }
            let signal = strategy.evaluate_side(price, index, side);
            debug!(side = %side, score = signal.score, ok = signal.ok, "side scanned");
            if best.as_ref().map_or(true, |b| signal.score > b.score) {
                best = Some(signal);
            }
        }
        best.unwrap_or_else(|| Signal::no_data("no side allowed"))
    }

    async fn fetch_frame(&self) -> std::result::Result<Option<IndicatorFrame>, ExchangeError> {
        let klines = self
            .exchange
            .get_klines(&self.config.symbol, &self.config.interval, self.config.kline_limit)
            .await?;
        Ok(self.frame_from(&klines))
    }

    fn frame_from(&self, klines: &[Candle]) -> Option<IndicatorFrame> {
        if klines.len() < self.config.min_klines {
            debug!(klines = klines.len(), min = self.config.min_klines, "not enough klines");
            return None;
        }
        match IndicatorFrame::compute(klines, &self.indicators) {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!(error = %err, "indicator computation failed");
                None
            }
        }
    }

    async fn ensure_leverage(&mut self, leverage: u32) -> std::result::Result<(), ExchangeError> {
        if self.session.dry_run || !self.session.needs_leverage(leverage) {
            return Ok(());
        }
        self.exchange.set_leverage(&self.config.symbol, leverage).await?;
        self.session.mark_leverage(leverage);
        info!(leverage, "leverage set");
        Ok(())
    }

    /// Place the entry order (unless dry-run) and record the position
    async fn open_position(&mut self, position: LivePosition) -> std::result::Result<String, ExchangeError> {
        if !self.session.dry_run {
            let order = OrderRequest::open(self.config.symbol.as_str(), position.side, position.qty);
            let ack = self.exchange.place_order(&order).await?;
            debug!(order_id = %ack.order_id, "entry order placed");
        }
        let message = format!(
            "ENTER {} qty={} price={:.2}\n{}\nstop={:.2}, tp={:.2}",
            position.side, position.qty, position.entry_price, position.reason, position.stop, position.take_profit
        );
        info!(
            side = %position.side,
            price = position.entry_price,
            qty = position.qty,
            score = position.score,
            stop = position.stop,
            take_profit = position.take_profit,
            "position opened"
        );
        self.session.open(position, self.config.cooldown_secs);
        Ok(message)
    }

    /// Place the reduce-only exit order (unless dry-run) and close the position
    async fn close_position(
        &mut self,
        now: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
    ) -> std::result::Result<Option<ClosedTrade>, ExchangeError> {
        let Some(position) = self.session.position.as_ref() else {
            return Ok(None);
        };
        if !self.session.dry_run {
            let order = OrderRequest::close(self.config.symbol.as_str(), position.side, position.qty);
            let ack = self.exchange.place_order(&order).await?;
            debug!(order_id = %ack.order_id, "exit order placed");
        }
        let closed = self.session.close(price, reason, now, self.config.cooldown_secs);
        if let Some(closed) = &closed {
            info!(side = %closed.side, price, pnl = closed.pnl, reason = %reason, "position closed");
        }
        Ok(closed)
    }

    async fn announce_milestone(&mut self) {
        if let Some(rate) = self.session.win_rate_milestone() {
            self.notify(&format!("win rate up to {:.1}%", rate)).await;
        }
    }

    async fn report_error(&mut self, now: DateTime<Utc>, message: String) {
        warn!(error = %message, "trader error");
        self.session.last_event = message.clone();
        if self.session.allow_error(now, self.config.error_cooldown_secs) {
            self.notify(&message).await;
        }
    }

    async fn notify(&self, text: &str) {
        if let Err(err) = self.notifier.send_message(text).await {
            warn!(error = %err, "notification failed");
        }
    }
}

/// Stop and target `atr * stop_atr` and `tp_r` times that away from `price`
pub fn exit_levels(side: PositionSide, price: f64, atr: f64, profile: &ModeProfile) -> (f64, f64) {
    let stop_distance = atr * profile.stop_atr;
    let sign = side.sign();
    (price - sign * stop_distance, price + sign * stop_distance * profile.tp_r)
}

fn exit_message(closed: &ClosedTrade, day_profit: f64) -> String {
    format!(
        "EXIT {} ({}) price={:.2} pnl={:.4} day_profit={:.2}",
        closed.side, closed.reason, closed.exit_price, closed.pnl, day_profit
    )
}

fn help_text() -> &'static str {
    "commands:\n\
     start | stop\n\
     safe | aggro (= attack)\n\
     status\n\
     buy (manual long)\n\
     short (manual short)\n\
     sell (close)\n\
     panic (close + trading off)"
}
