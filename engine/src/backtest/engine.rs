//! Bar-by-bar backtest simulator

use crate::backtest::{BacktestResult, TradeOutcome, TradeRecord};
use crate::config::SimConfig;
use crate::data::Candle;
use crate::indicators::atr;
use crate::portfolio::Position;
use crate::strategy::{Signal, Strategy};
use crate::Result;
use tracing::{debug, warn};

/// Single-position backtest simulator
///
/// Per bar, while a position is open: stop (including the trailing stop),
/// partial take-profit, full take-profit, trailing update at the close and
/// time exit at the close, in that order. The stop wins when a bar touches
/// both the stop and a target. While flat the strategy is queried at the
/// close and an accepted signal fills at the next bar's open.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
}

/// Signal accepted at a close, waiting for the next open
struct PendingEntry {
    signal: Signal,
    signal_price: f64,
}

impl Simulator {
    /// Create new simulator
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run `strategy` over `candles`
    pub fn run<S: Strategy + ?Sized>(&self, candles: &[Candle], strategy: &S) -> BacktestResult {
        let cfg = &self.config;
        let n = candles.len();
        if n <= cfg.warmup_bars + 1 {
            debug!(candles = n, warmup = cfg.warmup_bars, "not enough candles, nothing simulated");
            return BacktestResult::empty(cfg.initial_balance);
        }

        let trail_atr = match cfg.trailing {
            Some(trailing) => match atr(candles, trailing.atr_period) {
                Ok(values) => Some(values),
                Err(err) => {
                    warn!(error = %err, "trailing stop disabled");
                    None
                }
            },
            None => None,
        };

        let mut records = Vec::new();
        let mut position: Option<Position> = None;
        let mut pending: Option<PendingEntry> = None;
        let mut next_entry_bar = cfg.warmup_bars;
        let mut next_id = 0usize;

        for (i, candle) in candles.iter().enumerate().skip(cfg.warmup_bars) {
            if let Some(entry) = pending.take() {
                position = self.open_position(next_id, entry, candle, i);
                if position.is_some() {
                    next_id += 1;
                }
            }

            if let Some(mut pos) = position.take() {
                let closed = self.manage_position(&mut pos, candle, i, trail_atr.as_deref(), &mut records);
                if closed {
                    next_entry_bar = i + 1 + cfg.cooldown_bars;
                } else {
                    position = Some(pos);
                }
                continue;
            }

            if i < next_entry_bar || i + 1 >= n {
                continue;
            }
            let signal = strategy.evaluate(candle.close, i);
            if !signal.ok {
                continue;
            }
            if !signal.has_valid_levels(candle.close) {
                debug!(index = i, reason = %signal.reason, "signal levels on the wrong side, skipped");
                continue;
            }
            pending = Some(PendingEntry {
                signal,
                signal_price: candle.close,
            });
        }

        if let (Some(pos), Some(last)) = (position.take(), candles.last()) {
            let fraction = pos.remaining;
            records.push(self.close_record(&pos, fraction, last.close, n - 1, TradeOutcome::EndOfData));
        }

        let result = BacktestResult::from_records(records, cfg.initial_balance);
        debug!(
            strategy = strategy.name(),
            round_trips = result.round_trips,
            net_pnl = result.net_pnl,
            win_rate = result.win_rate,
            "simulation finished"
        );
        result
    }

    /// Fill a pending signal at the bar's open with the signal's distances
    fn open_position(&self, id: usize, entry: PendingEntry, candle: &Candle, index: usize) -> Option<Position> {
        let price = candle.open;
        if !(price > 0.0) || !(self.config.notional > 0.0) {
            debug!(index, price, "entry skipped: non-positive price or notional");
            return None;
        }
        let signal = entry.signal;
        let sign = signal.side.sign();
        let stop = price - sign * signal.stop_distance(entry.signal_price);
        let take_profit = price + sign * signal.take_profit_distance(entry.signal_price);
        debug!(index, id, side = %signal.side, price, stop, take_profit, score = signal.score, "position opened");
        Some(Position::new(id, signal.side, price, index, stop, take_profit).with_score(signal.score))
    }

    /// Apply one bar to an open position; returns whether it was fully closed
    fn manage_position(
        &self,
        pos: &mut Position,
        candle: &Candle,
        index: usize,
        trail_atr: Option<&[f64]>,
        records: &mut Vec<TradeRecord>,
    ) -> bool {
        let cfg = &self.config;

        if pos.is_stop_loss_hit(candle) {
            let outcome = if pos.is_trailing() {
                TradeOutcome::TrailingStop
            } else {
                TradeOutcome::StopLoss
            };
            records.push(self.close_record(pos, pos.remaining, pos.stop_fill(candle), index, outcome));
            return true;
        }

        if let Some(partial) = cfg.partial_tp.filter(|_| !pos.partial_taken) {
            let level = pos.partial_level(partial.at_fraction);
            if pos.is_level_reached(candle, level) {
                let fraction = pos.remaining * partial.close_fraction;
                records.push(self.close_record(pos, fraction, level, index, TradeOutcome::PartialTakeProfit));
                pos.remaining -= fraction;
                pos.partial_taken = true;
                if partial.move_stop_to_breakeven {
                    pos.tighten_stop_loss(pos.entry_price);
                }
            }
        }

        if pos.is_take_profit_hit(candle) {
            records.push(self.close_record(pos, pos.remaining, pos.take_profit, index, TradeOutcome::TakeProfit));
            return true;
        }

        if let (Some(trailing), Some(values)) = (cfg.trailing, trail_atr) {
            let atr_value = values.get(index).copied().unwrap_or(0.0);
            if atr_value > 0.0 {
                let candidate = candle.close - pos.side.sign() * atr_value * trailing.atr_mult;
                pos.update_trailing_stop(candidate);
            }
        }

        if let Some(limit) = cfg.time_exit_bars {
            if pos.bars_held(index) >= limit {
                records.push(self.close_record(pos, pos.remaining, candle.close, index, TradeOutcome::TimeExit));
                return true;
            }
        }

        false
    }

    /// Book `fraction` of the opening size at `exit_price`
    ///
    /// Fees and slippage are charged on the closed share's notional for both
    /// legs, so a full round trip costs `round_trip_cost()` of the notional.
    fn close_record(
        &self,
        pos: &Position,
        fraction: f64,
        exit_price: f64,
        exit_index: usize,
        outcome: TradeOutcome,
    ) -> TradeRecord {
        let costs = &self.config.costs;
        let notional = self.config.notional * fraction;
        let gross = notional * pos.return_at(exit_price);
        let fees = notional * 2.0 * costs.fee_rate;
        let slippage = notional * 2.0 * costs.slippage;

        TradeRecord {
            position_id: pos.id,
            side: pos.side,
            entry_index: pos.entry_index,
            exit_index,
            entry_price: pos.entry_price,
            exit_price,
            fraction,
            outcome,
            pnl: gross - fees - slippage,
            fees,
            slippage,
            score: pos.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CostModel, PartialTakeProfit, TrailingConfig};
    use crate::portfolio::PositionSide;
    use chrono::{TimeZone, Utc};

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        let ts = Utc.timestamp_opt(i as i64 * 60, 0).single().unwrap();
        Candle::new(open, high, low, close, 1.0, ts)
    }

    fn flat_bars(n: usize, price: f64) -> Vec<Candle> {
        (0..n).map(|i| bar(i, price, price, price, price)).collect()
    }

    fn config() -> SimConfig {
        SimConfig {
            warmup_bars: 0,
            costs: CostModel::new(0.0, 0.0),
            cooldown_bars: 1000,
            ..Default::default()
        }
    }

    /// Long at bar 0 with fixed distances, nothing afterwards
    fn long_once(stop_dist: f64, tp_dist: f64) -> impl Fn(f64, usize) -> Signal {
        move |price: f64, index: usize| {
            if index == 0 {
                Signal::enter(PositionSide::Long, price - stop_dist, price + tp_dist, 80.0, "test")
            } else {
                Signal::no_data("once")
            }
        }
    }

    #[test]
    fn test_short_input_returns_zero_trades() {
        let sim = Simulator::new(SimConfig::default()).unwrap();
        let always = |price: f64, _: usize| Signal::enter(PositionSide::Long, price - 1.0, price + 1.0, 100.0, "x");
        assert!(sim.run(&[], &always).is_empty());
        assert!(sim.run(&flat_bars(61, 100.0), &always).is_empty());
    }

    #[test]
    fn test_cooldown_delays_reentry() {
        let mut candles = flat_bars(12, 100.0);
        // stop-out at bar 3
        candles[3] = bar(3, 100.0, 100.0, 98.0, 100.0);
        let always = |price: f64, _: usize| Signal::enter(PositionSide::Long, price - 1.0, price + 5.0, 90.0, "always");
        let sim = Simulator::new(SimConfig {
            cooldown_bars: 2,
            ..config()
        })
        .unwrap();
        let result = sim.run(&candles, &always);

        assert_eq!(result.records.len(), 2);
        let first = &result.records[0];
        assert_eq!(first.entry_index, 1);
        assert_eq!(first.exit_index, 3);
        assert_eq!(first.outcome, TradeOutcome::StopLoss);

        // bars 4 and 5 are cooling down, bar 6 signals, bar 7 fills
        let second = &result.records[1];
        assert_eq!(second.entry_index, 7);
        assert_eq!(second.outcome, TradeOutcome::EndOfData);
        assert_eq!(second.exit_index, 11);
        assert!(result.records.iter().all(|r| !(4..7).contains(&r.entry_index)));
    }

    #[test]
    fn test_entry_fills_next_open_with_reanchored_levels() {
        let mut candles = flat_bars(5, 100.0);
        candles[1] = bar(1, 102.0, 103.0, 101.0, 102.0);
        candles[2] = bar(2, 102.0, 112.5, 101.0, 110.0);
        let sim = Simulator::new(config()).unwrap();
        let result = sim.run(&candles, &long_once(5.0, 10.0));

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.entry_index, 1);
        assert_eq!(record.entry_price, 102.0);
        assert_eq!(record.outcome, TradeOutcome::TakeProfit);
        assert_eq!(record.exit_price, 112.0);
    }

    #[test]
    fn test_stop_wins_same_bar_tie() {
        let mut candles = flat_bars(4, 100.0);
        // touches stop (95) and target (110) in one bar
        candles[2] = bar(2, 100.0, 111.0, 94.0, 100.0);
        let sim = Simulator::new(config()).unwrap();
        let result = sim.run(&candles, &long_once(5.0, 10.0));

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].outcome, TradeOutcome::StopLoss);
        assert_eq!(result.records[0].exit_price, 95.0);
        assert_eq!(result.losses, 1);
    }

    #[test]
    fn test_round_trip_costs_on_flat_exit() {
        let candles = flat_bars(10, 100.0);
        let costs = CostModel::new(0.0006, 0.0005);
        let sim = Simulator::new(SimConfig {
            costs,
            ..config()
        })
        .unwrap();
        let result = sim.run(&candles, &long_once(5.0, 10.0));

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].outcome, TradeOutcome::EndOfData);
        let expected = -100.0 * costs.round_trip_cost();
        assert!((result.net_pnl - expected).abs() < 1e-12);
    }

    #[test]
    fn test_partial_take_profit_then_breakeven_stop() {
        let mut candles = flat_bars(6, 100.0);
        // partial level 105 reached, full target 110 not
        candles[2] = bar(2, 100.0, 106.0, 99.0, 104.0);
        // back to entry: break-even stop hit
        candles[3] = bar(3, 103.0, 103.0, 99.5, 100.0);
        let sim = Simulator::new(SimConfig {
            partial_tp: Some(PartialTakeProfit::default()),
            ..config()
        })
        .unwrap();
        let result = sim.run(&candles, &long_once(5.0, 10.0));

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].outcome, TradeOutcome::PartialTakeProfit);
        assert_eq!(result.records[0].fraction, 0.5);
        assert_eq!(result.records[0].exit_price, 105.0);
        assert_eq!(result.records[1].outcome, TradeOutcome::StopLoss);
        assert_eq!(result.records[1].exit_price, 100.0);
        assert_eq!(result.round_trips, 1);
        assert_eq!(result.wins, 1);
        assert!((result.net_pnl - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_stop_exit() {
        let mut candles: Vec<Candle> = (0..8).map(|i| {
            let c = 100.0 + i as f64;
            bar(i, c - 1.0, c + 0.5, c - 1.5, c)
        }).collect();
        candles[7] = bar(7, 106.0, 106.0, 100.0, 101.0);
        let sim = Simulator::new(SimConfig {
            trailing: Some(TrailingConfig {
                atr_mult: 1.0,
                atr_period: 3,
            }),
            ..config()
        })
        .unwrap();
        let result = sim.run(&candles, &long_once(50.0, 100.0));

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].outcome, TradeOutcome::TrailingStop);
        assert_eq!(result.records[0].exit_index, 7);
    }

    #[test]
    fn test_time_exit() {
        let candles = flat_bars(10, 100.0);
        let sim = Simulator::new(SimConfig {
            time_exit_bars: Some(3),
            ..config()
        })
        .unwrap();
        let result = sim.run(&candles, &long_once(5.0, 10.0));
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].outcome, TradeOutcome::TimeExit);
        assert_eq!(result.records[0].exit_index, 4);
    }

    #[test]
    fn test_short_side_take_profit() {
        let mut candles = flat_bars(5, 100.0);
        candles[2] = bar(2, 100.0, 101.0, 89.0, 90.0);
        let short_once = |price: f64, index: usize| {
            if index == 0 {
                Signal::enter(PositionSide::Short, price + 5.0, price - 10.0, 80.0, "short")
            } else {
                Signal::no_data("once")
            }
        };
        let sim = Simulator::new(config()).unwrap();
        let result = sim.run(&candles, &short_once);
        assert_eq!(result.records[0].outcome, TradeOutcome::TakeProfit);
        assert!((result.net_pnl - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_notional_never_trades() {
        let sim = Simulator::new(SimConfig {
            notional: 0.0,
            ..config()
        })
        .unwrap();
        let result = sim.run(&flat_bars(10, 100.0), &long_once(5.0, 10.0));
        assert_eq!(result.round_trips, 0);
    }
}
