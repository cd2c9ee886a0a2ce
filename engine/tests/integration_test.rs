//! Integration tests for quant-engine

use chrono::{Duration, TimeZone, Utc};
use quant_engine::backtest::{BacktestReport, Simulator, TradeOutcome};
use quant_engine::config::{
    IndicatorConfig, ParameterGrid, ParameterSet, ScoreWeights, SearchConfig, SideFilter, SimConfig, WindowScheme,
};
use quant_engine::data::{read_csv, write_csv_to, Candle};
use quant_engine::error::EngineError;
use quant_engine::indicators::{atr, rsi, IndicatorFrame};
use quant_engine::optimize::{run_grid, walk_forward};
use quant_engine::portfolio::PositionSide;
use quant_engine::strategy::{ScoreStrategy, Signal};

/// Helper function to create candles from closes, each bar opening at the
/// previous close with `wick` above and below the body
fn candles_from_closes(closes: &[f64], wick: f64) -> Vec<Candle> {
    let base_time = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
    let mut prev = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Candle::new(
                open,
                open.max(close) + wick,
                open.min(close) - wick,
                close,
                1000.0,
                base_time + Duration::minutes(15 * i as i64),
            )
        })
        .collect()
}

/// Deterministic pseudo-random walk
fn random_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut price = 100.0;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let r = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            price = (price * (1.0 + r * 0.02)).max(1.0);
            price
        })
        .collect()
}

#[test]
fn test_flat_series_has_neutral_indicators_and_no_entries() {
    let candles: Vec<Candle> = candles_from_closes(&[100.0; 100], 0.0);
    let frame = IndicatorFrame::compute(&candles, &IndicatorConfig::default()).unwrap();

    let snapshot = frame.last_snapshot().unwrap();
    assert_eq!(snapshot.rsi, 50.0);
    assert!(snapshot.atr.abs() < 1e-12);

    let strategy = ScoreStrategy::new(&frame, ParameterSet::new(0.0, 1.0, 1.0, SideFilter::Both), ScoreWeights::default());
    let result = Simulator::new(SimConfig::default()).unwrap().run(&candles, &strategy);
    assert_eq!(result.round_trips, 0);
    assert!(result.records.is_empty());
}

#[test]
fn test_linear_uptrend_single_take_profit() {
    // 100 -> 200 over 50 bars
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + 100.0 * i as f64 / 49.0).collect();
    let candles = candles_from_closes(&closes, 0.5);
    let indicators = IndicatorConfig {
        ema_fast: 3,
        ema_slow: 8,
        warmup_bars: Some(10),
        ..Default::default()
    };
    let frame = IndicatorFrame::compute(&candles, &indicators).unwrap();
    for i in 25..50 {
        assert!(frame.ema_fast()[i] > frame.ema_slow()[i], "bar {}", i);
    }

    let strategy = ScoreStrategy::new(&frame, ParameterSet::new(50.0, 1.0, 1.0, SideFilter::Long), ScoreWeights::default());
    let sim = SimConfig {
        warmup_bars: 10,
        cooldown_bars: 1_000,
        ..Default::default()
    };
    let result = Simulator::new(sim).unwrap().run(&candles, &strategy);

    assert_eq!(result.round_trips, 1);
    assert_eq!(result.records.len(), 1);
    let trade = &result.records[0];
    assert_eq!(trade.side, PositionSide::Long);
    assert_eq!(trade.outcome, TradeOutcome::TakeProfit);
    assert_eq!(trade.entry_index, 11);
    assert!(trade.pnl > 0.0);
    assert_eq!(result.wins, 1);
}

#[test]
fn test_short_sequence_returns_zero_trades() {
    let candles = candles_from_closes(&random_walk(40, 7), 0.3);
    let always = |price: f64, _index: usize| Signal::enter(PositionSide::Long, price - 1.0, price + 1.0, 100.0, "always");
    let result = Simulator::new(SimConfig::default()).unwrap().run(&candles, &always);
    assert_eq!(result.round_trips, 0);
    assert_eq!(result.final_equity, result.initial_balance);

    let empty = Simulator::new(SimConfig::default()).unwrap().run(&[], &always);
    assert!(empty.is_empty());
}

#[test]
fn test_stop_wins_when_both_levels_touched() {
    let t0 = Utc.timestamp_opt(0, 0).single().unwrap();
    let mut candles: Vec<Candle> = (0..5)
        .map(|i| Candle::new(100.0, 100.5, 99.5, 100.0, 1.0, t0 + Duration::minutes(i)))
        .collect();
    // bar 2 spans both the stop (98) and the target (103)
    candles[2] = Candle::new(100.0, 104.0, 97.0, 100.0, 1.0, t0 + Duration::minutes(2));

    let once = |price: f64, index: usize| {
        if index == 0 {
            Signal::enter(PositionSide::Long, price - 2.0, price + 3.0, 90.0, "test")
        } else {
            Signal::reject(PositionSide::Long, 0.0, "flat")
        }
    };
    let sim = SimConfig {
        warmup_bars: 0,
        ..Default::default()
    };
    let result = Simulator::new(sim).unwrap().run(&candles, &once);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].outcome, TradeOutcome::StopLoss);
    assert_eq!(result.records[0].exit_price, 98.0);
}

#[test]
fn test_rsi_and_atr_bounds_on_random_walks() {
    for seed in 1..6 {
        let closes = random_walk(500, seed);
        let candles = candles_from_closes(&closes, 0.2);
        for period in [2, 14, 30] {
            assert!(rsi(&closes, period).unwrap().iter().all(|v| (0.0..=100.0).contains(v)));
            assert!(atr(&candles, period).unwrap().iter().all(|v| *v >= 0.0));
        }
    }
}

#[test]
fn test_csv_roundtrip() {
    let candles = candles_from_closes(&random_walk(20, 3), 0.1);
    let mut buf = Vec::new();
    write_csv_to(&mut buf, &candles).unwrap();
    let text = String::from_utf8(buf.clone()).unwrap();
    assert!(text.starts_with("timestamp,open,high,low,close,volume"));

    let parsed = read_csv(buf.as_slice()).unwrap();
    assert_eq!(parsed.len(), candles.len());
    for (a, b) in parsed.candles().iter().zip(&candles) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.close, b.close);
        assert_eq!(a.high, b.high);
    }
}

#[test]
fn test_csv_sorts_and_dedups_millisecond_rows() {
    let csv = "timestamp,open,high,low,close,volume\n\
               1700000900000,2,3,1,2.5,10\n\
               1700000000000,1,2,0.5,1.5,10\n\
               1700000900000,9,9,9,9,9\n";
    let series = read_csv(csv.as_bytes()).unwrap();
    assert_eq!(series.len(), 2);
    assert!(series.is_ascending());
    assert_eq!(series.candles()[0].close, 1.5);
    assert_eq!(series.candles()[1].close, 2.5);

    let bad = "timestamp,open,high,low,close,volume\n1700000000,1,2,x,1,1\n";
    assert!(read_csv(bad.as_bytes()).is_err());
}

#[test]
fn test_csv_rejects_non_finite_and_inverted_rows() {
    let header = "timestamp,open,high,low,close,volume\n";
    for row in [
        "1700000900,nan,nan,nan,nan,1",
        "1700000900,1,inf,0.5,1,1",
        "1700000900,1,2,-inf,1,1",
        "1700000900,1,2,0.5,1,NaN",
        "1700000900,1,0.5,2,1,1",
    ] {
        let csv = format!("{}1700000000,1,2,0.5,1.5,10\n{}\n", header, row);
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<EngineError>(), Some(EngineError::CsvRow { row: 2, .. })),
            "row `{}` gave {}",
            row,
            err
        );
    }
}

#[test]
fn test_grid_search_reports_every_combination() {
    let candles = candles_from_closes(&random_walk(600, 11), 0.3);
    let grid = ParameterGrid {
        enter_scores: vec![45.0, 65.0],
        stop_atrs: vec![1.0, 2.0],
        tp_rs: vec![1.5],
        sides: vec![SideFilter::Both],
    };
    let results = run_grid(
        &candles,
        &grid,
        &IndicatorConfig::default(),
        &ScoreWeights::default(),
        &SimConfig::default(),
    )
    .unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.windows(2).all(|w| w[0].result.net_pnl >= w[1].result.net_pnl));

    let report = BacktestReport::new(results[0].result.clone());
    assert!(report.format().contains("Round Trips:"));
}

#[test]
fn test_walk_forward_never_selects_below_min_trades() {
    let candles = candles_from_closes(&random_walk(1_500, 5), 0.4);
    let grid = ParameterGrid {
        enter_scores: vec![40.0, 55.0, 70.0],
        stop_atrs: vec![1.0, 1.8],
        tp_rs: vec![1.0, 2.0],
        sides: vec![SideFilter::Both],
    };
    let sim = SimConfig::default();
    let indicators = IndicatorConfig::default();
    let weights = ScoreWeights::default();

    for min_trades in [1, 3] {
        let search = SearchConfig {
            grid: grid.clone(),
            scheme: WindowScheme::Anchored { folds: 3 },
            min_trades,
            ..Default::default()
        };
        match walk_forward(&candles, &search, &indicators, &weights, &sim) {
            Ok(report) => {
                assert!(report.best.is_viable());
                for outcome in &report.best.windows {
                    assert!(outcome.test.round_trips >= min_trades);
                }
                for entry in report.leaderboard.iter().filter(|c| c.is_viable()) {
                    assert!(entry.windows.iter().all(|w| w.test.round_trips >= min_trades));
                }
                assert_eq!(report.evaluated, 12);
            }
            Err(err) => assert!(matches!(
                err.downcast_ref::<EngineError>(),
                Some(EngineError::NoViableCombination { .. })
            )),
        }
    }

    let impossible = SearchConfig {
        grid,
        scheme: WindowScheme::Anchored { folds: 3 },
        min_trades: 100_000,
        ..Default::default()
    };
    let err = walk_forward(&candles, &impossible, &indicators, &weights, &sim).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::NoViableCombination { min_trades: 100_000 })
    ));
}
