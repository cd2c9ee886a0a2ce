//! Unit tests for quant-engine public building blocks

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use quant_engine::config::{BotConfig, CostModel, ModeProfile, ParameterSet, SideFilter, TradingMode};
    use quant_engine::data::Candle;
    use quant_engine::error::EngineError;
    use quant_engine::indicators::{atr, ema, rsi, Atr, Ema, Indicator, Rsi};
    use quant_engine::portfolio::{qty_from_order_usdt, Position, PositionSide};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(open, high, low, close, 1.0, Utc.timestamp_opt(0, 0).single().unwrap())
    }

    #[test]
    fn test_candle_helpers() {
        let c = candle(100.0, 110.0, 95.0, 105.0);
        assert_eq!(c.range(), 15.0);
        assert_eq!(c.true_range(Some(120.0)), 25.0);
    }

    #[test]
    fn test_ema_of_constant_is_constant() {
        let values = vec![42.5; 30];
        for period in [1, 5, 20] {
            let out = ema(&values, period).unwrap();
            assert!(out.iter().all(|v| (v - 42.5).abs() < 1e-9));
        }
    }

    #[test]
    fn test_ema_streaming_matches_series() {
        let values: Vec<f64> = (0..25).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let series = ema(&values, 10).unwrap();

        let mut streaming = Ema::new(10).unwrap();
        assert_eq!(streaming.name(), "EMA");
        for v in &values {
            streaming.update(*v);
        }
        assert!(streaming.is_ready());
        assert!((streaming.value().unwrap() - series[24]).abs() < 1e-12);
        assert_eq!(series[0], values[0]);
    }

    #[test]
    fn test_rsi_rising_series_approaches_100() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&values, 14).unwrap();
        assert_eq!(out[5], 50.0);
        assert!(out[59] > 99.0);

        let mut streaming = Rsi::new(14).unwrap();
        for v in &values[..14] {
            streaming.update(*v);
        }
        assert!(!streaming.is_ready());
        streaming.update(values[14]);
        assert!(streaming.is_ready());
    }

    #[test]
    fn test_atr_streaming() {
        let mut atr_ind = Atr::new(3).unwrap();
        let c = candle(100.0, 102.0, 98.0, 100.0);
        for _ in 0..2 {
            atr_ind.update(&c);
        }
        assert!(!atr_ind.is_ready());
        atr_ind.update(&c);
        assert!((atr_ind.value().unwrap() - 4.0).abs() < 1e-12);
        assert!(atr(&[c], 3).unwrap()[0] >= 0.0);
    }

    #[test]
    fn test_zero_period_is_rejected() {
        for err in [Ema::new(0).err(), Rsi::new(0).err(), Atr::new(0).err()] {
            let err = err.unwrap();
            assert!(matches!(
                err.downcast_ref::<EngineError>(),
                Some(EngineError::InvalidPeriod { period: 0, .. })
            ));
        }
    }

    #[test]
    fn test_round_trip_cost() {
        let costs = CostModel::new(0.0006, 0.0005);
        assert_eq!(costs.round_trip_cost(), 2.0 * 0.0006 + 2.0 * 0.0005);
    }

    #[test]
    fn test_mode_profiles() {
        let safe = ModeProfile::for_mode(TradingMode::Safe);
        let aggro = ModeProfile::for_mode(TradingMode::Aggro);
        assert!(aggro.leverage > safe.leverage);
        assert!(aggro.enter_score < safe.enter_score);
        assert_eq!("attack".parse::<TradingMode>().unwrap(), TradingMode::Aggro);
        assert_eq!(safe.params(SideFilter::Long), ParameterSet::new(65.0, 1.8, 1.5, SideFilter::Long));
    }

    #[test]
    fn test_position_stop_and_target() {
        let mut pos = Position::new(0, PositionSide::Short, 100.0, 10, 103.0, 94.0);
        assert!(pos.is_stop_loss_hit(&candle(100.0, 103.5, 99.0, 101.0)));
        assert!(pos.is_take_profit_hit(&candle(96.0, 97.0, 93.5, 95.0)));
        assert!(pos.update_trailing_stop(101.0));
        assert!(!pos.update_trailing_stop(102.0));
        assert_eq!(pos.effective_stop(), 101.0);
    }

    #[test]
    fn test_order_sizing() {
        assert_eq!(qty_from_order_usdt(12.0, 8, 60_000.0), 0.0016);
        assert_eq!(qty_from_order_usdt(12.0, 8, 0.0), 0.0);
    }

    #[test]
    fn test_bot_config_roundtrip() {
        let config = BotConfig::default();
        let json = config.to_json_pretty().unwrap();
        let parsed = BotConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_prelude_exposes_config_and_sizing() {
        use quant_engine::prelude::*;

        let profile = ModeProfile::for_mode(TradingMode::Safe);
        assert!(profile.leverage >= 1);
        let qty = qty_from_order_usdt(100.0, profile.leverage, 50.0);
        assert!((qty - 2.0 * profile.leverage as f64).abs() < 1e-9);
    }
}
