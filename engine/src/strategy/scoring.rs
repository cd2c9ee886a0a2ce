//! Weighted point score

use crate::config::ScoreWeights;
use crate::indicators::IndicatorSnapshot;
use crate::portfolio::PositionSide;

/// Entry score (0 to `weights.total()`) of `side` at `price`
///
/// For longs "beyond" an EMA means above it and the ordering point needs
/// fast > slow; for shorts both are mirrored.
pub fn score(snapshot: &IndicatorSnapshot, price: f64, side: PositionSide, weights: &ScoreWeights) -> f64 {
    let beyond = |level: f64| match side {
        PositionSide::Long => price > level,
        PositionSide::Short => price < level,
    };

    let mut score = 0.0;
    if beyond(snapshot.ema_slow) {
        score += weights.slow_trend;
    }
    if beyond(snapshot.ema_fast) {
        score += weights.fast_trend;
    }
    if snapshot.rsi > weights.rsi_low && snapshot.rsi < weights.rsi_high {
        score += weights.rsi_band;
    }
    if price > 0.0 {
        let volatility = snapshot.atr / price;
        if volatility >= weights.min_volatility && volatility < weights.max_volatility {
            score += weights.volatility;
        }
    }
    let ordered = match side {
        PositionSide::Long => snapshot.ema_fast > snapshot.ema_slow,
        PositionSide::Short => snapshot.ema_fast < snapshot.ema_slow,
    };
    if ordered {
        score += weights.ema_order;
    }
    score
}

/// Trend condition required on top of the score
pub fn trend_ok(snapshot: &IndicatorSnapshot, price: f64, side: PositionSide) -> bool {
    match side {
        PositionSide::Long => price > snapshot.ema_slow && snapshot.ema_fast > snapshot.ema_slow,
        PositionSide::Short => price < snapshot.ema_slow && snapshot.ema_fast < snapshot.ema_slow,
    }
}

/// Notification label for a score
pub fn confidence_label(score: f64) -> &'static str {
    if score >= 85.0 {
        "very high"
    } else if score >= 70.0 {
        "high"
    } else if score >= 55.0 {
        "medium"
    } else {
        "low"
    }
}

/// Multi-line explanation attached to signals and notifications
pub fn build_reason(side: PositionSide, price: f64, snapshot: &IndicatorSnapshot, score: f64) -> String {
    format!(
        "[{}] price={:.2} ema_fast={:.2} ema_slow={:.2} rsi={:.1} atr={:.4} score={:.0} ({})",
        side,
        price,
        snapshot.ema_fast,
        snapshot.ema_slow,
        snapshot.rsi,
        snapshot.atr,
        score,
        confidence_label(score)
    )
}
