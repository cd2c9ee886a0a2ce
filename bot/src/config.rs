use anyhow::{Context, Result};
use dotenv::dotenv;
use quant_engine::config::{BotConfig, SideFilter, TradingMode};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Load the bot configuration
///
/// Starts from `path` (JSON) when given, otherwise from the defaults, then
/// applies `QUANT_*` environment overrides (a `.env` file is honoured).
pub fn load(path: Option<&Path>) -> Result<BotConfig> {
    dotenv().ok();

    let mut config = match path {
        Some(path) => BotConfig::load(path)?,
        None => {
            debug!("no config file given, using defaults");
            BotConfig::default()
        }
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    info!(symbol = %config.live.symbol, mode = %config.live.mode, "configuration loaded");
    Ok(config)
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("invalid value `{}` for {}", raw, key))
}

/// Overlay environment values read through `lookup`
pub fn apply_env(config: &mut BotConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = lookup("QUANT_SYMBOL") {
        config.live.symbol = v.trim().to_uppercase();
    }
    if let Some(v) = lookup("QUANT_INTERVAL") {
        config.live.interval = v.trim().to_string();
    }
    if let Some(v) = lookup("QUANT_MODE") {
        config.live.mode = parse::<TradingMode>("QUANT_MODE", &v)?;
    }
    if let Some(v) = lookup("QUANT_SIDE") {
        let side = parse::<SideFilter>("QUANT_SIDE", &v)?;
        config.live.side = side;
        config.params.side = side;
    }
    if let Some(v) = lookup("QUANT_DRY_RUN") {
        config.live.dry_run = parse::<bool>("QUANT_DRY_RUN", &v)?;
    }
    if let Some(v) = lookup("QUANT_LOOP_SECONDS") {
        config.live.loop_seconds = parse::<u64>("QUANT_LOOP_SECONDS", &v)?;
    }
    if let Some(v) = lookup("QUANT_FEE_RATE") {
        config.sim.costs.fee_rate = parse::<f64>("QUANT_FEE_RATE", &v)?;
    }
    if let Some(v) = lookup("QUANT_SLIPPAGE") {
        config.sim.costs.slippage = parse::<f64>("QUANT_SLIPPAGE", &v)?;
    }
    if let Some(v) = lookup("QUANT_NOTIONAL") {
        config.sim.notional = parse::<f64>("QUANT_NOTIONAL", &v)?;
    }
    if let Some(v) = lookup("QUANT_ENTER_SCORE") {
        config.params.enter_score = parse::<f64>("QUANT_ENTER_SCORE", &v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BotConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("QUANT_SYMBOL", "ethusdt"),
                ("QUANT_MODE", "attack"),
                ("QUANT_SIDE", "short"),
                ("QUANT_DRY_RUN", "false"),
                ("QUANT_FEE_RATE", "0.0004"),
            ]),
        )
        .unwrap();

        assert_eq!(config.live.symbol, "ETHUSDT");
        assert_eq!(config.live.mode, TradingMode::Aggro);
        assert_eq!(config.params.side, SideFilter::Short);
        assert!(!config.live.dry_run);
        assert_eq!(config.sim.costs.fee_rate, 0.0004);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = BotConfig::default();
        let err = apply_env(&mut config, env(&[("QUANT_NOTIONAL", "lots")])).unwrap_err();
        assert!(err.to_string().contains("QUANT_NOTIONAL"));
    }

    #[test]
    fn test_no_env_keeps_defaults() {
        let mut config = BotConfig::default();
        apply_env(&mut config, env(&[])).unwrap();
        assert_eq!(config, BotConfig::default());
    }
}
