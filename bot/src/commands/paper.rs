use anyhow::{bail, Result};
use clap::Args;
use quant_engine::config::{BotConfig, TradingMode};
use quant_engine::live::{ClosedTrade, LogNotifier, TickEvent, Trader};
use std::path::PathBuf;
use tracing::{debug, info};

use super::load_candles;
use crate::replay::ReplayExchange;

#[derive(Args, Debug, Clone)]
pub struct PaperArgs {
    /// Kline CSV with a `timestamp,open,high,low,close,volume` header
    #[arg(long)]
    pub data: PathBuf,

    /// safe or aggro
    #[arg(long)]
    pub mode: Option<TradingMode>,

    /// Track positions locally without sending orders to the replay venue
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Print every closed trade
    #[arg(long, default_value_t = false)]
    pub trades: bool,
}

/// Totals over a replay
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct PaperSummary {
    pub ticks: usize,
    pub entries: usize,
    pub closed: Vec<ClosedTrade>,
    pub data_gaps: usize,
}

impl PaperSummary {
    pub(crate) fn record(&mut self, event: &TickEvent) {
        self.ticks += 1;
        match event {
            TickEvent::Entered { .. } => self.entries += 1,
            TickEvent::Exited(trade) => self.closed.push(trade.clone()),
            TickEvent::DataUnavailable => self.data_gaps += 1,
            _ => {}
        }
    }

    pub(crate) fn net_pnl(&self) -> f64 {
        self.closed.iter().map(|t| t.pnl).sum()
    }

    pub(crate) fn wins(&self) -> usize {
        self.closed.iter().filter(|t| t.pnl > 0.0).count()
    }
}

pub async fn run(mut config: BotConfig, args: &PaperArgs) -> Result<()> {
    if let Some(mode) = args.mode {
        config.live.mode = mode;
    }
    config.live.dry_run = args.dry_run;

    let candles = load_candles(&args.data)?.into_vec();
    let first = config.live.min_klines.saturating_sub(1);
    if candles.len() <= first {
        bail!(
            "{} candles are not enough, the trader needs {}",
            candles.len(),
            config.live.min_klines
        );
    }
    let timestamps: Vec<_> = candles.iter().map(|c| c.timestamp).collect();

    let mut trader = Trader::from_config(&config, ReplayExchange::new(candles), LogNotifier)?;
    info!(
        symbol = %config.live.symbol,
        mode = %config.live.mode,
        dry_run = config.live.dry_run,
        bars = timestamps.len() - first,
        "paper replay started"
    );

    let mut summary = PaperSummary::default();
    for (index, now) in timestamps.iter().enumerate().skip(first) {
        trader.exchange().seek(index);
        let event = trader.tick(*now).await;
        debug!(index, ?event, "replay tick");
        summary.record(&event);
    }

    if args.trades {
        println!("side   entry       exit        qty         pnl         reason");
        for t in &summary.closed {
            println!(
                "{:<6} {:<10.4}  {:<10.4}  {:<10.6}  {:<10.4}  {}",
                t.side.to_string(),
                t.entry_price,
                t.exit_price,
                t.qty,
                t.pnl,
                t.reason
            );
        }
        println!();
    }

    let closed = summary.closed.len();
    let win_rate = if closed == 0 {
        0.0
    } else {
        summary.wins() as f64 / closed as f64 * 100.0
    };
    println!("Ticks: {}", summary.ticks);
    println!("Entries: {}", summary.entries);
    println!("Closed: {} ({} wins, {:.2}%)", closed, summary.wins(), win_rate);
    println!("Net PnL: {:.4}", summary.net_pnl());
    println!("Orders sent: {}", trader.exchange().orders().len());
    if let (Some(position), Some(price)) = (&trader.session().position, trader.session().last_price) {
        println!(
            "Open: {} @ {:.4}, unrealized {:.4}",
            position.side,
            position.entry_price,
            position.pnl_at(price)
        );
    }
    println!();
    println!("{}", trader.session().status_text(trader.profile()));
    Ok(())
}
