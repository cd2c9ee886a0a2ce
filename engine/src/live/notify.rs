//! Chat-side capabilities: outbound notifications and inbound commands

use crate::config::TradingMode;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use tracing::info;

/// Operator command, already parsed by the chat integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enable automatic entries
    Start,
    /// Disable automatic entries
    Stop,
    /// Switch the risk mode
    Mode(TradingMode),
    Status,
    /// Manual long entry
    Buy,
    /// Manual short entry
    Short,
    /// Close the open position
    Sell,
    /// Close everything and disable trading
    Panic,
    Help,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => f.write_str("start"),
            Command::Stop => f.write_str("stop"),
            Command::Mode(mode) => write!(f, "mode {}", mode),
            Command::Status => f.write_str("status"),
            Command::Buy => f.write_str("buy"),
            Command::Short => f.write_str("short"),
            Command::Sell => f.write_str("sell"),
            Command::Panic => f.write_str("panic"),
            Command::Help => f.write_str("help"),
        }
    }
}

/// Outbound text messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Inbound commands; `None` once the source is closed
#[async_trait]
pub trait CommandSource: Send {
    async fn receive_command(&mut self) -> Option<Command>;
}

#[async_trait]
impl CommandSource for mpsc::Receiver<Command> {
    async fn receive_command(&mut self) -> Option<Command> {
        self.recv().await
    }
}

/// Notifier that writes messages to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        info!(target: "notify", "{}", text);
        Ok(())
    }
}
