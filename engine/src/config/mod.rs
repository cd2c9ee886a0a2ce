//! Configuration module
//!
//! Plain serde structs with defaults and a `validate()` each; [`BotConfig`]
//! bundles them under a schema version.

pub mod strategy;
pub mod risk;
pub mod backtest;
pub mod search;
pub mod live;
pub mod bot;

pub use strategy::*;
pub use risk::*;
pub use backtest::*;
pub use search::*;
pub use live::*;
pub use bot::*;
