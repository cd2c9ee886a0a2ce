//! Strategy engine module
//!
//! The signal function contract, the weighted point score and the
//! score-based strategy shared by backtests and the live trader.

pub mod base;
pub mod signal;
pub mod scoring;
pub mod implementations;

pub use base::*;
pub use signal::*;
pub use scoring::*;
pub use implementations::*;
