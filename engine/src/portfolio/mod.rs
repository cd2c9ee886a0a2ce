//! Portfolio management module
//!
//! Simulated positions and order sizing.

pub mod position;
pub mod sizing;

pub use position::*;
pub use sizing::*;
