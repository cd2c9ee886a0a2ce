//! Strategy implementations

pub mod score_strategy;

pub use score_strategy::*;
