//! Parameter search module
//!
//! Grid search over one history, walk-forward selection across train/test
//! windows and a scheduler for periodic re-optimisation.

pub mod grid;
pub mod walkforward;
pub mod scheduler;

pub use grid::*;
pub use walkforward::*;
pub use scheduler::*;
