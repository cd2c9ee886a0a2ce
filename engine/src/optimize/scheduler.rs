//! Periodic re-optimisation

use crate::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// Outcome of the last scheduled run
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledRun<T> {
    Completed(T),
    Failed(String),
}

/// Runs an injected optimisation at most once per interval
///
/// State lives in memory only; a restarted process runs on its first check.
#[derive(Debug, Clone)]
pub struct WalkForwardScheduler<T> {
    interval: Duration,
    last_run: Option<DateTime<Utc>>,
    last_outcome: Option<ScheduledRun<T>>,
}

impl<T> WalkForwardScheduler<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            last_outcome: None,
        }
    }

    /// Scheduler with an interval in hours
    pub fn every_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run {
            Some(last) => now - last >= self.interval,
            None => true,
        }
    }

    /// Run `optimize` when due; failures are kept as the outcome
    pub fn run_if_due<F>(&mut self, now: DateTime<Utc>, optimize: F) -> Option<&ScheduledRun<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.is_due(now) {
            return None;
        }
        let outcome = match optimize() {
            Ok(value) => {
                info!("scheduled optimisation completed");
                ScheduledRun::Completed(value)
            }
            Err(err) => {
                warn!(error = %err, "scheduled optimisation failed");
                ScheduledRun::Failed(format!("{:#}", err))
            }
        };
        self.last_run = Some(now);
        self.last_outcome = Some(outcome);
        self.last_outcome.as_ref()
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn last_outcome(&self) -> Option<&ScheduledRun<T>> {
        self.last_outcome.as_ref()
    }
}

impl<T> Default for WalkForwardScheduler<T> {
    fn default() -> Self {
        Self::every_hours(24)
    }
}
