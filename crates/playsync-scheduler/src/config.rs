//! Scheduler tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the scheduler loop.
///
/// The defaults are the values the loop was designed around; they are
/// exposed so tests and embedders can tighten them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Lower bound on the inter-tick sleep, so an overdue task never causes
    /// a busy loop. Defaults to 250 ms.
    #[serde(default = "default_min_sleep_ms")]
    pub min_sleep_ms: u64,

    /// Upper bound on the inter-tick sleep. Defaults to 5000 ms.
    #[serde(default = "default_max_sleep_ms")]
    pub max_sleep_ms: u64,

    /// Exclusive upper bound of the random start offset given to tasks
    /// without an explicit initial delay. Defaults to 5000 ms.
    #[serde(default = "default_max_initial_delay_ms")]
    pub max_initial_delay_ms: u64,

    /// Half-width of the jitter band as a fraction of the interval.
    /// Defaults to 0.2.
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,

    /// Multiplier applied to the interval after a failed run.
    /// Defaults to 1.5.
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff: f64,
}

fn default_min_sleep_ms() -> u64 {
    250
}

fn default_max_sleep_ms() -> u64 {
    5_000
}

fn default_max_initial_delay_ms() -> u64 {
    5_000
}

fn default_jitter_pct() -> f64 {
    0.2
}

fn default_failure_backoff() -> f64 {
    1.5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: default_min_sleep_ms(),
            max_sleep_ms: default_max_sleep_ms(),
            max_initial_delay_ms: default_max_initial_delay_ms(),
            jitter_pct: default_jitter_pct(),
            failure_backoff: default_failure_backoff(),
        }
    }
}

impl SchedulerConfig {
    pub fn min_sleep(&self) -> Duration {
        Duration::from_millis(self.min_sleep_ms)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_ms.max(self.min_sleep_ms))
    }

    pub fn max_initial_delay(&self) -> Duration {
        Duration::from_millis(self.max_initial_delay_ms)
    }
}
