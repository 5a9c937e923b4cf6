//! Recurring task scheduler implementation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::delay::{initial_delay, jitter, sleep};
use crate::{SchedulerConfig, SchedulerError, StopReason, Task, TaskOutcome, TaskResult};

/// Runs a fixed set of tasks, each on its own interval.
///
/// Due tasks run one after another in registration order, never in
/// parallel. A slow task delays the ones behind it (no preemption), and a
/// hung task stalls the loop: no timeout is imposed on actions.
///
/// The schedule map is owned by the scheduler and only mutated by the loop.
pub struct Scheduler {
    tasks: Vec<Task>,
    next_due: HashMap<String, Instant>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(tasks: Vec<Task>) -> Result<Self, SchedulerError> {
        Self::with_config(tasks, SchedulerConfig::default())
    }

    /// Create a scheduler, validating the task set.
    ///
    /// Every task gets its first due time here: `now + initial_delay`, or a
    /// random offset below `max_initial_delay` when none was given.
    pub fn with_config(tasks: Vec<Task>, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if task.name.trim().is_empty() {
                return Err(SchedulerError::EmptyName);
            }
            if task.interval.is_zero() {
                return Err(SchedulerError::InvalidInterval {
                    name: task.name.clone(),
                });
            }
            if !seen.insert(task.name.as_str()) {
                return Err(SchedulerError::DuplicateTask(task.name.clone()));
            }
        }

        let now = Instant::now();
        let next_due = tasks
            .iter()
            .map(|task| {
                let delay = task
                    .initial_delay
                    .unwrap_or_else(|| initial_delay(config.max_initial_delay()));
                (task.name.clone(), now + delay)
            })
            .collect();

        Ok(Self {
            tasks,
            next_due,
            config,
        })
    }

    /// Get the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// When the named task is next due.
    pub fn next_due(&self, name: &str) -> Option<Instant> {
        self.next_due.get(name).copied()
    }

    /// Run the scheduler loop until a stop is requested.
    ///
    /// Sending `true` on the channel (or dropping every sender) requests a
    /// stop. The request is observed at the top of each iteration, between
    /// due tasks, and during the inter-tick sleep. A task already running is
    /// allowed to finish, so stop latency is bounded by that task's run time.
    ///
    /// Returns control to the caller; deciding the process exit code is the
    /// caller's business.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> StopReason {
        let names: Vec<&str> = self.task_names().collect();
        info!(tasks = ?names, "scheduler starting");

        let reason = loop {
            if *shutdown_rx.borrow() {
                break StopReason::Requested;
            }

            self.run_due(Some(&shutdown_rx)).await;

            let wait = self.sleep_duration();
            debug!(wait_ms = wait.as_millis() as u64, "sleeping until next tick");

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        info!("shutdown channel closed");
                        break StopReason::ChannelClosed;
                    }
                    if *shutdown_rx.borrow() {
                        info!("scheduler received stop request");
                    }
                }
                _ = sleep(wait) => {}
            }
        };

        info!("scheduler stopped gracefully");
        reason
    }

    /// Run one tick: every task due now, in registration order.
    ///
    /// Returns one outcome per task that ran.
    pub async fn tick(&mut self) -> Vec<TaskOutcome> {
        self.run_due(None).await
    }

    /// How long to sleep before the next tick.
    ///
    /// The time until the soonest due task, clamped to
    /// `[min_sleep, max_sleep]`.
    pub fn sleep_duration(&self) -> Duration {
        let min = self.config.min_sleep();
        let max = self.config.max_sleep();

        match self.next_due.values().min() {
            Some(soonest) => soonest
                .saturating_duration_since(Instant::now())
                .clamp(min, max),
            None => max,
        }
    }

    /// Indices of tasks due at `now`, in registration order.
    fn due_tasks(&self, now: Instant) -> Vec<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| {
                self.next_due
                    .get(&task.name)
                    .is_some_and(|due| *due <= now)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    async fn run_due(&mut self, shutdown_rx: Option<&watch::Receiver<bool>>) -> Vec<TaskOutcome> {
        let due = self.due_tasks(Instant::now());
        let mut outcomes = Vec::with_capacity(due.len());

        for idx in due {
            if shutdown_rx.is_some_and(|rx| *rx.borrow()) {
                info!("stop requested, not starting remaining due tasks");
                break;
            }
            outcomes.push(self.execute(idx).await);
        }

        outcomes
    }

    /// Execute a single task and reschedule it.
    ///
    /// Success: the next run is one jittered interval after this run
    /// started, so the task's own runtime does not push the cadence later.
    /// Failure: the next run is a jittered `interval * failure_backoff` after
    /// the failure. Retries are unbounded.
    #[tracing::instrument(skip(self), fields(task = %self.tasks[idx].name))]
    async fn execute(&mut self, idx: usize) -> TaskOutcome {
        let task = &self.tasks[idx];
        let pct = self.config.jitter_pct;

        let started = Instant::now();
        let result = task.invoke().await;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(started);

        let (next_due, result) = match result {
            Ok(()) => {
                let remaining = jitter(task.interval, pct).saturating_sub(elapsed);
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    next_in_ms = remaining.as_millis() as u64,
                    "task succeeded, rescheduled"
                );
                (now + remaining, TaskResult::Succeeded)
            }
            Err(e) => {
                let retry = jitter(
                    backoff_interval(task.interval, self.config.failure_backoff),
                    pct,
                );
                error!(
                    error = %e,
                    retry_in_ms = retry.as_millis() as u64,
                    "task failed, backing off"
                );
                (
                    now + retry,
                    TaskResult::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };

        self.next_due.insert(task.name.clone(), next_due);

        TaskOutcome {
            name: task.name.clone(),
            started,
            elapsed,
            result,
            next_due,
        }
    }
}

/// Scale `interval` by `factor`, falling back to the interval itself when
/// the product is not representable.
fn backoff_interval(interval: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * factor.max(0.0)).unwrap_or(interval)
}
