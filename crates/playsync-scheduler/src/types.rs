//! Scheduler types.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::time::Instant;

/// Error type returned by task actions.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for a task's action.
pub type TaskAction = Box<dyn Fn() -> BoxFuture<'static, Result<(), TaskError>> + Send + Sync>;

/// A named, independently scheduled unit of asynchronous work.
pub struct Task {
    /// Unique name, used for logging and as the schedule key.
    pub name: String,
    /// Nominal time between successful runs.
    pub interval: Duration,
    /// Delay before the first run. `None` picks a random start offset.
    pub initial_delay: Option<Duration>,
    /// The work itself.
    pub action: TaskAction,
}

impl Task {
    /// Create a task from an async closure.
    ///
    /// The closure is called once per run; any state it needs across runs
    /// lives in whatever it captures.
    pub fn new<F, Fut, E>(name: impl Into<String>, interval: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<TaskError>,
    {
        Self {
            name: name.into(),
            interval,
            initial_delay: None,
            action: Box::new(move || -> BoxFuture<'static, Result<(), TaskError>> {
                let fut = action();
                async move { fut.await.map_err(Into::into) }.boxed()
            }),
        }
    }

    /// Run the first time after exactly `delay`.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Invoke the action once.
    pub(crate) fn invoke(&self) -> BoxFuture<'static, Result<(), TaskError>> {
        (self.action)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("initial_delay", &self.initial_delay)
            .finish_non_exhaustive()
    }
}

/// How a single run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Succeeded,
    Failed { error: String },
}

/// Record of one task run within a tick.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub started: Instant,
    pub elapsed: Duration,
    pub result: TaskResult,
    /// When the task was rescheduled to run next.
    pub next_due: Instant,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == TaskResult::Succeeded
    }
}

/// Why [`Scheduler::run`](crate::Scheduler::run) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stop was requested on the shutdown channel.
    Requested,
    /// Every shutdown sender was dropped.
    ChannelClosed,
}
