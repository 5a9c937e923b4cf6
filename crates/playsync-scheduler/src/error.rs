//! Error types for the scheduler.

use thiserror::Error;

/// Errors raised while building a scheduler.
///
/// The loop itself has no fallible operations: task failures are contained
/// and turned into a backoff reschedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Two tasks were registered under the same name.
    #[error("duplicate task name: {0}")]
    DuplicateTask(String),

    /// A task was registered with an empty name.
    #[error("task name cannot be empty")]
    EmptyName,

    /// A task was registered with a zero interval.
    #[error("task {name} has a zero interval")]
    InvalidInterval { name: String },
}
