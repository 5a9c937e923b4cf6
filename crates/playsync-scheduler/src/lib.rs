//! Recurring task scheduler for playsync.
//!
//! This crate runs named asynchronous tasks on their own intervals:
//! - Randomized start offsets so tasks without an explicit delay are staggered
//! - Jittered rescheduling after every run
//! - 1.5x backoff (still jittered) after a failed run
//! - Strictly sequential execution in registration order
//! - Cooperative shutdown through a `watch` channel

mod config;
mod delay;
mod error;
mod scheduler;
mod types;

pub use config::SchedulerConfig;
pub use delay::{initial_delay, jitter, jitter_with, sleep};
pub use error::SchedulerError;
pub use scheduler::Scheduler;
pub use types::{StopReason, Task, TaskAction, TaskError, TaskOutcome, TaskResult};
