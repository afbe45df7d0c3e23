//! The three capabilities the scheduler is built from.
//!
//! A [`WorkFinder`] discovers tasks for a category name, a [`Worker`] executes
//! tasks and is routed to by its name, and the scheduler ties the two together
//! on a timer. Workers and finders agree on names by convention only; the
//! scheduler checks the pairing once, when it is constructed.

use std::fmt;

use async_trait::async_trait;

use crate::{Error, Result};

/// One discovered unit of pending work.
///
/// Tasks are immutable values. The scheduler executes each task at most once
/// per discovery and drops it afterwards.
pub trait Task: fmt::Display + Send + Sync + 'static {
    /// Name of the worker that must process this task
    fn worker_name(&self) -> &str;
}

/// A named strategy that executes tasks of one category.
#[async_trait]
pub trait Worker<T: Task>: Send + Sync {
    /// Routing key; a finder is asked for work under this name
    fn name(&self) -> &str;

    /// Perform the task. All side effects happen here; the scheduler only
    /// observes whether it returned `Ok`.
    async fn execute(&self, task: &T) -> Result<()>;
}

/// Discovers eligible tasks and applies the completion transition.
#[async_trait]
pub trait WorkFinder<T: Task>: Send + Sync {
    /// Tasks currently eligible under `name`. Returns an empty list, not an
    /// error, when nothing is eligible.
    async fn find_requested(&self, name: &str) -> Result<Vec<T>>;

    /// Move the task's backing record out of the eligible set so the next
    /// discovery call does not return it again.
    async fn mark_completed(&self, task: &T) -> Result<()>;

    /// Record a failed execution. Records left untouched stay eligible and
    /// are retried on the next tick.
    async fn mark_failed(&self, _task: &T, _error: &Error, _retryable: bool) -> Result<()> {
        Ok(())
    }
}
