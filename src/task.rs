//! Task polling utilities
//!
//! Helpers for polling tasks spawned on the tokio runtime from a
//! non-async frame loop.

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};

/// Result of polling a task
pub enum PollResult<T> {
    /// No task to poll (task was None)
    NoTask,
    /// Task is still running
    Pending,
    /// Task completed with result (may be Ok or join error)
    Complete(Result<T, JoinError>),
}

/// Poll an optional task handle and return its result if finished.
///
/// # Example
/// ```ignore
/// match poll_task(&mut self.task) {
///     PollResult::Complete(Ok(Ok(value))) => { /* success */ }
///     PollResult::Complete(Ok(Err(e))) => { /* task returned error */ }
///     PollResult::Complete(Err(e)) => { /* task panicked */ }
///     PollResult::Pending | PollResult::NoTask => {}
/// }
/// ```
pub fn poll_task<T>(task: &mut Option<JoinHandle<T>>) -> PollResult<T> {
    let Some(handle) = task else {
        return PollResult::NoTask;
    };

    if !handle.is_finished() {
        return PollResult::Pending;
    }

    let Some(handle) = task.take() else {
        return PollResult::NoTask;
    };
    match handle.now_or_never() {
        Some(result) => PollResult::Complete(result),
        None => {
            // Shouldn't happen since we checked is_finished()
            tracing::warn!("Task not ready despite is_finished()");
            PollResult::Pending
        }
    }
}

/// Remove every finished task from `tasks` and return their results,
/// in the order the handles were stored. Unfinished tasks stay in place.
pub fn drain_finished<T>(tasks: &mut Vec<JoinHandle<T>>) -> Vec<Result<T, JoinError>> {
    let mut results = Vec::new();
    let mut pending = Vec::with_capacity(tasks.len());

    for handle in tasks.drain(..) {
        if !handle.is_finished() {
            pending.push(handle);
            continue;
        }
        let mut handle = handle;
        match (&mut handle).now_or_never() {
            Some(result) => results.push(result),
            None => {
                tracing::warn!("Task not ready despite is_finished()");
                pending.push(handle);
            }
        }
    }

    *tasks = pending;
    results
}
