//! Task execution span helpers.
//!
//! Provides span creation and outcome recording for tasks flowing
//! through a worker.

use tracing::Span;

use crate::task::{TaskId, TaskOutcome};

/// Start a span for one task execution on worker `worker`.
///
/// The `task.outcome` field is declared empty and filled by
/// [`record_outcome`].
pub fn start_task_span(task_id: &TaskId, worker: usize) -> Span {
    tracing::info_span!(
        "task.execute",
        "task.id" = %task_id.0,
        "worker.index" = worker,
        "task.outcome" = tracing::field::Empty,
    )
}

/// Record how the task ended on its span.
pub fn record_outcome(span: &Span, outcome: &TaskOutcome) {
    span.record("task.outcome", outcome.label());
}
