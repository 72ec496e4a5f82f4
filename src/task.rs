//! Task model.
//!
//! A task is an opaque unit of work. The engine never looks inside it: it
//! hands the body a cancellation handle, runs it once, records how it
//! ended and drops it.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Boxed task body. Receives the cancellation handle for its execution.
pub type TaskFn = Box<dyn FnOnce(&CancelToken) -> anyhow::Result<()> + Send + 'static>;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work submitted to the engine.
pub struct Task {
    pub(crate) id: TaskId,
    /// Time budget for this task. Overrides the engine-wide default.
    pub(crate) deadline: Option<Duration>,
    pub(crate) body: TaskFn,
}

impl Task {
    /// Create a cancellation-aware, fallible task.
    ///
    /// A returned `Err` is logged and counted as a failure. Long-running
    /// bodies should poll [`CancelToken::is_cancelled`] when a deadline
    /// may apply.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&CancelToken) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            id: TaskId::new(),
            deadline: None,
            body: Box::new(f),
        }
    }

    /// Wrap a plain closure that neither fails nor observes cancellation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move |_| {
            f();
            Ok(())
        })
    }

    /// Set a per-task deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Newtype for task IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation handle passed to every task body.
///
/// Reports cancelled once the task's deadline instant has passed. The
/// worker still waits for the body to return.
#[derive(Debug, Clone)]
pub struct CancelToken {
    deadline: Option<Instant>,
}

impl CancelToken {
    pub(crate) fn new(budget: Option<Duration>) -> Self {
        Self {
            deadline: budget.map(|d| Instant::now() + d),
        }
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::new(None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The instant after which the task is considered late, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a single task execution ended. Recorded, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    /// The body returned an error.
    Failed(String),
    /// The body panicked; caught at the worker boundary.
    Panicked(String),
    /// The body returned after its deadline had passed.
    DeadlineExceeded,
}

impl TaskOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Panicked(_) => "panicked",
            TaskOutcome::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOutcome::Completed => write!(f, "completed"),
            TaskOutcome::Failed(e) => write!(f, "failed: {e}"),
            TaskOutcome::Panicked(msg) => write!(f, "panicked: {msg}"),
            TaskOutcome::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}
