//! Worker thread: pin, then take-execute-repeat until the queue is closed
//! and drained.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

use crate::affinity::Affinity;
use crate::stats::EngineStats;
use crate::task::{CancelToken, Task, TaskFn, TaskOutcome};
use crate::telemetry::metrics::EngineInstruments;
use crate::telemetry::task::{record_outcome, start_task_span};

/// Everything a worker needs, shared by all workers of one engine.
pub(crate) struct WorkerContext {
    pub(crate) rx: Receiver<Task>,
    pub(crate) affinity: Arc<dyn Affinity>,
    pub(crate) stats: Arc<EngineStats>,
    pub(crate) instruments: EngineInstruments,
    /// Applied to tasks that carry no deadline of their own.
    pub(crate) default_deadline: Option<Duration>,
    /// Worker threads that have not exited yet.
    pub(crate) live: AtomicUsize,
}

/// Decrements the live-worker count when the worker thread ends.
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Worker thread body. The caller has already counted this worker as live.
pub(crate) fn run(index: usize, ctx: Arc<WorkerContext>) {
    let _live = LiveGuard(&ctx.live);

    match ctx.affinity.pin_current(index) {
        Ok(core) => debug!(worker = index, core, "worker pinned"),
        Err(e) => warn!(worker = index, error = %e, "cpu pinning failed, running unpinned"),
    }

    while let Ok(task) = ctx.rx.recv() {
        execute(index, &ctx, task);
    }

    debug!(worker = index, "queue closed and drained, worker exiting");
}

fn execute(index: usize, ctx: &WorkerContext, task: Task) {
    let Task { id, deadline, body } = task;
    let budget = deadline.or(ctx.default_deadline);

    let span = start_task_span(&id, index);
    let _enter = span.enter();
    let start = Instant::now();

    let token = CancelToken::new(budget);
    let outcome = run_with_token(body, &token);

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    record_outcome(&span, &outcome);
    match &outcome {
        TaskOutcome::Completed => debug!(task = %id, elapsed_ms, "task completed"),
        TaskOutcome::Failed(e) => warn!(task = %id, elapsed_ms, error = %e, "task failed"),
        TaskOutcome::Panicked(msg) => error!(task = %id, elapsed_ms, panic = %msg, "task panicked"),
        TaskOutcome::DeadlineExceeded => warn!(
            task = %id,
            elapsed_ms,
            budget_ms = budget.map(|b| b.as_millis() as u64),
            "task deadline exceeded"
        ),
    }

    ctx.stats.record_outcome(&outcome);
    ctx.instruments.task_finished(&outcome, elapsed_ms);
}

/// Run a body on the current thread. Panics stop here.
fn run_guarded(body: TaskFn, token: &CancelToken) -> TaskOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| body(token))) {
        Ok(Ok(())) => TaskOutcome::Completed,
        Ok(Err(e)) => TaskOutcome::Failed(format!("{e:#}")),
        Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
    }
}

/// Run a body inline under its token. A body that returns after the token
/// expired is late, whatever it returned; a panic is still a panic.
fn run_with_token(body: TaskFn, token: &CancelToken) -> TaskOutcome {
    match run_guarded(body, token) {
        TaskOutcome::Panicked(msg) => TaskOutcome::Panicked(msg),
        _ if token.is_cancelled() => TaskOutcome::DeadlineExceeded,
        outcome => outcome,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
