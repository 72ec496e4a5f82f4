//! In-process execution counters.
//!
//! Atomics shared by workers and the engine façade. OTel instruments in
//! [`crate::telemetry::metrics`] mirror these for export.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::task::TaskOutcome;

#[derive(Debug, Default)]
pub struct EngineStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    deadline_exceeded: AtomicU64,
    scale_ups: AtomicU64,
}

impl EngineStats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: &TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Completed => &self.completed,
            TaskOutcome::Failed(_) => &self.failed,
            TaskOutcome::Panicked(_) => &self.panicked,
            TaskOutcome::DeadlineExceeded => &self.deadline_exceeded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scale_up(&self) {
        self.scale_ups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            scale_ups: self.scale_ups.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
    pub deadline_exceeded: u64,
    pub scale_ups: u64,
}

impl StatsSnapshot {
    /// Tasks that reached a terminal outcome, whatever it was.
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.panicked + self.deadline_exceeded
    }
}
