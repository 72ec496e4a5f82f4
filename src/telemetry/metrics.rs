//! Metric instruments for corepool.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without a provider the instruments are no-ops, so engines built in
//! tests or libraries pay nothing for them.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

use crate::event::ScaleTrigger;
use crate::task::TaskOutcome;

/// Returns the shared meter for corepool instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("corepool")
}

/// Counter: tasks accepted into the queue.
pub fn tasks_submitted() -> Counter<u64> {
    meter()
        .u64_counter("corepool.tasks.submitted")
        .with_description("Number of tasks accepted into the queue")
        .build()
}

/// Counter: tasks that reached an outcome.
/// Labels: `outcome` ("completed" | "failed" | "panicked" | "deadline_exceeded").
pub fn tasks_finished() -> Counter<u64> {
    meter()
        .u64_counter("corepool.tasks.finished")
        .with_description("Number of tasks that reached an outcome")
        .build()
}

/// Counter: scale-up steps that added at least one worker.
/// Labels: `trigger` ("reactive" | "monitor").
pub fn scale_ups() -> Counter<u64> {
    meter()
        .u64_counter("corepool.pool.scale_ups")
        .with_description("Scale-up steps applied to the worker pool")
        .build()
}

/// Histogram: task execution time in milliseconds, as observed by the worker.
pub fn task_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("corepool.task.duration_ms")
        .with_description("Task execution duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Instruments built once per engine and shared by its workers.
#[derive(Clone)]
pub struct EngineInstruments {
    submitted: Counter<u64>,
    finished: Counter<u64>,
    scale_ups: Counter<u64>,
    duration_ms: Histogram<f64>,
}

impl EngineInstruments {
    pub fn new() -> Self {
        Self {
            submitted: tasks_submitted(),
            finished: tasks_finished(),
            scale_ups: scale_ups(),
            duration_ms: task_duration_ms(),
        }
    }

    pub fn task_submitted(&self) {
        self.submitted.add(1, &[]);
    }

    pub fn task_finished(&self, outcome: &TaskOutcome, duration_ms: f64) {
        let attrs = [KeyValue::new("outcome", outcome.label())];
        self.finished.add(1, &attrs);
        self.duration_ms.record(duration_ms, &attrs);
    }

    pub fn scaled_up(&self, trigger: ScaleTrigger) {
        self.scale_ups
            .add(1, &[KeyValue::new("trigger", trigger.as_str())]);
    }
}

impl Default for EngineInstruments {
    fn default() -> Self {
        Self::new()
    }
}
