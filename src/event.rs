//! Structured scale-up events recorded by the worker pool.
//!
//! The pool appends one event per growth step. The history is how callers
//! and tests observe that the pool grew, when, and why.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single growth step of the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleEvent {
    /// Monotonic sequence number, starting at 1 per engine.
    pub seq: u64,
    /// When the new workers were spawned.
    pub at: DateTime<Utc>,
    /// Worker count before the step.
    pub from: usize,
    /// Worker count after the step.
    pub to: usize,
    /// What asked for the growth.
    pub trigger: ScaleTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleTrigger {
    /// A submission found the queue full.
    Reactive,
    /// The load monitor saw occupancy above half capacity.
    Monitor,
}

impl ScaleTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleTrigger::Reactive => "reactive",
            ScaleTrigger::Monitor => "monitor",
        }
    }
}

impl std::fmt::Display for ScaleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
