//! # corepool
//!
//! Concurrent task-execution engine: a bounded task queue served by a pool
//! of OS worker threads that grows under load, pins workers to CPU cores
//! on a best-effort basis, and drains completely on `stop()`.
//!
//! Also provides typed configuration (env + TOML) and OpenTelemetry
//! observability for processes embedding the engine.

pub mod affinity;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod monitor;
pub mod pool;
pub mod queue;
pub mod stats;
pub mod task;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{Engine, EngineState};
pub use error::{Error, Result};
pub use task::{CancelToken, Task, TaskId, TaskOutcome};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Task panics are caught before they reach any engine lock, so poisoning
/// only happens on an engine bug; the guarded state is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
