//! Engine façade. The public API for starting, feeding and draining the
//! worker pool.
//!
//! The engine owns the queue, the pool and the load monitor. Lifecycle is
//! `Created → Started → Stopping → Stopped`, each step taken exactly once.

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{error, info};

use crate::affinity::{Affinity, CoreAffinity, NoAffinity};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::event::{ScaleEvent, ScaleTrigger};
use crate::lock;
use crate::monitor::LoadMonitor;
use crate::pool::WorkerPool;
use crate::pool::worker::WorkerContext;
use crate::queue::TaskQueue;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::task::{Task, TaskId};
use crate::telemetry::metrics::EngineInstruments;

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Constructed; nothing spawned.
    Created,
    /// Workers and monitor running; accepting tasks.
    Started,
    /// Intake closed; draining.
    Stopping,
    /// Every worker exited. Terminal.
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineState::Created => "created",
            EngineState::Started => "started",
            EngineState::Stopping => "stopping",
            EngineState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// The task engine. One per workload; several may coexist in a process.
pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
    queue: Arc<TaskQueue>,
    pool: Arc<WorkerPool>,
    stats: Arc<EngineStats>,
    instruments: EngineInstruments,
    monitor: Mutex<Option<LoadMonitor>>,
}

impl Engine {
    /// Validate the configuration and build an engine. Spawns nothing.
    ///
    /// Workers pin to cores when `config.pin_workers` is set.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let affinity: Arc<dyn Affinity> = if config.pin_workers {
            Arc::new(CoreAffinity)
        } else {
            Arc::new(NoAffinity)
        };
        Self::with_affinity(config, affinity)
    }

    /// Build an engine with a custom pinning strategy.
    pub fn with_affinity(config: EngineConfig, affinity: Arc<dyn Affinity>) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(TaskQueue::new(config.queue_capacity));
        let stats = Arc::new(EngineStats::default());
        let instruments = EngineInstruments::new();
        let ctx = WorkerContext {
            rx: queue.receiver(),
            affinity,
            stats: Arc::clone(&stats),
            instruments: instruments.clone(),
            default_deadline: config.task_deadline,
            live: AtomicUsize::new(0),
        };
        let pool = Arc::new(WorkerPool::new(config.max_workers, ctx));

        Ok(Self {
            config,
            state: Mutex::new(EngineState::Created),
            queue,
            pool,
            stats,
            instruments,
            monitor: Mutex::new(None),
        })
    }

    /// Spawn the initial workers and the load monitor.
    ///
    /// Valid once, from `Created`. If a thread cannot be spawned the engine
    /// drains whatever started and ends `Stopped`.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state != EngineState::Created {
            return Err(Error::InvalidState {
                op: "start",
                state: *state,
            });
        }

        let started = self.pool.spawn_initial(self.config.initial_workers).and_then(|()| {
            LoadMonitor::spawn(
                Arc::clone(&self.queue),
                Arc::clone(&self.pool),
                self.config.monitor_interval,
            )
        });

        match started {
            Ok(monitor) => {
                *lock(&self.monitor) = Some(monitor);
                *state = EngineState::Started;
                info!(
                    initial_workers = self.config.initial_workers,
                    max_workers = self.config.max_workers,
                    queue_capacity = self.config.queue_capacity,
                    "engine started"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "engine failed to start, draining");
                self.drain();
                *state = EngineState::Stopped;
                Err(e)
            }
        }
    }

    /// Enqueue a task.
    ///
    /// Blocks while the queue is full, after asking the pool to grow. A
    /// task is delayed under overload, never dropped.
    ///
    /// # Errors
    ///
    /// [`Error::SubmissionRejected`] once `stop` has been called;
    /// [`Error::InvalidState`] before `start`.
    pub fn add_task(&self, task: Task) -> Result<TaskId> {
        let state = *lock(&self.state);
        match state {
            EngineState::Started => {}
            EngineState::Created => {
                return Err(Error::InvalidState {
                    op: "add a task",
                    state,
                });
            }
            EngineState::Stopping | EngineState::Stopped => {
                return Err(Error::SubmissionRejected(state));
            }
        }

        let id = task.id();
        self.queue
            .push(task, || {
                self.pool.scale(ScaleTrigger::Reactive);
            })
            .map_err(|_| Error::SubmissionRejected(*lock(&self.state)))?;

        self.stats.record_submitted();
        self.instruments.task_submitted();
        Ok(id)
    }

    /// Close intake and block until every queued and running task is done
    /// and every worker thread has exited.
    pub fn stop(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                EngineState::Started => *state = EngineState::Stopping,
                EngineState::Created => {
                    self.queue.close();
                    *state = EngineState::Stopped;
                    return Ok(());
                }
                other => {
                    return Err(Error::InvalidState {
                        op: "stop",
                        state: other,
                    });
                }
            }
        }

        info!(queued = self.queue.len(), "engine stopping, draining queue");
        self.drain();
        *lock(&self.state) = EngineState::Stopped;

        let stats = self.stats.snapshot();
        info!(
            submitted = stats.submitted,
            completed = stats.completed,
            failed = stats.failed,
            panicked = stats.panicked,
            deadline_exceeded = stats.deadline_exceeded,
            workers = self.pool.worker_count(),
            "engine stopped"
        );
        Ok(())
    }

    /// Close the queue, stop the monitor, join every worker.
    fn drain(&self) {
        self.queue.close();

        let monitor = lock(&self.monitor).take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }

        // Closing the pool first means no worker can appear after this list.
        for handle in self.pool.close() {
            if handle.join().is_err() {
                error!("worker thread panicked outside task isolation");
            }
        }
    }

    /// Workers spawned so far. Never decreases, never exceeds `max_workers`.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Worker threads still running. Zero once `stop` returns.
    pub fn live_workers(&self) -> usize {
        self.pool.live_workers()
    }

    pub fn max_workers(&self) -> usize {
        self.config.max_workers
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Every scale-up step so far, oldest first.
    pub fn scale_history(&self) -> Vec<ScaleEvent> {
        self.pool.history()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state() == EngineState::Started {
            if let Err(e) = self.stop() {
                error!(error = %e, "engine drop failed to stop cleanly");
            }
        }
    }
}
