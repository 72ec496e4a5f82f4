//! Worker pool: owns the running workers and the authoritative worker
//! count. Grows under the scaling policy, never shrinks.

pub mod scaling;
pub(crate) mod worker;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use tracing::{error, info};

use crate::error::Result;
use crate::event::{ScaleEvent, ScaleTrigger};
use crate::lock;

use self::worker::WorkerContext;

/// Mutable pool state. Every field changes only under the pool lock.
struct PoolState {
    /// Workers spawned so far. Monotonically non-decreasing, at most `max_workers`.
    current: usize,
    /// Affinity index for the next worker. Never reused.
    next_index: usize,
    handles: Vec<JoinHandle<()>>,
    history: Vec<ScaleEvent>,
    /// Set at shutdown; growth is refused afterwards.
    closed: bool,
}

pub struct WorkerPool {
    state: Mutex<PoolState>,
    max_workers: usize,
    ctx: Arc<WorkerContext>,
}

impl WorkerPool {
    pub(crate) fn new(max_workers: usize, ctx: WorkerContext) -> Self {
        Self {
            state: Mutex::new(PoolState {
                current: 0,
                next_index: 0,
                handles: Vec::new(),
                history: Vec::new(),
                closed: false,
            }),
            max_workers,
            ctx: Arc::new(ctx),
        }
    }

    /// Spawn the initial worker set. Fails if any thread cannot be created.
    pub(crate) fn spawn_initial(&self, count: usize) -> Result<()> {
        let mut state = lock(&self.state);
        let count = count.min(self.max_workers.saturating_sub(state.current));
        for _ in 0..count {
            self.spawn_one(&mut state)?;
        }
        info!(workers = state.current, max = self.max_workers, "initial workers spawned");
        Ok(())
    }

    /// Apply the scaling policy once. Returns how many workers were added.
    ///
    /// A no-op at the ceiling or after shutdown began.
    pub fn scale(&self, trigger: ScaleTrigger) -> usize {
        let mut state = lock(&self.state);
        if state.closed {
            return 0;
        }

        let wanted = scaling::increment(state.current, self.max_workers);
        if wanted == 0 {
            return 0;
        }

        let from = state.current;
        for _ in 0..wanted {
            if let Err(e) = self.spawn_one(&mut state) {
                error!(error = %e, "failed to spawn worker during scale-up");
                break;
            }
        }

        let added = state.current - from;
        if added > 0 {
            let seq = state.history.len() as u64 + 1;
            let to = state.current;
            state.history.push(ScaleEvent {
                seq,
                at: Utc::now(),
                from,
                to,
                trigger,
            });
            self.ctx.stats.record_scale_up();
            self.ctx.instruments.scaled_up(trigger);
            info!(%trigger, from, to, max = self.max_workers, "scaled workers");
        }
        added
    }

    fn spawn_one(&self, state: &mut PoolState) -> Result<()> {
        let index = state.next_index;
        let ctx = Arc::clone(&self.ctx);

        self.ctx.live.fetch_add(1, Ordering::AcqRel);
        let spawned = thread::Builder::new()
            .name(format!("corepool-worker-{index}"))
            .spawn(move || worker::run(index, ctx));

        match spawned {
            Ok(handle) => {
                state.next_index += 1;
                state.current += 1;
                state.handles.push(handle);
                Ok(())
            }
            Err(e) => {
                self.ctx.live.fetch_sub(1, Ordering::AcqRel);
                Err(e.into())
            }
        }
    }

    /// Refuse further growth and hand back every worker handle for joining.
    pub(crate) fn close(&self) -> Vec<JoinHandle<()>> {
        let mut state = lock(&self.state);
        state.closed = true;
        std::mem::take(&mut state.handles)
    }

    /// Workers spawned over the pool's lifetime.
    pub fn worker_count(&self) -> usize {
        lock(&self.state).current
    }

    /// Worker threads that have not exited yet.
    pub fn live_workers(&self) -> usize {
        self.ctx.live.load(Ordering::Acquire)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn history(&self) -> Vec<ScaleEvent> {
        lock(&self.state).history.clone()
    }
}
