//! Load monitor: a background thread that samples queue occupancy on a
//! fixed tick and asks the pool to grow when the queue is over half full.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, error};

use crate::error::Result;
use crate::event::ScaleTrigger;
use crate::pool::{WorkerPool, scaling};
use crate::queue::TaskQueue;

/// Handle to the running monitor thread.
pub struct LoadMonitor {
    /// Dropping the sender disconnects the channel and ends the loop.
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LoadMonitor {
    pub fn spawn(queue: Arc<TaskQueue>, pool: Arc<WorkerPool>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        let handle = thread::Builder::new()
            .name("corepool-monitor".to_string())
            .spawn(move || run(&queue, &pool, interval, &shutdown_rx))?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the loop to exit and wait for it.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("load monitor thread panicked");
            }
        }
    }
}

impl Drop for LoadMonitor {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn run(queue: &TaskQueue, pool: &WorkerPool, interval: Duration, shutdown: &Receiver<()>) {
    let ticker = crossbeam_channel::tick(interval);
    debug!(interval_ms = interval.as_millis() as u64, "load monitor started");

    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(ticker) -> _ => {
                if queue.is_closed() {
                    break;
                }
                // Sampled without the pool lock; `scale` takes it itself.
                let (len, capacity) = (queue.len(), queue.capacity());
                if scaling::over_threshold(len, capacity) {
                    let added = pool.scale(ScaleTrigger::Monitor);
                    debug!(len, capacity, added, "queue over threshold");
                }
            }
        }
    }

    debug!("load monitor exiting");
}
