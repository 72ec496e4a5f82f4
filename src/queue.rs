//! Bounded task queue: the single hand-off between producers and workers.
//!
//! Backed by a `crossbeam-channel` bounded channel. Closing drops the
//! queue's sender; workers keep receiving until the buffer is empty and
//! every in-flight producer has released its sender clone.

use std::sync::Mutex;

use crossbeam_channel::{Receiver, SendError, Sender, TrySendError};

use crate::lock;
use crate::task::Task;

pub struct TaskQueue {
    tx: Mutex<Option<Sender<Task>>>,
    rx: Receiver<Task>,
    capacity: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            capacity,
        }
    }

    /// Enqueue a task, blocking while the queue is full.
    ///
    /// Tries a non-blocking send first. When the queue is full `on_full`
    /// runs once before the blocking send, which lets the caller grow the
    /// pool that drains this queue. Returns the task back if the queue is
    /// closed.
    pub fn push<F>(&self, task: Task, on_full: F) -> Result<(), Task>
    where
        F: FnOnce(),
    {
        // Clone out so a blocked producer never holds the lock `close` needs.
        let Some(tx) = lock(&self.tx).clone() else {
            return Err(task);
        };

        match tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) => {
                on_full();
                tx.send(task).map_err(|SendError(task)| task)
            }
            Err(TrySendError::Disconnected(task)) => Err(task),
        }
    }

    /// Stop accepting tasks. Already queued tasks stay drainable.
    pub fn close(&self) {
        lock(&self.tx).take();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.tx).is_none()
    }

    /// A receiving handle for a worker.
    pub(crate) fn receiver(&self) -> Receiver<Task> {
        self.rx.clone()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
