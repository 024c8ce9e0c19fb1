//! Shared FIFO job queue.
//!
//! A thin wrapper over a `tokio::sync::mpsc` channel whose receiver sits
//! behind an async mutex so any number of workers can block on [`pop`].
//! Submission order is preserved; nothing is ever re-queued.
//!
//! Cancellation closes the queue from the consumers' point of view: a
//! `pop` blocked on an empty (or even non-empty) queue observes the
//! cancelled token and returns `None`, so workers stop picking up jobs
//! while in-flight ones finish.
//!
//! [`pop`]: JobQueue::pop

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::job::QueueItem;

/// Bounded FIFO of jobs and termination sentinels.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<QueueItem>,
    rx: Arc<Mutex<mpsc::Receiver<QueueItem>>>,
    cancel: CancellationToken,
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// The supervisor enqueues every job plus one sentinel per worker
    /// before spawning anything, so `capacity` must cover the whole run.
    pub fn with_capacity(capacity: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            cancel,
        }
    }

    /// Enqueues an item, waiting if the queue is at capacity.
    ///
    /// Returns `false` if no consumer remains to receive it.
    pub async fn push(&self, item: QueueItem) -> bool {
        self.tx.send(item).await.is_ok()
    }

    /// Dequeues the next item, blocking until one is available.
    ///
    /// Returns `None` when the run has been cancelled; a `Sentinel` is
    /// the normal end-of-work signal.
    pub async fn pop(&self) -> Option<QueueItem> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,
            item = rx.recv() => item,
        }
    }
}
