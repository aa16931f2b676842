// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serial engine queue: FIFO, single-slot, unbounded tail.
//!
//! All heavy work (ASR, separation, transcode, zip) is serialized globally
//! through one of these, no matter how many transport requests enqueue
//! concurrently. Jobs and batches share the same queue. There is no cancel
//! primitive here; cancellation is cooperative through record-level flags
//! checked between stages and items.

use futures_util::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Waiting / in-flight counters, surfaced on job status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    running: AtomicUsize,
}

/// Handle resolved when a submitted task completes.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task's result. `None` if the queue shut down before
    /// the task ran.
    pub async fn done(self) -> Option<T> {
        self.rx.await.ok()
    }
}

/// The single-slot task executor.
#[derive(Clone)]
pub struct SerialQueue {
    tx: mpsc::UnboundedSender<Task>,
    counters: Arc<Counters>,
}

impl SerialQueue {
    /// Create the queue and spawn its worker loop.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let counters = Arc::new(Counters::default());
        let loop_counters = counters.clone();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                loop_counters.pending.fetch_sub(1, Ordering::AcqRel);
                loop_counters.running.store(1, Ordering::Release);
                // A task must not take the queue down with it; record the
                // wreckage and move on to the next one.
                if let Err(panic) = std::panic::AssertUnwindSafe(task).catch_unwind().await {
                    let msg = panic_message(&panic);
                    tracing::error!(panic = %msg, "engine task panicked; queue continues");
                }
                loop_counters.running.store(0, Ordering::Release);
            }
        });
        Self { tx, counters }
    }

    /// Enqueue an async unit of work; tasks run in submission order, one
    /// at a time. Queue depth is unbounded — flow control is the caller's
    /// concern.
    pub fn submit<F, T>(&self, fut: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let task: Task = Box::pin(async move {
            let result = fut.await;
            let _ = done_tx.send(result);
        });
        self.counters.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(task).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::error!("engine queue worker is gone; task dropped");
        }
        TaskHandle { rx: done_rx }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.counters.pending.load(Ordering::Acquire),
            running: self.counters.running.load(Ordering::Acquire),
        }
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
