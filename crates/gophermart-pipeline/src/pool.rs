use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An owned unit of work: process one order number.
pub type Task = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A fixed-size pool of workers consuming `Task`s off a small bounded
/// hand-off channel.
///
/// `mpsc` has no true zero-capacity rendezvous; a capacity-1 channel is
/// used instead, which still blocks `submit` until a worker is free to
/// make progress (the backpressure this pool exists to provide).
pub struct Pool {
    sender: std::sync::Mutex<Option<mpsc::Sender<Task>>>,
    closed: Arc<AtomicBool>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Spawn `size` workers pulling from a capacity-1 hand-off channel.
    pub fn spawn(size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let closed = Arc::new(AtomicBool::new(false));

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move { worker_loop(id, receiver).await })
            })
            .collect();

        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            closed,
            workers: tokio::sync::Mutex::new(workers),
        }
    }

    /// Enqueue a task. Blocks until a worker is free to dequeue it.
    ///
    /// Never fails visibly: a send error can only happen after
    /// `shutdown` has closed the channel, and is logged and swallowed.
    pub async fn submit(&self, task: Task) {
        let sender = self.sender.lock().expect("pool sender mutex poisoned").clone();
        match sender {
            Some(sender) => {
                if sender.send(task).await.is_err() {
                    warn!("task submitted after pool shutdown, dropped");
                }
            }
            None => warn!("task submitted after pool shutdown, dropped"),
        }
    }

    /// Close the channel so workers drain remaining tasks and exit.
    /// Idempotent. Takes `&self` so a single `Pool` can be shared (via
    /// `Arc`) between the Submission Hook, the Supervisor, and Lifecycle.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sender
            .lock()
            .expect("pool sender mutex poisoned")
            .take();
        debug!("worker pool shutting down");
    }

    /// Await every worker's `JoinHandle`, isolating any panic to a log
    /// line. Idempotent: a second call finds an empty worker list and
    /// returns immediately.
    pub async fn join(&self) {
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for (id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(worker = id, error = %e, "worker task panicked");
            }
        }
    }
}

async fn worker_loop(id: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Task>>>) {
    debug!(worker = id, "worker started");
    loop {
        let task = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };
        let Some(task) = task else {
            break;
        };
        // Isolate a panicking task from the worker loop by running it on
        // its own spawned task and awaiting the JoinHandle.
        let handle = tokio::spawn(task());
        if let Err(e) = handle.await {
            warn!(worker = id, error = %e, "task panicked");
        }
    }
    debug!(worker = id, "worker drained, exiting");
}
