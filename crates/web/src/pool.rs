//! Fixed-size worker pool fed through a bounded hand-off queue.
//!
//! Every worker blocks on the shared receiver, serves one connection for its whole
//! lifetime, then waits for the next. Stopping pushes one [`WorkItem::Stop`] per worker
//! and joins them all.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

pub(crate) enum WorkItem<C> {
    Connection(C),
    Stop,
}

type Serve<C> = Arc<dyn Fn(C) + Send + Sync>;

pub struct WorkerPool<C> {
    sender: SyncSender<WorkItem<C>>,
    workers: Vec<JoinHandle<()>>,
}

impl<C> std::fmt::Debug for WorkerPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("workers", &self.workers.len()).finish_non_exhaustive()
    }
}

impl<C: Send + 'static> WorkerPool<C> {
    /// Spawns `workers` threads running `serve` for each connection handed to the pool.
    ///
    /// # Errors
    ///
    /// Returns the spawn error; threads started before it are stopped again.
    pub fn new<F>(workers: usize, queue_capacity: usize, serve: F) -> io::Result<Self>
    where
        F: Fn(C) + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let serve: Serve<C> = Arc::new(serve);

        let mut pool = Self { sender, workers: Vec::with_capacity(workers) };
        for id in 0..workers {
            let receiver = Arc::clone(&receiver);
            let serve = Arc::clone(&serve);

            let handle = thread::Builder::new()
                .name(format!("http-worker-{id}"))
                .spawn(move || worker_loop(id, &receiver, serve.as_ref()))?;
            pool.workers.push(handle);
        }

        info!(workers, queue_capacity, "worker pool started");
        Ok(pool)
    }

    /// Queues a connection without blocking; a full queue hands it back.
    pub fn try_dispatch(&self, connection: C) -> Result<(), C> {
        try_send(&self.sender, connection)
    }

    /// A handle the listener thread uses to offer connections
    pub fn dispatcher(&self) -> Dispatcher<C> {
        Dispatcher { sender: self.sender.clone() }
    }
}

/// Sending side of the hand-off queue
pub struct Dispatcher<C> {
    sender: SyncSender<WorkItem<C>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<C> Dispatcher<C> {
    /// Queues a connection without blocking; a full queue hands it back.
    pub fn try_dispatch(&self, connection: C) -> Result<(), C> {
        try_send(&self.sender, connection)
    }
}

fn try_send<C>(sender: &SyncSender<WorkItem<C>>, connection: C) -> Result<(), C> {
    sender.try_send(WorkItem::Connection(connection)).map_err(|e| match e {
        TrySendError::Full(item) | TrySendError::Disconnected(item) => match item {
            WorkItem::Connection(connection) => connection,
            WorkItem::Stop => unreachable!("only connections are offered here"),
        },
    })
}

impl<C> WorkerPool<C> {
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Wakes every worker with a stop item and waits for all of them to exit.
    ///
    /// Connections queued before the stop items are still served.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        for _ in 0..self.workers.len() {
            if self.sender.send(WorkItem::Stop).is_err() {
                break;
            }
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
        info!("worker pool stopped");
    }
}

impl<C> Drop for WorkerPool<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<C>(id: usize, receiver: &Mutex<Receiver<WorkItem<C>>>, serve: &(dyn Fn(C) + Send + Sync)) {
    debug!(id, "worker started");
    loop {
        let item = receiver.lock().unwrap_or_else(PoisonError::into_inner).recv();

        match item {
            Ok(WorkItem::Connection(connection)) => {
                if panic::catch_unwind(AssertUnwindSafe(|| serve(connection))).is_err() {
                    error!(id, "connection handler panicked");
                }
            }
            Ok(WorkItem::Stop) | Err(_) => break,
        }
    }
    debug!(id, "worker stopped");
}
