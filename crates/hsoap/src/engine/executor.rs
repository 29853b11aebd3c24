// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Executors that run asynchronous fiber segments.

use crate::config::{DEFAULT_EXECUTOR_QUEUE, DEFAULT_EXECUTOR_THREADS};
use crate::error::{Error, Result};
use crossbeam::channel::{self, Sender, TrySendError};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Id of the pool owning the current thread (0 outside any pool).
    static WORKER_OF: Cell<u64> = const { Cell::new(0) };
}

/// Unit of work submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks, usually on other threads.
pub trait Executor: Send + Sync {
    /// Run `task` eventually. Must not drop it.
    fn execute(&self, task: Task);
}

impl<F> Executor for F
where
    F: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        self(task)
    }
}

/// Runs every task on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Fixed pool of named worker threads fed by a bounded channel.
///
/// `execute` blocks while the queue is full, except on the pool's own
/// workers: a worker submitting to a full queue runs the task itself, since
/// nothing else would drain it. After shutdown, tasks run on the submitting
/// thread so no completion is ever lost.
pub struct ThreadPoolExecutor {
    id: u64,
    name: String,
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPoolExecutor {
    /// Pool with the default size.
    pub fn with_defaults(name: &str) -> Result<Self> {
        Self::new(name, DEFAULT_EXECUTOR_THREADS, DEFAULT_EXECUTOR_QUEUE)
    }

    /// Pool of `threads` workers named `{name}-{n}` with a queue of `queue` tasks.
    pub fn new(name: &str, threads: usize, queue: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::Config("executor needs at least one thread".into()));
        }
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel::bounded::<Task>(queue.max(1));
        let mut workers = Vec::with_capacity(threads);
        for n in 0..threads {
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", name, n))
                .spawn(move || {
                    WORKER_OF.with(|w| w.set(id));
                    while let Ok(task) = rx.recv() {
                        task();
                    }
                })?;
            workers.push(handle);
        }
        log::debug!("[executor] {} started with {} threads", name, threads);
        Ok(Self {
            id,
            name: name.to_string(),
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    /// Stop accepting tasks and join the workers (queued tasks still run).
    ///
    /// Calling it from a worker thread does not join that worker.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let current = std::thread::current().id();
        for handle in self.workers.lock().drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
        log::debug!("[executor] {} stopped", self.name);
    }
}

impl ThreadPoolExecutor {
    fn on_worker(&self) -> bool {
        WORKER_OF.with(Cell::get) == self.id
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) {
        let sender = self.sender.lock().clone();
        let Some(tx) = sender else {
            task();
            return;
        };
        let task = match tx.try_send(task) {
            Ok(()) => return,
            Err(TrySendError::Full(task)) if self.on_worker() => {
                log::trace!("[executor] {} queue full, running task on worker", self.name);
                task();
                return;
            }
            Err(TrySendError::Full(task)) => task,
            Err(TrySendError::Disconnected(task)) => {
                log::warn!("[executor] {} disconnected, running task inline", self.name);
                task();
                return;
            }
        };
        if let Err(err) = tx.send(task) {
            log::warn!("[executor] {} disconnected, running task inline", self.name);
            (err.into_inner())();
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        // Workers exit once the channel is closed; they are not joined here
        // because the last reference may be dropped on a worker.
        self.sender.lock().take();
    }
}
