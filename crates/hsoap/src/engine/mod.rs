// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fiber dispatch engine.
//!
//! An [`Engine`] creates [`Fiber`]s and runs their asynchronous segments on
//! a replaceable [`Executor`]. The default executor is a named thread pool
//! created on first use.

mod executor;
mod fiber;

pub use executor::{Executor, InlineExecutor, Task, ThreadPoolExecutor};
pub use fiber::{
    Completion, CompletionCallback, Fiber, FiberContext, FiberContextSwitchInterceptor,
    FiberHandle, FiberState, ReleaseHook,
};

use crate::pipe::Tubeline;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct EngineInner {
    id: String,
    executor: RwLock<Option<Arc<dyn Executor>>>,
    next_fiber: AtomicU64,
}

/// Fiber factory and executor owner. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Engine using the default thread pool (created lazily).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                id: id.into(),
                executor: RwLock::new(None),
                next_fiber: AtomicU64::new(1),
            }),
        }
    }

    /// Engine using `executor`.
    pub fn with_executor(id: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        let engine = Self::new(id);
        engine.set_executor(executor);
        engine
    }

    /// Engine id (used in worker thread names).
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Replace the executor; fibers already queued keep the previous one.
    pub fn set_executor(&self, executor: Arc<dyn Executor>) {
        *self.inner.executor.write() = Some(executor);
        log::debug!("[engine] {} executor replaced", self.inner.id);
    }

    /// Current executor, creating the default pool on first use.
    pub fn executor(&self) -> Arc<dyn Executor> {
        if let Some(executor) = self.inner.executor.read().as_ref() {
            return Arc::clone(executor);
        }
        let mut slot = self.inner.executor.write();
        if let Some(executor) = slot.as_ref() {
            return Arc::clone(executor);
        }
        let executor: Arc<dyn Executor> = match ThreadPoolExecutor::with_defaults(&self.inner.id) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                log::warn!(
                    "[engine] {} cannot start worker threads ({}), running fibers inline",
                    self.inner.id,
                    e
                );
                Arc::new(InlineExecutor)
            }
        };
        *slot = Some(Arc::clone(&executor));
        executor
    }

    /// New fiber driving `tubeline`.
    pub fn create_fiber(&self, tubeline: Tubeline) -> Fiber {
        let id = self.inner.next_fiber.fetch_add(1, Ordering::Relaxed);
        Fiber::new(self.clone(), id, tubeline)
    }

    pub(crate) fn submit(&self, task: Task) {
        self.executor().execute(task);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("id", &self.inner.id).finish()
    }
}
