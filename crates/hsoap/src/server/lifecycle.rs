// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Disposed flag plus ordered shutdown hooks.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

type DisposeHook = Box<dyn FnOnce() + Send>;

/// Endpoint lifecycle.
///
/// Hooks run once, in reverse registration order, on the first
/// [`Lifecycle::dispose`] call.
#[derive(Default)]
pub struct Lifecycle {
    disposed: AtomicBool,
    hooks: Mutex<Vec<(&'static str, DisposeHook)>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named shutdown hook.
    ///
    /// A hook added after disposal runs immediately.
    pub fn on_dispose(&self, name: &'static str, hook: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            run_hook(name, Box::new(hook));
            return;
        }
        self.hooks.lock().push((name, Box::new(hook)));
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// `Err(Error::Disposed)` once disposed.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Run the hooks; returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hooks = std::mem::take(&mut *self.hooks.lock());
        for (name, hook) in hooks.into_iter().rev() {
            run_hook(name, hook);
        }
        true
    }
}

fn run_hook(name: &'static str, hook: DisposeHook) {
    log::debug!("[lifecycle] dispose hook '{}'", name);
    if catch_unwind(AssertUnwindSafe(hook)).is_err() {
        log::error!("[lifecycle] dispose hook '{}' panicked", name);
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("disposed", &self.is_disposed())
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_dispose_runs_hooks_once_in_reverse() {
        let lifecycle = Lifecycle::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            lifecycle.on_dispose(name, move || order.lock().push(name));
        }

        assert!(lifecycle.ensure_active().is_ok());
        assert!(lifecycle.dispose());
        assert!(!lifecycle.dispose());
        assert_eq!(*order.lock(), vec!["second", "first"]);
        assert!(matches!(lifecycle.ensure_active(), Err(Error::Disposed)));
    }

    #[test]
    fn test_panicking_hook_does_not_stop_others() {
        let lifecycle = Lifecycle::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        lifecycle.on_dispose("survivor", move || flag.store(true, Ordering::SeqCst));
        lifecycle.on_dispose("boom", || panic!("hook failure"));

        assert!(lifecycle.dispose());
        assert!(ran.load(Ordering::SeqCst));
    }
}
