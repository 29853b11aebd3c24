// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free object pools for per-request resources.
//!
//! A [`Pool`] hands out items wrapped in [`Pooled`], which remembers the
//! issuing pool. Items go back with [`Pool::recycle`] after a clean run or
//! are dropped with [`Pool::discard`] after a failure, so state left behind
//! by a failed request is never reused.
//!
//! [`PoolCell`] holds the current pool of an endpoint behind an `ArcSwap`:
//! reconfiguration swaps in a fresh pool atomically, every operation reads
//! one snapshot, and items issued by a replaced pool are discarded on return.

use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use crossbeam::queue::SegQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// An item on loan from a [`Pool`].
#[derive(Debug)]
pub struct Pooled<T> {
    item: T,
    pool_id: u64,
}

impl<T> Pooled<T> {
    /// Re-associate an item unwrapped with [`Pooled::into_inner`].
    pub(crate) fn from_parts(item: T, pool_id: u64) -> Self {
        Self { item, pool_id }
    }

    /// Id of the issuing pool.
    #[inline]
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Unwrap, giving up the pool association.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items created by the factory.
    pub created: u64,
    /// Items returned for reuse.
    pub recycled: u64,
    /// Items dropped instead of reused.
    pub discarded: u64,
    /// Items currently idle in the pool.
    pub idle: usize,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Unbounded pool of reusable items, created on demand by a factory.
pub struct Pool<T> {
    id: u64,
    items: SegQueue<T>,
    factory: Factory<T>,
    created: AtomicU64,
    recycled: AtomicU64,
    discarded: AtomicU64,
}

impl<T> Pool<T> {
    /// Create an empty pool.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            items: SegQueue::new(),
            factory: Box::new(factory),
            created: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Pool identity.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take an idle item, or create one.
    ///
    /// An item is never handed to two borrowers at once.
    pub fn take(&self) -> Pooled<T> {
        let item = match self.items.pop() {
            Some(item) => item,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            }
        };
        Pooled {
            item,
            pool_id: self.id,
        }
    }

    /// Return an item for reuse.
    ///
    /// Fails with [`Error::PoolMismatch`] (and drops the item) if this pool
    /// did not issue it.
    pub fn recycle(&self, item: Pooled<T>) -> Result<()> {
        if item.pool_id != self.id {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return Err(Error::PoolMismatch {
                issued_by: item.pool_id,
                returned_to: self.id,
            });
        }
        self.recycled.fetch_add(1, Ordering::Relaxed);
        self.items.push(item.item);
        Ok(())
    }

    /// Drop an item instead of reusing it.
    pub fn discard(&self, item: Pooled<T>) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        drop(item);
    }

    /// Idle items.
    pub fn idle(&self) -> usize {
        self.items.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle: self.items.len(),
        }
    }
}

/// Atomically replaceable pool reference.
pub struct PoolCell<T> {
    current: ArcSwap<Pool<T>>,
}

impl<T> PoolCell<T> {
    /// Cell holding `pool`.
    pub fn new(pool: Pool<T>) -> Self {
        Self {
            current: ArcSwap::from_pointee(pool),
        }
    }

    /// Snapshot of the current pool.
    pub fn pool(&self) -> Arc<Pool<T>> {
        self.current.load_full()
    }

    /// Take an item from the current pool.
    pub fn take(&self) -> Pooled<T> {
        self.current.load().take()
    }

    /// Return an item; items of a replaced pool are discarded.
    pub fn recycle(&self, item: Pooled<T>) {
        let pool = self.current.load();
        if item.pool_id() == pool.id() {
            // Ids match, cannot fail.
            let _ = pool.recycle(item);
        } else {
            log::debug!(
                "[pool] discarding item of replaced pool {} (current {})",
                item.pool_id(),
                pool.id()
            );
            pool.discard(item);
        }
    }

    /// Discard an item (failed request).
    pub fn discard(&self, item: Pooled<T>) {
        self.current.load().discard(item);
    }

    /// Swap in a fresh pool; returns the previous one.
    pub fn replace(&self, pool: Pool<T>) -> Arc<Pool<T>> {
        let previous = self.current.swap(Arc::new(pool));
        log::debug!("[pool] replaced pool {}", previous.id());
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_pool() -> Pool<usize> {
        let next = Arc::new(AtomicUsize::new(0));
        Pool::new(move || next.fetch_add(1, Ordering::Relaxed))
    }

    #[test]
    fn test_take_reuses_recycled_item() {
        let pool = counting_pool();
        let a = pool.take();
        assert_eq!(*a, 0);
        pool.recycle(a).unwrap();
        assert_eq!(*pool.take(), 0);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_discarded_item_never_returns() {
        let pool = counting_pool();
        let a = pool.take();
        pool.discard(a);
        assert_eq!(*pool.take(), 1);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[test]
    fn test_recycle_into_foreign_pool_fails() {
        let p1 = counting_pool();
        let p2 = counting_pool();
        let item = p1.take();
        let err = p2.recycle(item).unwrap_err();
        assert!(matches!(err, Error::PoolMismatch { issued_by, returned_to }
            if issued_by == p1.id() && returned_to == p2.id()));
        assert_eq!(p2.idle(), 0);
    }

    #[test]
    fn test_cell_discards_items_of_replaced_pool() {
        let cell = PoolCell::new(counting_pool());
        let outstanding = cell.take();
        let old = cell.replace(counting_pool());

        cell.recycle(outstanding);
        assert_eq!(old.idle(), 0);
        assert_eq!(cell.pool().idle(), 0);
        assert_eq!(cell.pool().stats().discarded, 1);

        let fresh = cell.take();
        cell.recycle(fresh);
        assert_eq!(cell.pool().idle(), 1);
    }
}
