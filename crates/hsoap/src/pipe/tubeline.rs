// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordered chain of tubes.

use super::tube::Tube;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// An ordered chain of tubes, traversed forward on request and backward on
/// response.
///
/// Every [`copy`](Tubeline::copy) gets a fresh instance id, which makes
/// "the same clone was handed out twice" observable in tests and logs.
pub struct Tubeline {
    instance_id: u64,
    tubes: Vec<Box<dyn Tube>>,
}

impl Tubeline {
    /// Build a tubeline from tubes in request order.
    pub fn new(tubes: Vec<Box<dyn Tube>>) -> Self {
        Self {
            instance_id: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            tubes,
        }
    }

    /// Identity of this clone.
    #[inline]
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Number of tubes.
    #[inline]
    pub fn len(&self) -> usize {
        self.tubes.len()
    }

    /// Whether the tubeline has no tube.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty()
    }

    /// Tube names in request order.
    pub fn names(&self) -> Vec<&str> {
        self.tubes.iter().map(|t| t.name()).collect()
    }

    /// Deep copy: every tube is copied, the clone gets a new instance id.
    pub fn copy(&self) -> Tubeline {
        Tubeline::new(self.tubes.iter().map(|t| t.copy()).collect())
    }

    /// Call `pre_destroy` on every tube in request order.
    pub fn pre_destroy(&mut self) {
        for tube in &mut self.tubes {
            log::debug!("[tubeline] pre-destroy {}", tube.name());
            tube.pre_destroy();
        }
    }

    pub(crate) fn tube_mut(&mut self, index: usize) -> Option<&mut (dyn Tube + 'static)> {
        self.tubes.get_mut(index).map(|t| t.as_mut())
    }
}

impl std::fmt::Debug for Tubeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tubeline")
            .field("instance_id", &self.instance_id)
            .field("tubes", &self.names())
            .finish()
    }
}
