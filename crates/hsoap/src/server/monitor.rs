// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-endpoint request counters and the registry exporting them.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Live counters of one endpoint.
#[derive(Debug, Default)]
pub struct EndpointStats {
    requests: AtomicU64,
    responses: AtomicU64,
    faults: AtomicU64,
    one_way: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of [`EndpointStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStatsSnapshot {
    pub requests: u64,
    pub responses: u64,
    pub faults: u64,
    pub one_way: u64,
    pub in_flight: u64,
}

impl EndpointStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn request_started(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Account a finished request: fault, one-way (no message) or response.
    pub(crate) fn request_finished(&self, fault: bool, has_message: bool) {
        let counter = if fault {
            &self.faults
        } else if !has_message {
            &self.one_way
        } else {
            &self.responses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        // Never below zero even if a completion is reported twice.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> EndpointStatsSnapshot {
        EndpointStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            responses: self.responses.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            one_way: self.one_way.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Endpoint name to counters.
///
/// Endpoints register on build and unregister on dispose.
#[derive(Debug, Default)]
pub struct MonitoringRegistry {
    endpoints: DashMap<String, Arc<EndpointStats>>,
}

impl MonitoringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by endpoints unless one is supplied.
    pub fn global() -> Arc<MonitoringRegistry> {
        static GLOBAL: OnceLock<Arc<MonitoringRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MonitoringRegistry::new())))
    }

    /// Register `name`; an existing entry is replaced.
    pub fn register(&self, name: impl Into<String>) -> Arc<EndpointStats> {
        let name = name.into();
        let stats = Arc::new(EndpointStats::new());
        if self.endpoints.insert(name.clone(), Arc::clone(&stats)).is_some() {
            log::warn!("[monitor] endpoint '{}' registered twice, replacing", name);
        } else {
            log::debug!("[monitor] registered '{}'", name);
        }
        stats
    }

    /// Remove `name`; returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.endpoints.remove(name).is_some();
        if removed {
            log::debug!("[monitor] unregistered '{}'", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<EndpointStats>> {
        self.endpoints.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Snapshots of all endpoints, sorted by name.
    pub fn snapshot_all(&self) -> Vec<(String, EndpointStatsSnapshot)> {
        let mut all: Vec<_> = self
            .endpoints
            .iter()
            .map(|e| (e.key().clone(), e.value().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = EndpointStats::new();
        stats.request_started();
        stats.request_started();
        stats.request_started();
        stats.request_finished(false, true);
        stats.request_finished(true, true);

        let snap = stats.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.responses, 1);
        assert_eq!(snap.faults, 1);
        assert_eq!(snap.in_flight, 1);

        stats.request_finished(false, false);
        stats.request_finished(false, false);
        let snap = stats.snapshot();
        assert_eq!(snap.one_way, 2);
        assert_eq!(snap.in_flight, 0);
    }

    #[test]
    fn test_registry() {
        let registry = MonitoringRegistry::new();
        let stats = registry.register("calc");
        stats.request_started();
        registry.register("admin");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("calc").map(|s| s.snapshot().requests), Some(1));
        let names: Vec<_> = registry.snapshot_all().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["admin", "calc"]);

        assert!(registry.unregister("calc"));
        assert!(!registry.unregister("calc"));
        assert!(registry.get("calc").is_none());
    }
}
