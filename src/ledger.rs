//! Scan-wide bookkeeping: dedup sets and summary counters.
//!
//! A `ScanLedger` is created at scan start, threaded through the walker,
//! and dropped when the scan ends. Class names and container origins are
//! recorded with test-and-set semantics so "processed at most once, first
//! discovery wins" holds even when synthesis fans out across threads.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ScanLedger {
    classes: Mutex<HashSet<String>>,
    containers: Mutex<HashSet<String>>,
    containers_scanned: AtomicUsize,
    routable_units: AtomicUsize,
    endpoints: AtomicUsize,
}

impl ScanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a qualified name is seen; duplicates are
    /// the caller's cue to skip silently.
    pub fn mark_class(&self, qualified_name: &str) -> bool {
        self.classes
            .lock()
            .expect("class ledger poisoned")
            .insert(qualified_name.to_string())
    }

    /// Returns true the first time a container origin is seen, and counts it.
    pub fn mark_container(&self, origin: &str) -> bool {
        let fresh = self
            .containers
            .lock()
            .expect("container ledger poisoned")
            .insert(origin.to_string());
        if fresh {
            self.containers_scanned.fetch_add(1, Ordering::Relaxed);
        }
        fresh
    }

    pub fn record_routable_unit(&self) {
        self.routable_units.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_endpoints(&self, count: usize) {
        self.endpoints.fetch_add(count, Ordering::Relaxed);
    }

    pub fn containers_scanned(&self) -> usize {
        self.containers_scanned.load(Ordering::Relaxed)
    }

    pub fn routable_units(&self) -> usize {
        self.routable_units.load(Ordering::Relaxed)
    }

    pub fn endpoints(&self) -> usize {
        self.endpoints.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_class_is_first_wins() {
        let ledger = ScanLedger::new();
        assert!(ledger.mark_class("com.example.A"));
        assert!(!ledger.mark_class("com.example.A"));
        assert!(ledger.mark_class("com.example.B"));
    }

    #[test]
    fn mark_container_counts_unique_origins() {
        let ledger = ScanLedger::new();
        assert!(ledger.mark_container("/tmp/app.jar"));
        assert!(!ledger.mark_container("/tmp/app.jar"));
        assert!(ledger.mark_container("/tmp/app.jar!BOOT-INF/lib/dep.jar"));
        assert_eq!(ledger.containers_scanned(), 2);
    }

    #[test]
    fn counters_accumulate() {
        let ledger = ScanLedger::new();
        ledger.record_routable_unit();
        ledger.record_endpoints(3);
        ledger.record_endpoints(2);
        assert_eq!(ledger.routable_units(), 1);
        assert_eq!(ledger.endpoints(), 5);
    }
}
