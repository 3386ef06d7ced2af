//! Process-lifetime usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for reads and writes. Subscription counters live in the
/// subscription registry; the client combines both into a
/// [`crate::models::StatsSnapshot`].
#[derive(Debug, Default)]
pub struct Stats {
    documents_fetched: AtomicU64,
    documents_written: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self, count: u64) {
        self.documents_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_written(&self, count: u64) {
        self.documents_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn documents_fetched(&self) -> u64 {
        self.documents_fetched.load(Ordering::Relaxed)
    }

    pub fn documents_written(&self) -> u64 {
        self.documents_written.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = Stats::new();
        stats.record_fetched(3);
        stats.record_fetched(2);
        stats.record_written(1);
        assert_eq!(stats.documents_fetched(), 5);
        assert_eq!(stats.documents_written(), 1);
    }
}
