use serde::Serialize;
use std::collections::BTreeMap;

/// Read-only view of the process-lifetime counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Documents returned by `get` and `query` calls
    pub documents_fetched: u64,
    /// Write operations committed through batches
    pub documents_written: u64,
    /// Subscriptions ever created (cumulative)
    pub subscriptions_created: u64,
    /// Live backend listeners currently attached
    pub active_subscriptions: usize,
    /// Subscriber count per fingerprint for the active listeners
    pub subscribers_per_fingerprint: BTreeMap<String, usize>,
}
