//! Document id generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces collection-unique ids for documents added without one.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator: nanosecond timestamp plus a process-local counter, so
/// ids stay unique even when two are drawn in the same instant.
#[derive(Debug, Default)]
pub struct TimestampIdGenerator {
    counter: AtomicU64,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn generate(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("doc_{}_{}", nanos, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let gen = TimestampIdGenerator::new();
        let a = gen.generate();
        let b = gen.generate();
        assert_ne!(a, b);
        assert!(a.starts_with("doc_"));
    }
}
