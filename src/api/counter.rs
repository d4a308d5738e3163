// Caller-owned per-key row counter backing `GetRowNumber`.
// Safe to share across threads; each key counts 1, 2, 3, ... until `reset`.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct RowCounter {
    counts: Mutex<HashMap<String, u64>>,
}

impl RowCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, key: &str) -> u64 {
        let mut counts = self.lock();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Last value handed out for `key`, or 0.
    pub fn current(&self, key: &str) -> u64 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    // A panicking holder cannot leave the map half-updated, so poison is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::RowCounter;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_per_key_from_one() {
        let counter = RowCounter::new();
        assert_eq!(counter.next("orders"), 1);
        assert_eq!(counter.next("orders"), 2);
        assert_eq!(counter.next("lines"), 1);
        assert_eq!(counter.next("orders"), 3);
        assert_eq!(counter.current("orders"), 3);
        assert_eq!(counter.current("missing"), 0);
    }

    #[test]
    fn reset_starts_over() {
        let counter = RowCounter::new();
        counter.next("k");
        counter.next("k");
        counter.reset();
        assert_eq!(counter.next("k"), 1);
    }

    #[test]
    fn concurrent_callers_never_share_a_value() {
        let counter = Arc::new(RowCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..250).map(|_| counter.next("k")).collect::<Vec<_>>())
            })
            .collect();
        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("join"))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=1000).collect::<Vec<_>>());
    }
}
