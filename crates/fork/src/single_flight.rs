//! Deduplicates concurrent fetches of the same key: if two threads ask for the same account at
//! the same moment, only one JSON-RPC round trip happens and both callers observe its result.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use std::hash::Hash;

pub struct SingleFlight<K, V> {
    inflight: DashMap<K, Arc<OnceLock<V>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Runs `fetch` at most once per key among concurrent callers; every caller for the same key
    /// blocks on the same `OnceLock` and receives the same value. The slot is removed from the
    /// table once `fetch` resolves so a later call (after the result has been memoized by the
    /// caller elsewhere) re-fetches rather than serving a stale cached value forever.
    pub fn run(&self, key: K, fetch: impl FnOnce() -> V) -> V {
        let slot = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();
        let value = slot.get_or_init(fetch).clone();
        self.inflight.remove_if(&key, |_, existing| Arc::ptr_eq(existing, &slot));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[test]
    fn concurrent_callers_for_same_key_share_one_fetch() {
        let flight: StdArc<SingleFlight<u32, u32>> = StdArc::new(SingleFlight::default());
        let calls = StdArc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(std::thread::spawn(move || {
                flight.run(42, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    99
                })
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
