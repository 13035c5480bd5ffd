//! Cache keyed by a normalized alternate key (e.g. email).
//!
//! # Invariants
//! - At most one entry per normalized key.
//! - `None` results and loader errors are never stored.
//! - A miss that overlaps an eviction does not store its result.

use log::debug;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Case-folds a secondary key so differently cased lookups share one slot.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

struct CacheState<V> {
    entries: HashMap<String, V>,
    /// Bumped by every eviction; a miss only stores if it saw no bump.
    generation: u64,
}

/// Thread-safe alternate-key cache.
///
/// Owned by the runtime and shared by reference; there is no global instance.
pub struct AlternateKeyCache<V> {
    name: &'static str,
    state: RwLock<CacheState<V>>,
}

impl<V: Clone> AlternateKeyCache<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the cached value or loads, stores and returns it.
    ///
    /// `loader` receives the normalized key and is not invoked on a hit.
    ///
    /// # Errors
    /// - Returns the loader error unchanged; nothing is cached in that case.
    pub fn get<E>(
        &self,
        key: &str,
        loader: impl FnOnce(&str) -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        let key = normalize_key(key);
        let observed_generation = {
            let state = self.read();
            if let Some(value) = state.entries.get(&key) {
                debug!(
                    "event=cache_get module=cache cache={} status=hit key_len={}",
                    self.name,
                    key.len()
                );
                return Ok(Some(value.clone()));
            }
            state.generation
        };

        let loaded = loader(&key)?;
        let Some(value) = loaded else {
            debug!(
                "event=cache_get module=cache cache={} status=miss_absent key_len={}",
                self.name,
                key.len()
            );
            return Ok(None);
        };

        let mut state = self.write();
        if state.generation == observed_generation {
            state.entries.insert(key.clone(), value.clone());
            debug!(
                "event=cache_get module=cache cache={} status=miss_stored key_len={}",
                self.name,
                key.len()
            );
        } else {
            debug!(
                "event=cache_get module=cache cache={} status=miss_raced_eviction key_len={}",
                self.name,
                key.len()
            );
        }
        Ok(Some(value))
    }

    /// Removes the entry for `key`; returns whether one was present.
    ///
    /// Idempotent: evicting an absent key is a no-op.
    pub fn evict(&self, key: &str) -> bool {
        let key = normalize_key(key);
        let mut state = self.write();
        state.generation = state.generation.wrapping_add(1);
        let removed = state.entries.remove(&key).is_some();
        debug!(
            "event=cache_evict module=cache cache={} removed={} key_len={}",
            self.name,
            removed,
            key.len()
        );
        removed
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut state = self.write();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
        debug!("event=cache_clear module=cache cache={}", self.name);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().entries.contains_key(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    // The map is never left half-updated by a panic, so a poisoned lock is
    // still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, CacheState<V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState<V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_key, AlternateKeyCache};
    use std::cell::Cell;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::thread;

    fn ok(value: Option<u32>) -> Result<Option<u32>, Infallible> {
        Ok(value)
    }

    #[test]
    fn normalize_key_folds_case_and_whitespace() {
        assert_eq!(normalize_key(" A@X.com "), "a@x.com");
    }

    #[test]
    fn hit_does_not_invoke_loader() {
        let cache = AlternateKeyCache::new("test");
        let first = cache.get("a@x.com", |_| ok(Some(1))).unwrap();
        let calls = Cell::new(0);
        let second = cache
            .get("a@x.com", |_| {
                calls.set(calls.get() + 1);
                ok(Some(2))
            })
            .unwrap();

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(1));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn differently_cased_keys_share_one_slot() {
        let cache = AlternateKeyCache::new("test");
        cache.get("A@X.com", |key| {
            assert_eq!(key, "a@x.com");
            ok(Some(1))
        })
        .unwrap();
        assert_eq!(cache.get("a@x.COM", |_| ok(Some(9))).unwrap(), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evict_forces_reload_and_is_idempotent() {
        let cache = AlternateKeyCache::new("test");
        cache.get("a@x.com", |_| ok(Some(1))).unwrap();

        assert!(cache.evict("a@x.com"));
        assert!(!cache.evict("a@x.com"));
        assert!(cache.is_empty());

        let calls = Cell::new(0);
        let reloaded = cache
            .get("a@x.com", |_| {
                calls.set(calls.get() + 1);
                ok(Some(2))
            })
            .unwrap();
        assert_eq!(reloaded, Some(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn absent_results_are_not_cached() {
        let cache = AlternateKeyCache::<u32>::new("test");
        assert_eq!(cache.get("missing@x.com", |_| ok(None)).unwrap(), None);
        assert!(!cache.contains("missing@x.com"));
    }

    #[test]
    fn loader_failure_propagates_uncached() {
        let cache = AlternateKeyCache::<u32>::new("test");
        let err = cache
            .get("a@x.com", |_| Err::<Option<u32>, _>("store down"))
            .unwrap_err();
        assert_eq!(err, "store down");
        assert!(cache.is_empty());
    }

    #[test]
    fn miss_overlapping_eviction_is_not_stored() {
        let cache = AlternateKeyCache::new("test");
        let value = cache
            .get("a@x.com", |key| {
                // A concurrent write evicts while the loader is running.
                cache.evict(key);
                ok(Some(1))
            })
            .unwrap();

        assert_eq!(value, Some(1));
        assert!(!cache.contains("a@x.com"));
    }

    #[test]
    fn clear_drops_all_entries() {
        let cache = AlternateKeyCache::new("test");
        cache.get("a@x.com", |_| ok(Some(1))).unwrap();
        cache.get("b@x.com", |_| ok(Some(2))).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_get_and_evict_keep_map_consistent() {
        let cache = Arc::new(AlternateKeyCache::new("test"));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for round in 0..200u32 {
                        let key = format!("user{}@x.com", round % 4);
                        if (round + worker) % 3 == 0 {
                            cache.evict(&key);
                        } else {
                            let value = cache.get(&key, |_| ok(Some(round % 4))).unwrap();
                            assert_eq!(value, Some(round % 4));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 4);
    }
}
