//! Write-then-evict coordination for alternate-key cached entities.
//!
//! # Invariants
//! - Eviction runs after the write returns, in the same call, before the
//!   caller sees the result.
//! - Eviction runs whether the write succeeded or failed.
//! - New keys are never pre-warmed; they repopulate on the next lookup.

use crate::cache::AlternateKeyCache;
use log::debug;
use std::sync::Arc;

pub struct WriteCoordinator<V> {
    cache: Arc<AlternateKeyCache<V>>,
}

impl<V: Clone> WriteCoordinator<V> {
    pub fn new(cache: Arc<AlternateKeyCache<V>>) -> Self {
        Self { cache }
    }

    /// Runs `write`, then evicts every key in `evict_keys`.
    pub fn commit<T, E>(
        &self,
        evict_keys: &[&str],
        write: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let result = write();
        let mut evicted = 0usize;
        for key in evict_keys {
            if self.cache.evict(key) {
                evicted += 1;
            }
        }
        debug!(
            "event=write_commit module=service cache={} status={} keys={} evicted={}",
            self.cache.name(),
            if result.is_ok() { "ok" } else { "error" },
            evict_keys.len(),
            evicted
        );
        result
    }
}
