use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::output::Inventory;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    inventory: Inventory,
    computed_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.computed_at) <= self.ttl
    }
}

/// Single-slot memo of the last classification.
///
/// Readers get a clone, so a returned record is never touched by a later
/// write.
#[derive(Debug)]
pub struct DetectionCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
}

impl DetectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// The stored record if it has not expired. Expired entries are left in
    /// place and overwritten by the next `set`.
    pub fn get(&self) -> Option<Inventory> {
        let now = Instant::now();
        let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.inventory.clone())
    }

    pub fn set(&self, inventory: Inventory) {
        let entry = CacheEntry {
            inventory,
            computed_at: Instant::now(),
            ttl: self.ttl,
        };
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    pub fn invalidate(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn inventory(runtime: &str) -> Inventory {
        Inventory {
            runtime: runtime.to_string(),
            ..Inventory::fallback()
        }
    }

    #[test]
    fn test_empty_cache_misses() {
        assert!(DetectionCache::default().get().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let cache = DetectionCache::default();
        cache.set(inventory("docker"));
        assert_eq!(cache.get().unwrap().runtime, "docker");
    }

    #[test]
    fn test_set_replaces_entry() {
        let cache = DetectionCache::default();
        cache.set(inventory("docker"));
        cache.set(inventory("podman"));
        assert_eq!(cache.get().unwrap().runtime, "podman");
    }

    #[test]
    fn test_entry_expires() {
        let cache = DetectionCache::new(Duration::from_millis(20));
        cache.set(inventory("docker"));
        assert!(cache.get().is_some());

        thread::sleep(Duration::from_millis(40));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = DetectionCache::default();
        cache.set(inventory("docker"));
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_concurrent_readers_see_whole_records() {
        let cache = Arc::new(DetectionCache::default());
        cache.set(inventory("docker"));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..100 {
                        if i == 0 {
                            cache.set(inventory("podman"));
                        }
                        let runtime = cache.get().unwrap().runtime;
                        assert!(runtime == "docker" || runtime == "podman");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
