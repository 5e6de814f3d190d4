use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Bounded memo of reachability results, least recently used evicted first
#[derive(Debug)]
pub struct ReachabilityCache {
    entries: Mutex<LruCache<String, bool>>,
}

impl ReachabilityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up a result, marking it as recently used
    pub fn get(&self, url: &str) -> Option<bool> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
    }

    pub fn put(&self, url: impl Into<String>, reachable: bool) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(url.into(), reachable);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ReachabilityCache::new(2);
        cache.put("a", true);
        cache.put("b", false);

        // touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(true));
        cache.put("c", true);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(true));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(true));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = ReachabilityCache::new(0);
        cache.put("a", true);
        cache.put("b", true);
        assert_eq!(cache.len(), 1);
    }
}
