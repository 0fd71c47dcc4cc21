//! Bounded result cache with least-recently-used eviction
//!
//! Keys are SHA-256 digests of the normalized original comment, so the map
//! never stores request text. All bookkeeping lives behind one lock; the
//! recency index and the entry map move together.

use nameguard_core::DetectionResult;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Shared LRU cache of finished detection results
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    tick: u64,
    hits: u64,
    misses: u64,
}

struct Entry {
    result: DetectionResult,
    last_used: u64,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
                hits: 0,
                misses: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Look up a comment, refreshing its recency on a hit
    pub fn get(&self, comment: &str) -> Option<DetectionResult> {
        let key = cache_key(comment);
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        match inner.entries.get_mut(&key) {
            Some(entry) => {
                let stale = entry.last_used;
                entry.last_used = tick;
                let result = entry.result.clone();
                inner.recency.remove(&stale);
                inner.recency.insert(tick, key);
                inner.hits += 1;
                Some(result)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a result, evicting the least recently used entry at capacity
    pub fn put(&self, comment: &str, result: DetectionResult) {
        let key = cache_key(comment);
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(previous) = inner.entries.remove(&key) {
            inner.recency.remove(&previous.last_used);
        } else if inner.entries.len() >= self.capacity {
            if let Some((&oldest, _)) = inner.recency.iter().next() {
                if let Some(victim) = inner.recency.remove(&oldest) {
                    inner.entries.remove(&victim);
                }
            }
        }

        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Entry {
                result,
                last_used: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Digest of the trimmed, case-folded comment
fn cache_key(comment: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(comment.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(tier: u8) -> DetectionResult {
        DetectionResult::no_name(1.0, tier)
    }

    #[test]
    fn test_hit_returns_stored_result() {
        let cache = ResultCache::new(8);
        assert!(cache.get("Переказ коштів").is_none());

        cache.put("Переказ коштів", result(1));
        let hit = cache.get("Переказ коштів").unwrap();
        assert_eq!(hit.tier_used, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_key_normalization() {
        let cache = ResultCache::new(8);
        cache.put("  Зарплата  ", result(1));
        assert!(cache.get("зарплата").is_some());
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = ResultCache::new(2);
        cache.put("a", result(1));
        cache.put("b", result(1));

        // Touch "a" so "b" becomes the eviction victim
        assert!(cache.get("a").is_some());
        cache.put("c", result(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let cache = ResultCache::new(2);
        cache.put("a", result(1));
        cache.put("a", result(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().tier_used, 2);
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(4);
        cache.put("a", result(1));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
