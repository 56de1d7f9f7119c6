//! Bounded cache of nearest-city results.
//!
//! Eviction follows insertion order, not access order: a lookup never
//! refreshes an entry's position, and the entry evicted at capacity is
//! always the single oldest insertion. Queries repeated within the same
//! leaf cell are the common case in geotagging runs (bursts of photos from
//! one spot), and insertion-order eviction keeps the bookkeeping to one
//! queue.

use crate::cell::CellAddress;
use crate::types::NearestCity;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Cache fingerprint: the query's leaf cell plus the visit-history flag.
///
/// Keying by cell rather than raw coordinates folds floating-point jitter
/// within one leaf cell onto a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cell: CellAddress,
    pub want_visits: bool,
}

/// Bounded insertion-ordered cache.
#[derive(Debug)]
pub struct NearestCache {
    entries: FxHashMap<CacheKey, NearestCity>,
    /// Insertion order of the live keys, used purely for eviction.
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl NearestCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be greater than zero");
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Look up a cached result. Never changes eviction order.
    pub fn get(&self, key: &CacheKey) -> Option<&NearestCity> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a result, evicting the oldest entry when the cache is full.
    ///
    /// Returns true when an eviction happened. Re-inserting a known key
    /// replaces the value without touching the order.
    pub fn insert(&mut self, key: CacheKey, value: NearestCity) -> bool {
        if self.entries.insert(key, value).is_some() {
            return false;
        }

        self.order.push_back(key);

        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                return true;
            }
        }

        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CityRecord;

    fn key(lat: f64, lon: f64, want_visits: bool) -> CacheKey {
        CacheKey {
            cell: CellAddress::from_coordinates(lat, lon).unwrap(),
            want_visits,
        }
    }

    fn result(city: &str) -> NearestCity {
        NearestCity {
            source_name: "GeoNames".to_string(),
            record: CityRecord {
                id: "1".to_string(),
                country: "United States".to_string(),
                province_state: "MI".to_string(),
                city: city.to_string(),
                population: 1000,
                latitude: 42.0,
                longitude: -83.0,
            },
            visits: Vec::new(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = NearestCache::new(4);
        let k = key(42.0, -83.0, false);

        assert!(cache.get(&k).is_none());
        assert!(!cache.insert(k, result("Clawson")));
        assert_eq!(cache.get(&k).unwrap().record.city, "Clawson");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_visit_flag_is_part_of_the_fingerprint() {
        let mut cache = NearestCache::new(4);
        cache.insert(key(42.0, -83.0, false), result("a"));

        assert!(cache.get(&key(42.0, -83.0, true)).is_none());
    }

    #[test]
    fn test_eviction_is_insertion_ordered() {
        let mut cache = NearestCache::new(2);
        let k1 = key(42.0, -83.0, false);
        let k2 = key(43.0, -84.0, false);
        let k3 = key(44.0, -85.0, false);

        assert!(!cache.insert(k1, result("one")));
        assert!(!cache.insert(k2, result("two")));
        assert!(cache.insert(k3, result("three")));

        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lookup_does_not_refresh_order() {
        // This is insertion-order eviction, not access-order LRU: reading
        // the oldest entry does not save it.
        let mut cache = NearestCache::new(2);
        let k1 = key(42.0, -83.0, false);
        let k2 = key(43.0, -84.0, false);
        let k3 = key(44.0, -85.0, false);

        cache.insert(k1, result("one"));
        cache.insert(k2, result("two"));
        assert!(cache.get(&k1).is_some());

        cache.insert(k3, result("three"));
        assert!(cache.get(&k1).is_none());
    }

    #[test]
    fn test_reinsert_replaces_without_growing() {
        let mut cache = NearestCache::new(2);
        let k1 = key(42.0, -83.0, false);

        assert!(!cache.insert(k1, result("one")));
        assert!(!cache.insert(k1, result("one again")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&k1).unwrap().record.city, "one again");
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = NearestCache::new(1);
        let k1 = key(42.0, -83.0, false);
        let k2 = key(43.0, -84.0, false);

        assert!(!cache.insert(k1, result("one")));
        assert!(cache.insert(k2, result("two")));
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
    }

    #[test]
    #[should_panic(expected = "cache capacity must be greater than zero")]
    fn test_zero_capacity_panics() {
        NearestCache::new(0);
    }
}
