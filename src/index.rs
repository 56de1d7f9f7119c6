//! The city index: population-biased nearest-city resolution over a
//! hierarchical cell index.
//!
//! Loading files every record under its leaf cell token and under every
//! ancestor token down to the configured minimum search level, so a city is
//! reachable by bucket lookup at each of those precisions. A query walks
//! the same levels finest to coarsest: the first non-empty bucket freezes
//! the local cluster of nearest candidates, urban centers keep
//! accumulating across all coarser levels, and the winner is picked by
//! great-circle distance, urban centers first and the local cluster as
//! the fallback.
//!
//! # Thread safety
//!
//! The index is single-writer, read-heavy: run [`CityIndex::load`] to
//! completion before sharing the index across query threads.
//! [`CityIndex::nearest`] takes `&self`; its cache and statistics live
//! behind one mutex, so the whole miss path runs under a single lock.

use crate::cache::{CacheKey, NearestCache};
use crate::cell::CellAddress;
use crate::config::Config;
use crate::error::{GeoAnchorError, Result};
use crate::source::CityRecordSource;
use crate::spatial::nearest_point_index;
use crate::storage::{FileStore, KeyGroup, MemoryStore, RecordStore, StoreKey};
use crate::types::{CityRecord, IndexEntry, IndexStats, NearestCity, VisitHistoryItem};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::{BufRead, Write};

/// Optional allow-lists applied while loading.
///
/// The two filters are mutually exclusive: when both are set, the
/// record-id filter takes precedence. An empty filter passes every record.
#[derive(Debug, Clone, Default)]
pub struct LoadFilter {
    city_ids: Option<FxHashSet<String>>,
    countries: Option<FxHashSet<String>>,
}

impl LoadFilter {
    /// A filter that accepts everything.
    pub fn pass_all() -> Self {
        Self::default()
    }

    /// Keep only records whose id is in `ids`.
    pub fn by_city_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            city_ids: Some(ids.into_iter().map(Into::into).collect()),
            countries: None,
        }
    }

    /// Keep only records whose resolved country display name is in `names`.
    pub fn by_countries<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            city_ids: None,
            countries: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    fn accepts(&self, record: &CityRecord) -> bool {
        if let Some(ids) = &self.city_ids {
            return ids.contains(&record.id);
        }
        if let Some(countries) = &self.countries {
            return countries.contains(&record.country);
        }
        true
    }
}

/// Query-side mutable state, guarded as one unit.
struct QueryState {
    stats: IndexStats,
    cache: NearestCache,
    urban_centers: FxHashMap<String, CityRecord>,
}

/// Population-biased nearest-city index.
///
/// Lifecycle: construct once (optionally bound to on-disk storage),
/// populate once via [`load`](CityIndex::load), query many times via
/// [`nearest`](CityIndex::nearest), and dispose via
/// [`close`](CityIndex::close), which also runs on drop and deletes the
/// backing file when it was a private temporary one.
pub struct CityIndex {
    store: Box<dyn RecordStore>,
    config: Config,
    state: Mutex<QueryState>,
    /// Present when the store file is a private temporary; removed on
    /// close.
    temp_store: Option<tempfile::TempPath>,
    closed: bool,
}

impl CityIndex {
    /// Open a disk-backed index.
    ///
    /// Without a configured `store_path` a private temporary snapshot file
    /// is used and deleted again when the index closes.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let (store, temp_store) = match &config.store_path {
            Some(path) => (FileStore::open(path)?, None),
            None => {
                let temp_path = tempfile::NamedTempFile::new()?.into_temp_path();
                log::debug!("using a temporary store file: [{}]", temp_path.display());
                (FileStore::open(&temp_path)?, Some(temp_path))
            }
        };

        Ok(Self::build(Box::new(store), config, temp_store))
    }

    /// Fully in-memory index with no backing file.
    pub fn in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Box::new(MemoryStore::new()), config, None))
    }

    /// Index over a caller-provided store.
    pub fn with_store(store: Box<dyn RecordStore>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, config, None))
    }

    fn build(
        store: Box<dyn RecordStore>,
        config: Config,
        temp_store: Option<tempfile::TempPath>,
    ) -> Self {
        let cache = NearestCache::new(config.cache_capacity);
        Self {
            store,
            config,
            state: Mutex::new(QueryState {
                stats: IndexStats::new(),
                cache,
                urban_centers: FxHashMap::default(),
            }),
            temp_store,
            closed: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Feed records from `source` into the index.
    ///
    /// Each record passing the filter is stored under its identity key and
    /// filed into every cell bucket from its leaf level down to the
    /// configured minimum search level. Colocations append to the bucket;
    /// a record already present under the same `(source, id)` is a no-op.
    ///
    /// Records with invalid coordinates are skipped with a warning, or
    /// abort the load when `strict_records` is set. Loading is
    /// best-effort: a storage failure aborts mid-way without rolling back
    /// entries already written.
    pub fn load(
        &mut self,
        source: &dyn CityRecordSource,
        reader: &mut dyn BufRead,
        filter: &LoadFilter,
    ) -> Result<()> {
        self.ensure_open()?;

        let source_name = source.name().to_string();
        let strict = self.config.strict_records;
        let minimum_level = self.config.minimum_search_level;

        let store = &mut self.store;
        let stats = &mut self.state.get_mut().stats;

        let mut callback = |record: CityRecord| -> Result<()> {
            if !filter.accepts(&record) {
                return Ok(());
            }

            let cell = match record.cell() {
                Ok(cell) => cell,
                Err(err @ GeoAnchorError::InvalidCoordinates { .. }) => {
                    if strict {
                        return Err(err);
                    }
                    log::warn!(
                        "skipping record [{}] ([{}]): {}",
                        record.id,
                        record.city,
                        err
                    );
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            let token = cell.token();
            let entry = IndexEntry {
                record: record.clone(),
                level: cell.level(),
                leaf_token: token.clone(),
                source_name: source_name.clone(),
            };

            store.put(
                &StoreKey::city(&source_name, &record.id),
                &bincode::serialize(&record)?,
            )?;

            upsert_entry(store.as_mut(), stats, &token, &entry)?;

            let mut level = cell.level();
            while level > minimum_level {
                level -= 1;
                let parent_token = cell.parent(level)?.token();
                upsert_entry(store.as_mut(), stats, &parent_token, &entry)?;
            }

            Ok(())
        };

        let scanned = source.parse(reader, &mut callback)?;
        self.state.get_mut().stats.unfiltered_records += scanned as u64;

        Ok(())
    }

    /// Resolve the nearest notable city to a point.
    ///
    /// Urban centers (population at or above the configured threshold)
    /// anywhere in the searched region win over geometrically closer small
    /// places; with no urban center in reach, the closest city from the
    /// finest populated cell is returned. With nothing indexed around the
    /// point at any searched level the result is
    /// [`GeoAnchorError::NoNearestCity`]: an expected outcome the caller
    /// handles, not a crash.
    ///
    /// With `want_all_visits` the result carries the ordered history of
    /// every (cell, city) pair examined during the walk.
    ///
    /// Results are cached by the query's leaf cell and the visit flag;
    /// repeated calls are idempotent and served from cache until evicted.
    /// The index itself is never mutated.
    pub fn nearest(
        &self,
        latitude: f64,
        longitude: f64,
        want_all_visits: bool,
    ) -> Result<NearestCity> {
        self.ensure_open()?;

        let cell = CellAddress::from_coordinates(latitude, longitude)?;
        let cache_key = CacheKey {
            cell,
            want_visits: want_all_visits,
        };

        let mut state = self.state.lock();

        if let Some(cached) = state.cache.get(&cache_key) {
            let result = cached.clone();
            state.stats.cache_hits += 1;
            return Ok(result);
        }
        state.stats.cache_misses += 1;

        let mut visits = Vec::new();
        let mut urban_candidates: Vec<VisitHistoryItem> = Vec::new();
        let mut nearest_candidates: Vec<VisitHistoryItem> = Vec::new();

        let mut level = cell.level();
        loop {
            let token = cell.parent(level)?.token();

            if let Some(raw) = self.store.get(&StoreKey::bucket(&token))? {
                let entries: Vec<IndexEntry> = bincode::deserialize(&raw)?;

                // The first populated level fixes the local cluster, even
                // when coarser levels add more candidates later.
                let is_first_cluster = nearest_candidates.is_empty();

                for entry in entries {
                    let item = VisitHistoryItem {
                        token: token.clone(),
                        source_name: entry.source_name.clone(),
                        record: entry.record,
                    };

                    if want_all_visits {
                        visits.push(item.clone());
                    }
                    if is_first_cluster {
                        nearest_candidates.push(item.clone());
                    }
                    if item.record.population >= self.config.urban_center_minimum_population {
                        state.urban_centers.insert(
                            CityRecord::id_phrase(&item.source_name, &item.record.id),
                            item.record.clone(),
                        );
                        urban_candidates.push(item);
                    }
                }
            }

            if level == self.config.minimum_search_level {
                break;
            }
            level -= 1;
        }

        let candidates = if urban_candidates.is_empty() {
            &nearest_candidates
        } else {
            &urban_candidates
        };
        if candidates.is_empty() {
            return Err(GeoAnchorError::NoNearestCity);
        }

        let points: Vec<(f64, f64)> = candidates
            .iter()
            .map(|item| (item.record.latitude, item.record.longitude))
            .collect();
        state.stats.distance_calculations += points.len() as u64;

        let chosen = nearest_point_index(latitude, longitude, &points)
            .map(|i| &candidates[i])
            .ok_or(GeoAnchorError::NoNearestCity)?;

        let result = NearestCity {
            source_name: chosen.source_name.clone(),
            record: chosen.record.clone(),
            visits,
        };

        if state.cache.insert(cache_key, result.clone()) {
            state.stats.cache_evictions += 1;
        }

        Ok(result)
    }

    /// Point lookup of a raw record by provenance identity.
    pub fn get_by_id(&self, source_name: &str, id: &str) -> Result<CityRecord> {
        self.ensure_open()?;

        let raw = self
            .store
            .get(&StoreKey::city(source_name, id))?
            .ok_or(GeoAnchorError::NotFound)?;
        Ok(bincode::deserialize(&raw)?)
    }

    /// Snapshot of the accumulated counters.
    pub fn stats(&self) -> IndexStats {
        self.state.lock().stats.clone()
    }

    /// Urban centers encountered while answering queries, ordered by id.
    pub fn urban_centers_encountered(&self) -> Vec<CityRecord> {
        let state = self.state.lock();
        let mut centers: Vec<CityRecord> = state.urban_centers.values().cloned().collect();
        centers.sort_by(|a, b| a.id.cmp(&b.id));
        centers
    }

    /// Number of keys in the backing store, across both key groups.
    pub fn store_len(&self) -> Result<usize> {
        self.ensure_open()?;
        self.store.len()
    }

    /// Write a human-readable dump of the backing store.
    pub fn dump(&self, writer: &mut dyn Write) -> Result<()> {
        self.ensure_open()?;

        for (raw_key, value) in self.store.iter()? {
            let key = StoreKey::decode(&raw_key)?;
            match key.group {
                KeyGroup::CityRecords => {
                    let record: CityRecord = bincode::deserialize(&value)?;
                    writeln!(writer, "{} (CityRecord): {}", raw_key, record)?;
                }
                KeyGroup::CellBuckets => {
                    let entries: Vec<IndexEntry> = bincode::deserialize(&value)?;
                    writeln!(writer, "{} (IndexEntry):", raw_key)?;
                    for entry in entries {
                        writeln!(writer, "  {} ({})", entry.record, entry.level)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Sync and release the backing store. A private temporary store file
    /// is deleted. Safe to call more than once; queries after close fail.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        log::debug!("closing city index");
        self.store.close()?;
        self.closed = true;

        if let Some(temp) = self.temp_store.take() {
            log::debug!("removing temporary store file: [{}]", temp.display());
            temp.close()?;
        }

        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(GeoAnchorError::InvalidInput(
                "the index is closed".to_string(),
            ));
        }
        Ok(())
    }
}

impl Drop for CityIndex {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("error while closing the city index: {}", err);
        }
    }
}

/// Upsert one entry into a token bucket: create the bucket on first sight
/// (an add), append on colocation (an update), no-op when the identity is
/// already present.
fn upsert_entry(
    store: &mut dyn RecordStore,
    stats: &mut IndexStats,
    token: &str,
    entry: &IndexEntry,
) -> Result<()> {
    let key = StoreKey::bucket(token);

    match store.get(&key)? {
        None => {
            stats.record_adds += 1;
            store.put(&key, &bincode::serialize(&vec![entry.clone()])?)?;
        }
        Some(raw) => {
            let mut entries: Vec<IndexEntry> = bincode::deserialize(&raw)?;
            let present = entries
                .iter()
                .any(|existing| existing.same_identity(&entry.source_name, &entry.record.id));

            if !present {
                stats.record_updates += 1;
                entries.push(entry.clone());
                store.put(&key, &bincode::serialize(&entries)?)?;
            }
        }
    }

    Ok(())
}
