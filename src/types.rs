//! Core data model: city records, index entries, query results, counters.

use crate::cell::CellAddress;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A populated place.
///
/// Immutable once constructed. Identity for deduplication purposes is the
/// `(source name, id)` pair, not the struct contents; see
/// [`CityRecord::id_phrase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Source-local unique identifier.
    pub id: String,
    /// Resolved display name, not the ISO code.
    pub country: String,
    /// Optional administrative subdivision code.
    #[serde(default)]
    pub province_state: String,
    /// Display name of the place.
    pub city: String,
    /// Reported population; sources drop places without one.
    pub population: u64,
    /// Decimal degrees, -90..90.
    pub latitude: f64,
    /// Decimal degrees, -180..180.
    pub longitude: f64,
}

impl CityRecord {
    /// Leaf cell address of this record's coordinates.
    pub fn cell(&self) -> Result<CellAddress> {
        CellAddress::from_coordinates(self.latitude, self.longitude)
    }

    /// City name with the subdivision code appended, unless the code is
    /// purely numeric (several datasets use numeric admin codes that mean
    /// nothing to a reader).
    pub fn city_and_province_state(&self) -> String {
        if self.province_state.is_empty() || self.province_state.parse::<u64>().is_ok() {
            self.city.clone()
        } else {
            format!("{}, {}", self.city, self.province_state)
        }
    }

    /// Identity phrase used for deduplication and point lookup.
    pub fn id_phrase(source_name: &str, id: &str) -> String {
        format!("{},{}", source_name, id)
    }
}

impl fmt::Display for CityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.cell().map(|c| c.token()).unwrap_or_default();
        write!(
            f,
            "CityRecord<ID=[{}] COUNTRY=[{}] PROVINCE-OR-STATE=[{}] CITY=[{}] POP=({}) LAT=({:.10}) LON=({:.10}) CELL=[{}]>",
            self.id,
            self.country,
            self.province_state,
            self.city,
            self.population,
            self.latitude,
            self.longitude,
            token
        )
    }
}

/// A city filed under a cell token at some precision level.
///
/// Several entries may be colocated under the same token when distinct
/// cities fall into the same coarse cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub record: CityRecord,
    /// Precision level the entry was filed at.
    pub level: u8,
    /// The record's own leaf token, kept unmodified for reference
    /// regardless of the level it was filed under.
    pub leaf_token: String,
    /// Name of the originating record source.
    pub source_name: String,
}

impl IndexEntry {
    /// Two entries are the same logical record when source and id match.
    pub fn same_identity(&self, source_name: &str, id: &str) -> bool {
        self.source_name == source_name && self.record.id == id
    }
}

/// One (cell, city) pair examined during a nearest-city walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitHistoryItem {
    /// Token of the cell the entry was found under.
    pub token: String,
    pub source_name: String,
    pub record: CityRecord,
}

/// Outcome of a nearest-city query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCity {
    /// Name of the source that produced the winning record.
    pub source_name: String,
    pub record: CityRecord,
    /// Ordered (cell, city) pairs examined while walking from finest to
    /// coarsest level; empty unless the caller asked for them.
    pub visits: Vec<VisitHistoryItem>,
}

/// Monotonically increasing load and query counters.
///
/// Pure telemetry: mutated by the index during loads and queries, read by
/// callers through a snapshot accessor. Counters never decrease during an
/// index's lifetime, so repeated partial loads accumulate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Rows the source scanned, counted before any index-side filtering.
    pub unfiltered_records: u64,
    /// Cell buckets created.
    pub record_adds: u64,
    /// Entries appended to an existing bucket (colocation).
    pub record_updates: u64,
    /// Great-circle distances computed while disambiguating candidates.
    pub distance_calculations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IndexStats<UNFILTERED=({}) ADDS=({}) UPDATES=({}) DISTANCES=({}) CACHE-HITS=({}) CACHE-MISSES=({}) CACHE-EVICTIONS=({})>",
            self.unfiltered_records,
            self.record_adds,
            self.record_updates,
            self.distance_calculations,
            self.cache_hits,
            self.cache_misses,
            self.cache_evictions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CityRecord {
        CityRecord {
            id: "4989005".to_string(),
            country: "United States".to_string(),
            province_state: "MI".to_string(),
            city: "Clawson".to_string(),
            population: 12015,
            latitude: 42.53337,
            longitude: -83.14632,
        }
    }

    #[test]
    fn test_display_contains_fields() {
        let rendered = record().to_string();
        assert!(rendered.contains("ID=[4989005]"));
        assert!(rendered.contains("CITY=[Clawson]"));
        assert!(rendered.contains("POP=(12015)"));
        assert!(rendered.contains("LAT=(42.5333700000)"));
        assert!(rendered.contains("LON=(-83.1463200000)"));
    }

    #[test]
    fn test_city_and_province_state() {
        let mut r = record();
        assert_eq!(r.city_and_province_state(), "Clawson, MI");

        r.province_state = "13".to_string();
        assert_eq!(r.city_and_province_state(), "Clawson");

        r.province_state = String::new();
        assert_eq!(r.city_and_province_state(), "Clawson");
    }

    #[test]
    fn test_id_phrase() {
        assert_eq!(
            CityRecord::id_phrase("GeoNames", "4989005"),
            "GeoNames,4989005"
        );
    }

    #[test]
    fn test_record_binary_round_trip() {
        // Exact population and full floating-point precision must survive
        // the store encoding.
        let r = CityRecord {
            latitude: 42.1234567890123456,
            longitude: -83.9876543210987654,
            population: u64::MAX,
            ..record()
        };

        let encoded = bincode::serialize(&r).unwrap();
        let decoded: CityRecord = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, r);
        assert_eq!(decoded.latitude.to_bits(), r.latitude.to_bits());
        assert_eq!(decoded.longitude.to_bits(), r.longitude.to_bits());
    }

    #[test]
    fn test_entry_identity() {
        let entry = IndexEntry {
            record: record(),
            level: 13,
            leaf_token: "deadbeef".to_string(),
            source_name: "GeoNames".to_string(),
        };

        assert!(entry.same_identity("GeoNames", "4989005"));
        assert!(!entry.same_identity("GeoNames", "123"));
        assert!(!entry.same_identity("OtherSource", "4989005"));
    }

    #[test]
    fn test_stats_display() {
        let stats = IndexStats {
            unfiltered_records: 82,
            record_adds: 3,
            ..IndexStats::new()
        };
        let rendered = stats.to_string();
        assert!(rendered.contains("UNFILTERED=(82)"));
        assert!(rendered.contains("ADDS=(3)"));
    }
}
