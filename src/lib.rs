//! Embedded population-biased nearest-city index for geotagging pipelines.
//!
//! `geoanchor` builds a hierarchical cell index over populated-place
//! records and answers "what is the nearest notable city to this point?",
//! favoring large urban centers over small nearby villages when both are
//! plausible answers. It is meant for attaching a human-readable place
//! name to raw GPS coordinates (photos, GPS tracks), not for
//! general-purpose reverse geocoding.
//!
//! ```rust
//! use geoanchor::geonames::{GeonamesSource, build_country_mapping};
//! use geoanchor::{CityIndex, Config, LoadFilter};
//!
//! let country_data = "US\tUSA\t840\tUS\tUnited States\t\t\t\t\t\t\t\t\t\t\t\t\t\t";
//! let city_data =
//!     "5011148\tSterling Heights\tSterling Heights\t\t42.58031\t-83.0302\tP\tPPL\tUS\t\tMI\t\t\t\t132052\t\t\t\t";
//!
//! let countries = build_country_mapping(country_data.as_bytes())?;
//! let source = GeonamesSource::new(countries);
//!
//! let mut index = CityIndex::in_memory(Config::default())?;
//! index.load(&source, &mut city_data.as_bytes(), &LoadFilter::pass_all())?;
//!
//! let nearest = index.nearest(42.5803, -83.0302, false)?;
//! assert_eq!(nearest.record.city, "Sterling Heights");
//! # Ok::<(), geoanchor::GeoAnchorError>(())
//! ```

pub mod cache;
pub mod cell;
pub mod config;
pub mod error;
pub mod geonames;
pub mod index;
pub mod source;
pub mod spatial;
pub mod storage;
pub mod types;

pub use cache::{CacheKey, NearestCache};
pub use cell::{CellAddress, LEAF_CELL_LEVEL};
pub use config::Config;
pub use error::{GeoAnchorError, Result};
pub use geonames::GeonamesSource;
pub use index::{CityIndex, LoadFilter};
pub use source::CityRecordSource;
pub use spatial::great_circle_distance;
pub use storage::{FileStore, MemoryStore, RecordStore, StorageStats, StoreKey};
pub use types::{CityRecord, IndexEntry, IndexStats, NearestCity, VisitHistoryItem};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{
        CityIndex, CityRecord, CityRecordSource, Config, GeoAnchorError, GeonamesSource,
        LoadFilter, NearestCity, Result,
    };
}
