//! Hierarchical cell addressing over the sphere.
//!
//! Addresses come from the S2 subdivision scheme: a Hilbert-curve
//! space-filling index whose cells roughly halve in edge length with every
//! level. Level 0 cells cover a sixth of the sphere; level 30 is the
//! sub-centimeter leaf precision that every coordinate pair resolves to.

use crate::error::{GeoAnchorError, Result};
use s2::cellid::CellID;
use s2::latlng::LatLng;

/// Finest precision level, produced by [`CellAddress::from_coordinates`].
pub const LEAF_CELL_LEVEL: u8 = 30;

/// A cell address at some precision level.
///
/// Equality and hashing are exact over the underlying 64-bit id, so
/// addresses can key maps and stores directly. Distinct coordinates may
/// legitimately share a leaf address once they are closer together than the
/// leaf-cell resolution; that is a property of the subdivision, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress(u64);

impl CellAddress {
    /// Resolve a coordinate pair to its leaf-level cell address.
    ///
    /// Out-of-range or non-finite coordinates are a hard error; the loader
    /// decides whether to skip or reject the offending record.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(GeoAnchorError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        let cell = CellID::from(LatLng::from_degrees(latitude, longitude));
        Ok(CellAddress(cell.0))
    }

    /// Precision level of this address. 0 is coarsest.
    pub fn level(&self) -> u8 {
        CellID(self.0).level() as u8
    }

    /// Ancestor address at a coarser level; at `level == self.level()` the
    /// address itself.
    pub fn parent(&self, level: u8) -> Result<Self> {
        if level > self.level() {
            return Err(GeoAnchorError::InvalidInput(format!(
                "level ({}) is finer than this address (level ({}))",
                level,
                self.level()
            )));
        }

        Ok(CellAddress(CellID(self.0).parent(u64::from(level)).0))
    }

    /// Canonical short token form, used as the bucket key in the index.
    pub fn token(&self) -> String {
        CellID(self.0).to_token()
    }

    /// The raw 64-bit cell id.
    pub fn id(&self) -> u64 {
        self.0
    }
}
