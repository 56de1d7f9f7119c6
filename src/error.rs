//! Error types shared across the crate.
//!
//! The library never terminates the process: every failure condition is
//! returned to the caller as a distinguishable [`GeoAnchorError`] value.
//! Only the CLI binaries translate errors into exit codes.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GeoAnchorError>;

/// All failure conditions produced by the library.
#[derive(Error, Debug)]
pub enum GeoAnchorError {
    /// A requested key was absent from the record store. Recovered locally
    /// wherever it means "haven't seen this cell or record yet".
    #[error("not found")]
    NotFound,

    /// No candidate city exists at any searched precision level around the
    /// query point. An expected outcome the caller must handle, not a bug.
    #[error("no nearest city")]
    NoNearestCity,

    /// Coordinates outside the valid latitude/longitude ranges, or not
    /// finite.
    #[error("invalid coordinates: latitude=({latitude}), longitude=({longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// A caller-supplied value that cannot be used as given.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rejected configuration values.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A country code with no entry in the country mapping.
    #[error("could not resolve country code [{0}]")]
    UnknownCountry(String),

    /// A dataset row that looked like a record but could not be decoded.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// Encoding or decoding a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl GeoAnchorError {
    /// True for the recoverable "key absent from storage" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoAnchorError::NotFound)
    }

    /// True for the expected "nothing indexed near this point" outcome.
    pub fn is_no_nearest_city(&self) -> bool {
        matches!(self, GeoAnchorError::NoNearestCity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(GeoAnchorError::NotFound.is_not_found());
        assert!(!GeoAnchorError::NotFound.is_no_nearest_city());
        assert!(GeoAnchorError::NoNearestCity.is_no_nearest_city());
        assert!(!GeoAnchorError::NoNearestCity.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = GeoAnchorError::InvalidCoordinates {
            latitude: 95.0,
            longitude: 10.0,
        };
        assert!(err.to_string().contains("95"));

        let err = GeoAnchorError::MalformedRecord {
            line: 12,
            reason: "bad latitude".to_string(),
        };
        assert!(err.to_string().contains("line 12"));
    }
}
