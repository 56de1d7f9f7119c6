//! Great-circle geometry helpers.
//!
//! The hierarchical cell walk alone is not enough for an accurate answer:
//! because of how the subdivision cuts up the sphere, a bucket can surface
//! cities farther away than ones sitting just across a cell boundary. The
//! final candidate selection therefore always goes through a real
//! great-circle distance comparison.

use geo::{Distance, Haversine, Point};

/// Distance in meters between two coordinate pairs on a spherical Earth.
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Index of the `(latitude, longitude)` candidate nearest to the origin.
///
/// The first candidate wins unless a strictly smaller distance shows up
/// later, so ties keep the earliest entry; for distinct distances the
/// selection is order-independent.
pub fn nearest_point_index(
    origin_lat: f64,
    origin_lon: f64,
    points: &[(f64, f64)],
) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;

    for (i, (lat, lon)) in points.iter().enumerate() {
        let distance = great_circle_distance(origin_lat, origin_lon, *lat, *lon);
        match nearest {
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((i, distance)),
        }
    }

    nearest.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        // New York to Los Angeles: ~3,944 km.
        let dist = great_circle_distance(40.7128, -74.0060, 34.0522, -118.2437);
        assert!(dist > 3_900_000.0 && dist < 4_000_000.0, "dist=({})", dist);
    }

    #[test]
    fn test_zero_distance() {
        let dist = great_circle_distance(51.5074, -0.1278, 51.5074, -0.1278);
        assert!(dist.abs() < 1e-6);
    }

    #[test]
    fn test_nearest_first_of_three() {
        let origin = (27.2974891, -81.3871491);
        let points = vec![
            (27.443239, -81.429949),
            (27.038644, -81.291909),
            (26.013582, -80.542458),
        ];

        assert_eq!(nearest_point_index(origin.0, origin.1, &points), Some(0));
    }

    #[test]
    fn test_nearest_last_of_three() {
        let origin = (26.00, -80.50);
        let points = vec![
            (27.443239, -81.429949),
            (27.038644, -81.291909),
            (26.013582, -80.542458),
        ];

        assert_eq!(nearest_point_index(origin.0, origin.1, &points), Some(2));
    }

    #[test]
    fn test_nearest_order_independent() {
        let origin = (27.2974891, -81.3871491);
        let winner = (27.443239, -81.429949);
        let points = vec![
            (27.038644, -81.291909),
            (26.013582, -80.542458),
            winner,
            (27.9, -82.0),
        ];

        let i = nearest_point_index(origin.0, origin.1, &points).unwrap();
        assert_eq!(points[i], winner);
    }

    #[test]
    fn test_tie_keeps_first() {
        let origin = (10.0, 10.0);
        let points = vec![(11.0, 10.0), (11.0, 10.0), (12.0, 10.0)];

        assert_eq!(nearest_point_index(origin.0, origin.1, &points), Some(0));
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(nearest_point_index(0.0, 0.0, &[]), None);
    }
}
