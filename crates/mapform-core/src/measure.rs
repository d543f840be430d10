//! Geodesic length of polylines for the live measurement overlay.

use geo::{Distance, Haversine, Length, LineString, Point};

use crate::model::Position;

fn to_point(p: &Position) -> Option<Point<f64>> {
    Some(Point::new(*p.first()?, *p.get(1)?))
}

/// Great-circle distance between two `[lng, lat]` positions, in meters.
/// Positions without both ordinates measure as zero.
pub fn haversine(a: &Position, b: &Position) -> f64 {
    match (to_point(a), to_point(b)) {
        (Some(a), Some(b)) => Haversine.distance(a, b),
        _ => 0.0,
    }
}

/// Total length of the polyline through `positions`, in meters.
pub fn polyline_length(positions: &[Position]) -> f64 {
    let line: LineString<f64> = positions.iter().filter_map(to_point).collect();
    Haversine.length(&line)
}

/// Human-readable length: meters below one kilometer, else kilometers.
pub fn format_length(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}
