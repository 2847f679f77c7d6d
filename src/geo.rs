//! Coordinate helpers shared by every geometry source.
//!
//! Every polyline in this crate is a sequence of `(longitude, latitude)`
//! pairs, the order GeoJSON uses. Inputs that arrive latitude-first (GTFS
//! stops and shapes, Overpass vertices) go through [`lon_lat`] so the swap
//! happens in one place.

/// A `(longitude, latitude)` pair. Serializes as a two-element JSON array.
pub type LonLat = (f64, f64);

/// Per-axis tolerance, in degrees, under which two vertices are the same point.
///
/// About 5 m at mid latitudes.
pub const NEAR_THRESHOLD: f64 = 0.0001;

/// Builds a [`LonLat`] from latitude-first input.
pub fn lon_lat(lat: f64, lon: f64) -> LonLat {
    (lon, lat)
}

/// Returns `true` when both axes differ by less than [`NEAR_THRESHOLD`].
pub fn points_near(a: LonLat, b: LonLat) -> bool {
    (a.0 - b.0).abs() < NEAR_THRESHOLD && (a.1 - b.1).abs() < NEAR_THRESHOLD
}

/// Collapses runs of consecutive near-identical points to their first
/// occurrence. A point that returns to an earlier, non-adjacent position
/// (a loop) is kept.
pub fn dedup_consecutive(points: Vec<LonLat>) -> Vec<LonLat> {
    let mut out: Vec<LonLat> = Vec::with_capacity(points.len());
    for point in points {
        match out.last() {
            Some(&prev) if points_near(prev, point) => {}
            _ => out.push(point),
        }
    }
    out
}
