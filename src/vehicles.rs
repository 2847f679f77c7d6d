//! Joins realtime vehicle positions against the static schedule.

use serde::Serialize;
use tracing::debug;

use crate::schedule::{LineInfo, RouteKind, ScheduleStore};

/// A vehicle position as decoded from a realtime feed, before any schedule lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVehiclePosition {
    pub vehicle_id: String,
    pub trip_id: String,
    pub lat: f64,
    pub lng: f64,
    pub bearing: f64,
    /// Epoch seconds, 0 when the feed omitted it.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub vehicle_id: String,
    pub position: Position,
    pub bearing: f64,
    pub line: LineInfo,
    pub headsign: String,
    pub timestamp: u64,
}

/// Flat CSV form of a [`Vehicle`], one row per vehicle per poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRow<'a> {
    pub vehicle_id: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub bearing: f64,
    pub line_id: &'a str,
    pub line_name: &'a str,
    pub kind: RouteKind,
    pub headsign: &'a str,
    pub timestamp: u64,
}

impl<'a> From<&'a Vehicle> for VehicleRow<'a> {
    fn from(v: &'a Vehicle) -> Self {
        VehicleRow {
            vehicle_id: &v.vehicle_id,
            lat: v.position.lat,
            lng: v.position.lng,
            bearing: v.bearing,
            line_id: &v.line.id,
            line_name: &v.line.name,
            kind: v.line.kind,
            headsign: &v.headsign,
            timestamp: v.timestamp,
        }
    }
}

/// Resolves each position's trip and route into a display-ready [`Vehicle`].
///
/// Positions whose trip is unknown, or whose trip points at an unknown route,
/// are dropped. Output keeps the input order of the surviving positions.
pub fn enrich_vehicles(raw: &[RawVehiclePosition], schedule: &ScheduleStore) -> Vec<Vehicle> {
    let vehicles: Vec<Vehicle> = raw
        .iter()
        .filter_map(|pos| {
            let Some((trip, route)) = schedule.trip_with_route(&pos.trip_id) else {
                debug!(
                    vehicle_id = %pos.vehicle_id,
                    trip_id = %pos.trip_id,
                    "Vehicle trip not in schedule, dropping"
                );
                return None;
            };
            Some(Vehicle {
                vehicle_id: pos.vehicle_id.clone(),
                position: Position {
                    lat: pos.lat,
                    lng: pos.lng,
                },
                bearing: pos.bearing,
                line: route.line_info(),
                headsign: trip.headsign.clone(),
                timestamp: pos.timestamp,
            })
        })
        .collect();

    debug!(
        received = raw.len(),
        enriched = vehicles.len(),
        "Vehicles enriched"
    );
    vehicles
}

/// Vehicles currently running on the line with the given short name.
pub fn vehicles_for_line<'a>(vehicles: &'a [Vehicle], line_name: &str) -> Vec<&'a Vehicle> {
    vehicles.iter().filter(|v| v.line.name == line_name).collect()
}
