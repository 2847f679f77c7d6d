//! Header-addressed CSV parsing for the individual GTFS tables.
//!
//! Each table has a private record type mirroring its columns; rows that
//! fail to deserialize or carry an empty key are skipped and counted rather
//! than failing the table.

use std::collections::HashMap;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ScheduleError;
use super::types::{Route, ShapePoint, Stop, StopTimeEntry, Trip};

const DEFAULT_COLOR: &str = "#000000";
const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

#[derive(Debug, Deserialize)]
struct RouteRecord {
    route_id: String,
    #[serde(default)]
    route_short_name: String,
    #[serde(default)]
    route_long_name: String,
    #[serde(default)]
    route_type: String,
    #[serde(default)]
    route_color: String,
    #[serde(default)]
    route_text_color: String,
}

#[derive(Debug, Deserialize)]
struct TripRecord {
    trip_id: String,
    route_id: String,
    #[serde(default)]
    trip_headsign: String,
    #[serde(default)]
    direction_id: String,
    #[serde(default)]
    shape_id: String,
}

#[derive(Debug, Deserialize)]
struct StopRecord {
    stop_id: String,
    #[serde(default)]
    stop_name: String,
    stop_lat: f64,
    stop_lon: f64,
}

#[derive(Debug, Deserialize)]
struct StopTimeRecord {
    trip_id: String,
    stop_id: String,
    stop_sequence: u32,
}

#[derive(Debug, Deserialize)]
struct ShapeRecord {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Raw hex digits become `#RRGGBB`; an empty field falls back to `default`.
fn hex_color(raw: &str, default: &str) -> String {
    if raw.is_empty() {
        default.to_string()
    } else {
        format!("#{raw}")
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Deserializes every row of `content`, checking that the `required` key
/// columns are present in the header.
fn read_records<T: DeserializeOwned>(
    table: &'static str,
    content: &str,
    required: &[&'static str],
) -> Result<Vec<T>, ScheduleError> {
    let content = strip_bom(content);
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = rdr.headers()?.clone();

    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(ScheduleError::MissingColumn { table, column });
        }
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<T>() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(table, error = %e, "Skipping malformed record");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(table, skipped, "Skipped malformed records");
    }
    Ok(records)
}

pub fn parse_routes(content: &str) -> Result<HashMap<String, Route>, ScheduleError> {
    let records: Vec<RouteRecord> = read_records("routes.txt", content, &["route_id"])?;

    Ok(records
        .into_iter()
        .filter(|r| !r.route_id.is_empty())
        .map(|r| {
            let route = Route {
                route_id: r.route_id.clone(),
                short_name: r.route_short_name,
                long_name: r.route_long_name,
                route_type: r.route_type.parse().ok(),
                color: hex_color(&r.route_color, DEFAULT_COLOR),
                text_color: hex_color(&r.route_text_color, DEFAULT_TEXT_COLOR),
            };
            (r.route_id, route)
        })
        .collect())
}

pub fn parse_trips(content: &str) -> Result<HashMap<String, Trip>, ScheduleError> {
    let records: Vec<TripRecord> =
        read_records("trips.txt", content, &["trip_id", "route_id"])?;

    Ok(records
        .into_iter()
        .filter(|r| !r.trip_id.is_empty())
        .map(|r| {
            let trip = Trip {
                trip_id: r.trip_id.clone(),
                route_id: r.route_id,
                headsign: r.trip_headsign,
                direction_id: r.direction_id,
                shape_id: non_empty(r.shape_id),
            };
            (r.trip_id, trip)
        })
        .collect())
}

pub fn parse_stops(content: &str) -> Result<HashMap<String, Stop>, ScheduleError> {
    let records: Vec<StopRecord> =
        read_records("stops.txt", content, &["stop_id", "stop_lat", "stop_lon"])?;

    Ok(records
        .into_iter()
        .filter(|r| !r.stop_id.is_empty() && r.stop_lat.is_finite() && r.stop_lon.is_finite())
        .map(|r| {
            let stop = Stop {
                stop_id: r.stop_id.clone(),
                name: r.stop_name,
                lat: r.stop_lat,
                lng: r.stop_lon,
            };
            (r.stop_id, stop)
        })
        .collect())
}

/// Stop visits in file order; grouping and sorting happen at use sites.
pub fn parse_stop_times(content: &str) -> Result<Vec<StopTimeEntry>, ScheduleError> {
    let records: Vec<StopTimeRecord> = read_records(
        "stop_times.txt",
        content,
        &["trip_id", "stop_id", "stop_sequence"],
    )?;

    Ok(records
        .into_iter()
        .filter(|r| !r.trip_id.is_empty())
        .map(|r| StopTimeEntry {
            trip_id: r.trip_id,
            stop_id: r.stop_id,
            sequence: r.stop_sequence,
        })
        .collect())
}

/// Shape points grouped by shape id, each group ascending by sequence.
pub fn parse_shapes(content: &str) -> Result<HashMap<String, Vec<ShapePoint>>, ScheduleError> {
    let records: Vec<ShapeRecord> = read_records(
        "shapes.txt",
        content,
        &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
    )?;

    let mut shapes: HashMap<String, Vec<ShapePoint>> = HashMap::new();
    for r in records {
        if r.shape_id.is_empty() || !r.shape_pt_lat.is_finite() || !r.shape_pt_lon.is_finite() {
            continue;
        }
        shapes.entry(r.shape_id).or_default().push(ShapePoint {
            lat: r.shape_pt_lat,
            lng: r.shape_pt_lon,
            sequence: r.shape_pt_sequence,
        });
    }
    for points in shapes.values_mut() {
        points.sort_by_key(|p| p.sequence);
    }
    Ok(shapes)
}
