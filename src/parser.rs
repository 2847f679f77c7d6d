//! Protobuf parser for GTFS Realtime feeds.

use anyhow::Result;
use prost::Message;
use tracing::debug;

use crate::gtfs_rt::FeedMessage;
use crate::vehicles::RawVehiclePosition;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Extracts vehicle positions from a decoded feed.
///
/// Entities without a vehicle position, a trip id, or a vehicle id are
/// skipped. A missing position reads as `0.0` coordinates and bearing, a
/// missing timestamp as `0`.
pub fn decode_vehicle_positions(feed: &FeedMessage) -> Vec<RawVehiclePosition> {
    let mut skipped = 0usize;
    let positions: Vec<RawVehiclePosition> = feed
        .entity
        .iter()
        .filter(|e| !e.is_deleted())
        .filter_map(|e| e.vehicle.as_ref())
        .filter_map(|v| {
            let trip_id = v.trip.as_ref().and_then(|t| t.trip_id.clone());
            let vehicle_id = v.vehicle.as_ref().and_then(|d| d.id.clone());
            let (Some(trip_id), Some(vehicle_id)) = (trip_id, vehicle_id) else {
                skipped += 1;
                return None;
            };
            let (lat, lng, bearing) = v.position.as_ref().map_or((0.0, 0.0, 0.0), |p| {
                (
                    f64::from(p.latitude),
                    f64::from(p.longitude),
                    f64::from(p.bearing.unwrap_or_default()),
                )
            });
            Some(RawVehiclePosition {
                vehicle_id,
                trip_id,
                lat,
                lng,
                bearing,
                timestamp: v.timestamp.unwrap_or_default(),
            })
        })
        .collect();

    if skipped > 0 {
        debug!(skipped, "Vehicle entities without trip or vehicle id");
    }
    positions
}
