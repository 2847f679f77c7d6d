//! Read-only listings over a loaded schedule.

use std::str::FromStr;

use thiserror::Error;

use crate::schedule::{LineInfo, RouteKind, ScheduleStore, Stop};

pub use crate::vehicles::vehicles_for_line;

/// Every line, trams first, each group ordered by name.
///
/// Names compare case-insensitively and lexically, so `"10"` sorts before `"6"`.
pub fn lines(schedule: &ScheduleStore) -> Vec<LineInfo> {
    let mut lines: Vec<LineInfo> = schedule.routes.values().map(|r| r.line_info()).collect();
    lines.sort_by(|a, b| {
        kind_rank(a.kind)
            .cmp(&kind_rank(b.kind))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
    lines
}

fn kind_rank(kind: RouteKind) -> u8 {
    match kind {
        RouteKind::Tram => 0,
        RouteKind::Bus => 1,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BBoxError {
    #[error("expected minLng,minLat,maxLng,maxLat, got {0} values")]
    WrongArity(usize),
    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),
}

/// Bounding box in degrees, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Parses `minLng,minLat,maxLng,maxLat`.
    pub fn parse(s: &str) -> Result<Self, BBoxError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BBoxError::WrongArity(parts.len()));
        }
        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| BBoxError::InvalidCoordinate(part.to_string()))?;
        }
        let [min_lng, min_lat, max_lng, max_lat] = values;
        Ok(BBox {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

impl FromStr for BBox {
    type Err = BBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BBox::parse(s)
    }
}

/// Stops inside `bbox`, or every stop when `None`, ascending by stop id.
pub fn stops_in_bbox<'a>(schedule: &'a ScheduleStore, bbox: Option<&BBox>) -> Vec<&'a Stop> {
    let mut stops: Vec<&Stop> = schedule
        .stops
        .values()
        .filter(|s| bbox.is_none_or(|b| b.contains(s.lat, s.lng)))
        .collect();
    stops.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
    stops
}
