//! Typed records for the static schedule tables.

use serde::{Deserialize, Serialize};

/// Coarse vehicle mode used for display and geometry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Tram,
    Bus,
}

impl RouteKind {
    /// GTFS `route_type` 0 is a tram; every other code, known or not, is a bus.
    pub fn from_route_type(route_type: Option<i32>) -> Self {
        match route_type {
            Some(0) => RouteKind::Tram,
            _ => RouteKind::Bus,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tram" => Some(RouteKind::Tram),
            "bus" => Some(RouteKind::Bus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    /// Raw GTFS `route_type`; `None` when empty or not a number.
    pub route_type: Option<i32>,
    pub color: String,
    pub text_color: String,
}

impl Route {
    pub fn kind(&self) -> RouteKind {
        RouteKind::from_route_type(self.route_type)
    }

    pub fn line_info(&self) -> LineInfo {
        LineInfo {
            id: self.route_id.clone(),
            name: self.short_name.clone(),
            kind: self.kind(),
            color: self.color.clone(),
        }
    }
}

/// Public identity of a line as shown next to vehicles and in line lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineInfo {
    pub id: String,
    pub name: String,
    pub kind: RouteKind,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub headsign: String,
    pub direction_id: String,
    pub shape_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// One vertex of a shape. The owning shape id is the map key it is stored under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePoint {
    pub lat: f64,
    pub lng: f64,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeEntry {
    pub trip_id: String,
    pub stop_id: String,
    pub sequence: u32,
}
