use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::paths::GeometrySource;

/// Outcome counts for one path build.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PathStats {
    pub timestamp: DateTime<Utc>,
    pub routes: usize,
    pub emitted: usize,

    // geometry sources
    pub from_shape: usize,
    pub from_osm: usize,
    pub from_stop_sequence: usize,

    // omissions
    pub without_trip: usize,
    pub without_geometry: usize,
}

impl PathStats {
    pub fn new() -> Self {
        PathStats {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Counts one emitted path under its geometry source.
    pub fn record(&mut self, source: GeometrySource) {
        self.emitted += 1;
        match source {
            GeometrySource::Shape => self.from_shape += 1,
            GeometrySource::Osm => self.from_osm += 1,
            GeometrySource::StopSequence => self.from_stop_sequence += 1,
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn coverage_pct(&self) -> f64 {
        Self::pct(self.emitted, self.routes)
    }

    pub fn osm_pct(&self) -> f64 {
        Self::pct(self.from_osm, self.emitted)
    }
}

/// One realtime poll, appended as a CSV row by the `vehicles` command.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PollStats {
    pub timestamp: DateTime<Utc>,
    pub received: usize,
    pub enriched: usize,
    pub dropped: usize,

    // reconciliation
    pub added: usize,
    pub updated: usize,
    pub removed: usize,

    // error tracking
    pub error_message: Option<String>,
}

impl PollStats {
    pub fn new(received: usize, enriched: usize) -> Self {
        PollStats {
            timestamp: Utc::now(),
            received,
            enriched,
            dropped: received.saturating_sub(enriched),
            ..Default::default()
        }
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_message: &str) -> Self {
        PollStats {
            timestamp: Utc::now(),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    pub fn enriched_pct(&self) -> f64 {
        PathStats::pct(self.enriched, self.received)
    }
}
