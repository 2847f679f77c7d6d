//! Line geometry from OpenStreetMap route relations.
//!
//! An Overpass response lists route relations, each made of way members
//! that are short, separately oriented polylines. [`parse_relations`]
//! reduces that to one chained polyline per line `ref`, and [`match_ref`]
//! looks a schedule line up in the result.

mod chain;
mod client;
mod matcher;
pub mod types;

pub use chain::chain_ways;
pub use client::{DEFAULT_OVERPASS_URL, OverpassQuery, fetch_overpass_routes};
pub use matcher::match_ref;

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::FetchRetryError;
use crate::geo::{LonLat, lon_lat};
use types::{OverpassElement, OverpassResponse, WayMember};

/// Line `ref` to its resolved polyline, `(lon, lat)` ordered.
pub type RefPaths = BTreeMap<String, Vec<LonLat>>;

#[derive(Debug, thiserror::Error)]
pub enum OverpassError {
    #[error("request failed: {0}")]
    Fetch(#[from] FetchRetryError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid Overpass JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reduces a response to one polyline per `ref`.
///
/// Relations without a `ref` or without way members are dropped. When
/// several relations share a `ref` (typically one per direction), the one
/// with the most way members is kept, the first seen on a tie. Lines whose
/// chained polyline is empty are left out.
pub fn parse_relations(response: &OverpassResponse) -> RefPaths {
    let mut by_ref: BTreeMap<String, (i64, Vec<WayMember>)> = BTreeMap::new();
    let mut malformed = 0usize;
    let mut malformed_ways = 0usize;

    for value in &response.elements {
        let relation = match OverpassElement::deserialize(value) {
            Ok(OverpassElement::Relation(relation)) => relation,
            Ok(OverpassElement::Other) => continue,
            Err(e) => {
                debug!(error = %e, "Skipping malformed Overpass element");
                malformed += 1;
                continue;
            }
        };

        let Some(line_ref) = relation.tags.line_ref.clone().filter(|r| !r.is_empty()) else {
            continue;
        };
        let (ways, bad_ways) = relation.way_members();
        if bad_ways > 0 {
            debug!(
                line_ref = %line_ref,
                relation = relation.id,
                bad_ways,
                "Skipping malformed way members"
            );
            malformed_ways += bad_ways;
        }
        if ways.is_empty() {
            continue;
        }

        let replace = by_ref
            .get(&line_ref)
            .is_none_or(|(_, kept)| ways.len() > kept.len());
        if replace {
            by_ref.insert(line_ref, (relation.id, ways));
        }
    }
    if malformed > 0 || malformed_ways > 0 {
        warn!(malformed, malformed_ways, "Skipped malformed Overpass data");
    }

    by_ref
        .into_iter()
        .filter_map(|(line_ref, (relation_id, members))| {
            let ways: Vec<Vec<LonLat>> = members
                .iter()
                .map(|way| way.geometry.iter().map(|p| lon_lat(p.lat, p.lon)).collect())
                .collect();
            let chained = chain_ways(&ways);
            debug!(
                line_ref = %line_ref,
                relation = relation_id,
                ways = ways.len(),
                points = chained.len(),
                "Chained relation"
            );
            (!chained.is_empty()).then_some((line_ref, chained))
        })
        .collect()
}
