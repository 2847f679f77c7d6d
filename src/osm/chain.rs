//! Chaining of a relation's way members into one continuous polyline.
//!
//! Overpass lists a route relation's ways in travel order, but each way
//! keeps the orientation it was drawn with, and the list can have holes
//! where members are missing.

use crate::geo::{LonLat, dedup_consecutive, points_near};

/// Joins `ways` end to end.
///
/// The first way seeds the chain and is reversed up front when only its
/// start touches the second way. Each later way is appended forward when it
/// starts at the chain's end, reversed when it ends there, and skipped
/// otherwise, leaving a gap instead of a straight-line bridge. The junction
/// vertex is never duplicated and consecutive near-duplicates are collapsed.
///
/// Returns an empty polyline when the first way has no vertices.
pub fn chain_ways(ways: &[Vec<LonLat>]) -> Vec<LonLat> {
    let Some(first) = ways.first() else {
        return Vec::new();
    };
    if first.is_empty() {
        return Vec::new();
    }

    let mut chain = first.clone();

    if let Some(next) = ways.get(1) {
        if let (Some(&next_start), Some(&next_end)) = (next.first(), next.last()) {
            let connects =
                |p: LonLat| points_near(p, next_start) || points_near(p, next_end);
            if !connects(chain[chain.len() - 1]) && connects(chain[0]) {
                chain.reverse();
            }
        }
    }

    for way in &ways[1..] {
        let (Some(&way_start), Some(&way_end)) = (way.first(), way.last()) else {
            continue;
        };
        let chain_end = chain[chain.len() - 1];

        if points_near(chain_end, way_start) {
            chain.extend(way.iter().skip(1).copied());
        } else if points_near(chain_end, way_end) {
            chain.extend(way.iter().rev().skip(1).copied());
        }
    }

    dedup_consecutive(chain)
}
