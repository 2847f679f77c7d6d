//! Bridges schedule line names to OSM `ref` tags.
//!
//! Schedules name tram lines `T1`, `T2`, ... while OSM relations are often
//! tagged `1`, `2`, ... (and sometimes the other way round). Lettered
//! branches such as `4A`/`4B` exist only on the OSM side.

use super::RefPaths;
use crate::geo::LonLat;

const TRAM_PREFIX: char = 'T';

/// Finds the OSM polyline for a schedule `short_name`. First hit wins:
///
/// 1. exact `ref`
/// 2. `short_name` without a leading `T`
/// 3. `short_name` with a leading `T` added
/// 4. the longest polyline whose `ref` starts with the bare name
///
/// `None` is an ordinary outcome; callers fall through to other geometry.
pub fn match_ref<'a>(short_name: &str, paths: &'a RefPaths) -> Option<&'a [LonLat]> {
    if short_name.is_empty() {
        return None;
    }

    if let Some(path) = paths.get(short_name) {
        return Some(path);
    }

    let bare = short_name
        .strip_prefix(TRAM_PREFIX)
        .filter(|rest| !rest.is_empty());
    if let Some(path) = bare.and_then(|b| paths.get(b)) {
        return Some(path);
    }

    if let Some(path) = paths.get(&format!("{TRAM_PREFIX}{short_name}")) {
        return Some(path);
    }

    longest_with_prefix(bare.unwrap_or(short_name), paths)
}

/// Ties keep the first `ref` in key order.
fn longest_with_prefix<'a>(prefix: &str, paths: &'a RefPaths) -> Option<&'a [LonLat]> {
    let mut best: Option<&Vec<LonLat>> = None;
    for (line_ref, path) in paths {
        if line_ref.starts_with(prefix) && best.is_none_or(|b| path.len() > b.len()) {
            best = Some(path);
        }
    }
    best.map(Vec::as_slice)
}
