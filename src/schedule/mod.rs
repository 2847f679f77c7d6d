//! In-memory static schedule built from one or more GTFS feeds.
//!
//! [`ScheduleStore`] is immutable once loaded; a refresh builds a new one
//! and swaps it in wholesale.

pub(crate) mod archive;
mod error;
pub mod tables;
mod types;

pub use archive::FeedTables;
pub use error::ScheduleError;
pub use types::{LineInfo, Route, RouteKind, ShapePoint, Stop, StopTimeEntry, Trip};

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::fetch::{HttpClient, RetryOptions, fetch_bytes};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleStore {
    pub routes: HashMap<String, Route>,
    pub trips: HashMap<String, Trip>,
    pub stops: HashMap<String, Stop>,
    /// Stop visits in feed order, not grouped.
    pub stop_times: Vec<StopTimeEntry>,
    /// Shape id to points, ascending by sequence.
    pub shapes: HashMap<String, Vec<ShapePoint>>,
}

impl ScheduleStore {
    /// Parses one feed's tables. A missing optional table yields empty data.
    pub fn from_tables(tables: &FeedTables) -> Result<Self, ScheduleError> {
        let store = ScheduleStore {
            routes: tables::parse_routes(&tables.routes)?,
            trips: tables::parse_trips(&tables.trips)?,
            stops: tables::parse_stops(&tables.stops)?,
            stop_times: optional_table(tables.stop_times.as_deref(), tables::parse_stop_times)?,
            shapes: optional_table(tables.shapes.as_deref(), tables::parse_shapes)?,
        };
        Ok(store)
    }

    /// Overlays `secondary` on `self`; the secondary feed wins on every key.
    ///
    /// Routes, trips, stops and shapes are replaced per id. Stop visits are
    /// replaced per trip: if `secondary` lists any visit for a trip, the
    /// primary feed's visits for that trip are dropped.
    pub fn merge(mut self, secondary: ScheduleStore) -> ScheduleStore {
        self.routes.extend(secondary.routes);
        self.trips.extend(secondary.trips);
        self.stops.extend(secondary.stops);
        self.shapes.extend(secondary.shapes);

        let overridden: HashSet<&str> = secondary
            .stop_times
            .iter()
            .map(|st| st.trip_id.as_str())
            .collect();
        if !overridden.is_empty() {
            self.stop_times
                .retain(|st| !overridden.contains(st.trip_id.as_str()));
        }
        self.stop_times.extend(secondary.stop_times);
        self
    }

    /// Folds feeds in order, later feeds winning.
    pub fn merge_all(feeds: impl IntoIterator<Item = ScheduleStore>) -> ScheduleStore {
        feeds
            .into_iter()
            .fold(ScheduleStore::default(), ScheduleStore::merge)
    }

    /// Stop visits grouped by trip id, each group ascending by sequence.
    pub fn stop_times_by_trip(&self) -> HashMap<&str, Vec<&StopTimeEntry>> {
        let mut grouped: HashMap<&str, Vec<&StopTimeEntry>> = HashMap::new();
        for st in &self.stop_times {
            grouped.entry(st.trip_id.as_str()).or_default().push(st);
        }
        for entries in grouped.values_mut() {
            entries.sort_by_key(|st| st.sequence);
        }
        grouped
    }

    /// Resolves a trip and the route it runs on.
    pub fn trip_with_route(&self, trip_id: &str) -> Option<(&Trip, &Route)> {
        let trip = self.trips.get(trip_id)?;
        let route = self.routes.get(&trip.route_id)?;
        Some((trip, route))
    }

    pub fn shape(&self, shape_id: &str) -> Option<&[ShapePoint]> {
        self.shapes.get(shape_id).map(Vec::as_slice)
    }
}

/// Parses an optional table. An absent table, or one missing a key column,
/// yields empty data instead of failing the feed.
fn optional_table<T: Default>(
    content: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, ScheduleError>,
) -> Result<T, ScheduleError> {
    let Some(content) = content else {
        return Ok(T::default());
    };
    match parse(content) {
        Err(ScheduleError::MissingColumn { table, column }) => {
            warn!(table, column, "Optional table lacks a key column, ignoring it");
            Ok(T::default())
        }
        other => other,
    }
}

async fn load_feed<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    retry: &RetryOptions,
) -> Result<ScheduleStore, ScheduleError> {
    let bytes = fetch_bytes(client, url, retry)
        .await
        .map_err(|source| ScheduleError::Fetch {
            url: url.to_string(),
            source,
        })?;
    let tables = FeedTables::from_archive(&bytes)?;
    let store = ScheduleStore::from_tables(&tables)?;
    info!(
        url,
        routes = store.routes.len(),
        trips = store.trips.len(),
        stops = store.stops.len(),
        stop_times = store.stop_times.len(),
        shapes = store.shapes.len(),
        "Parsed GTFS feed"
    );
    Ok(store)
}

/// Downloads every feed concurrently and merges them in `urls` order, so a
/// later feed overrides an earlier one.
///
/// # Errors
///
/// Any single feed failing to download or parse fails the whole load.
#[tracing::instrument(skip(client, retry), fields(feeds = urls.len()))]
pub async fn load_schedule<C: HttpClient + ?Sized>(
    client: &C,
    urls: &[String],
    retry: &RetryOptions,
) -> Result<ScheduleStore, ScheduleError> {
    let feeds =
        futures::future::try_join_all(urls.iter().map(|url| load_feed(client, url, retry)))
            .await?;
    let store = ScheduleStore::merge_all(feeds);

    info!(
        routes = store.routes.len(),
        trips = store.trips.len(),
        stops = store.stops.len(),
        "GTFS schedule loaded"
    );
    Ok(store)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetch::mock::{MockClient, Step};
    use crate::schedule::archive::tests::zip_bytes;

    pub(crate) fn route(id: &str, short_name: &str, route_type: i32) -> Route {
        Route {
            route_id: id.into(),
            short_name: short_name.into(),
            long_name: format!("Line {short_name}"),
            route_type: Some(route_type),
            color: "#005CA9".into(),
            text_color: "#FFFFFF".into(),
        }
    }

    pub(crate) fn trip(id: &str, route_id: &str, shape_id: Option<&str>) -> Trip {
        Trip {
            trip_id: id.into(),
            route_id: route_id.into(),
            headsign: "Mosson".into(),
            direction_id: "0".into(),
            shape_id: shape_id.map(str::to_string),
        }
    }

    pub(crate) fn stop(id: &str, lat: f64, lng: f64) -> Stop {
        Stop {
            stop_id: id.into(),
            name: format!("Stop {id}"),
            lat,
            lng,
        }
    }

    pub(crate) fn stop_time(trip_id: &str, stop_id: &str, sequence: u32) -> StopTimeEntry {
        StopTimeEntry {
            trip_id: trip_id.into(),
            stop_id: stop_id.into(),
            sequence,
        }
    }

    fn store_with_route(id: &str, long_name: &str) -> ScheduleStore {
        let mut r = route(id, "1", 0);
        r.long_name = long_name.into();
        ScheduleStore {
            routes: HashMap::from([(id.to_string(), r)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_secondary_wins() {
        let merged = store_with_route("R1", "Urban").merge(store_with_route("R1", "Suburban"));

        assert_eq!(merged.routes.len(), 1);
        assert_eq!(merged.routes["R1"].long_name, "Suburban");
    }

    #[test]
    fn test_merge_keeps_disjoint_keys() {
        let mut a = store_with_route("R1", "Urban");
        a.stops.insert("S1".into(), stop("S1", 43.6, 3.88));
        let mut b = store_with_route("R2", "Suburban");
        b.stops.insert("S2".into(), stop("S2", 43.61, 3.89));

        let merged = ScheduleStore::merge_all([a, b]);

        assert_eq!(merged.routes.len(), 2);
        assert_eq!(merged.stops.len(), 2);
    }

    #[test]
    fn test_merge_replaces_stop_times_per_trip() {
        let a = ScheduleStore {
            stop_times: vec![
                stop_time("T1", "S1", 1),
                stop_time("T1", "S2", 2),
                stop_time("T2", "S1", 1),
            ],
            ..Default::default()
        };
        let b = ScheduleStore {
            stop_times: vec![stop_time("T1", "S9", 1)],
            ..Default::default()
        };

        let merged = a.merge(b);
        let grouped = merged.stop_times_by_trip();

        assert_eq!(grouped["T1"].len(), 1);
        assert_eq!(grouped["T1"][0].stop_id, "S9");
        assert_eq!(grouped["T2"].len(), 1);
    }

    #[test]
    fn test_stop_times_by_trip_sorted() {
        let store = ScheduleStore {
            stop_times: vec![
                stop_time("T1", "S3", 3),
                stop_time("T1", "S1", 1),
                stop_time("T1", "S2", 2),
            ],
            ..Default::default()
        };
        let grouped = store.stop_times_by_trip();
        let ids: Vec<&str> = grouped["T1"].iter().map(|st| st.stop_id.as_str()).collect();

        assert_eq!(ids, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn test_from_tables_without_optional_tables() {
        let tables = FeedTables {
            routes: "route_id,route_short_name\nR1,T1".into(),
            trips: "trip_id,route_id\nTR1,R1".into(),
            stops: "stop_id,stop_lat,stop_lon\nS1,43.6,3.87".into(),
            stop_times: None,
            shapes: None,
        };
        let store = ScheduleStore::from_tables(&tables).unwrap();

        assert_eq!(store.routes.len(), 1);
        assert!(store.stop_times.is_empty());
        assert!(store.shapes.is_empty());
        assert!(store.trip_with_route("TR1").is_some());
    }

    #[test]
    fn test_optional_tables_missing_key_column_are_ignored() {
        let tables = FeedTables {
            routes: "route_id,route_short_name\nR1,T1".into(),
            trips: "trip_id,route_id,shape_id\nTR1,R1,SH1".into(),
            stops: "stop_id,stop_lat,stop_lon\nS1,43.6,3.87".into(),
            stop_times: Some("trip_id,stop_id\nTR1,S1".into()),
            shapes: Some("shape_id,shape_pt_lat,shape_pt_lon\nSH1,43.6,3.87".into()),
        };

        let store = ScheduleStore::from_tables(&tables).unwrap();

        assert_eq!(store.routes.len(), 1);
        assert!(store.stop_times.is_empty());
        assert!(store.shapes.is_empty());
    }

    #[test]
    fn test_required_table_missing_key_column_fails() {
        let tables = FeedTables {
            routes: "route_id,route_short_name\nR1,T1".into(),
            trips: "trip_id\nTR1".into(),
            stops: "stop_id,stop_lat,stop_lon\nS1,43.6,3.87".into(),
            stop_times: None,
            shapes: None,
        };

        let err = ScheduleStore::from_tables(&tables).unwrap_err();

        assert!(matches!(
            err,
            ScheduleError::MissingColumn { table: "trips.txt", column: "route_id" }
        ));
    }

    fn feed_zip(route_line: &str, trip_line: &str, stop_line: &str) -> Vec<u8> {
        let routes = format!(
            "route_id,route_short_name,route_long_name,route_type,route_color,route_text_color\n{route_line}\n"
        );
        let trips = format!("trip_id,route_id,trip_headsign,direction_id\n{trip_line}\n");
        let stops = format!("stop_id,stop_name,stop_lat,stop_lon\n{stop_line}\n");
        zip_bytes(&[
            ("routes.txt", routes.as_str()),
            ("trips.txt", trips.as_str()),
            ("stops.txt", stops.as_str()),
        ])
    }

    #[tokio::test]
    async fn test_load_schedule_merges_feeds_in_order() {
        let urban = feed_zip(
            "R1,1,Urban Version,0,0074CE,FFFFFF",
            "T1,R1,Terminus A,0",
            "S1,Stop Urban,43.60,3.88",
        );
        let suburban = feed_zip(
            "R1,1,Suburban Version,3,FF0000,000000",
            "T2,R1,Terminus B,1",
            "S2,Stop Suburban,43.61,3.89",
        );
        let client = MockClient::by_url(vec![
            ("https://example.com/Urbain/GTFS.zip", vec![Step::ok(urban)]),
            ("https://example.com/Suburbain/GTFS.zip", vec![Step::ok(suburban)]),
        ]);
        let urls = vec![
            "https://example.com/Urbain/GTFS.zip".to_string(),
            "https://example.com/Suburbain/GTFS.zip".to_string(),
        ];

        let store = load_schedule(&client, &urls, &RetryOptions::fast()).await.unwrap();

        assert_eq!(store.routes.len(), 1);
        assert_eq!(store.routes["R1"].long_name, "Suburban Version");
        assert_eq!(store.routes["R1"].kind(), RouteKind::Bus);
        assert_eq!(store.trips.len(), 2);
        assert_eq!(store.trips["T1"].headsign, "Terminus A");
        assert_eq!(store.stops["S2"].name, "Stop Suburban");
    }

    #[tokio::test]
    async fn test_load_schedule_fails_when_a_feed_is_incomplete() {
        let broken = zip_bytes(&[("routes.txt", "route_id\nR1\n")]);
        let client = MockClient::new(vec![Step::ok(broken)]);
        let urls = vec!["https://example.com/GTFS.zip".to_string()];

        let err = load_schedule(&client, &urls, &RetryOptions::fast())
            .await
            .unwrap_err();

        assert!(matches!(err, ScheduleError::MissingTable("trips.txt")));
    }

    #[tokio::test]
    async fn test_load_schedule_surfaces_download_failure() {
        let client = MockClient::new(vec![Step::status(404)]);
        let urls = vec!["https://example.com/GTFS.zip".to_string()];

        let err = load_schedule(&client, &urls, &RetryOptions::fast())
            .await
            .unwrap_err();

        match err {
            ScheduleError::Fetch { url, source } => {
                assert_eq!(url, "https://example.com/GTFS.zip");
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
