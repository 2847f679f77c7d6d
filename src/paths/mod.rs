//! Turns a schedule plus optional OSM geometry into one drawable path per line.

mod providers;

pub use providers::{
    GeometryProvider, GeometrySource, OsmProvider, ShapeProvider, StopSequenceProvider,
};

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::geo::LonLat;
use crate::osm::RefPaths;
use crate::schedule::{Route, RouteKind, ScheduleStore, StopTimeEntry, Trip};
use crate::stats::PathStats;

/// A line ready to draw. Coordinates are `(lon, lat)` and there are always at least two.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPath {
    pub route_id: String,
    pub short_name: String,
    pub color: String,
    pub route_kind: RouteKind,
    pub coordinates: Vec<LonLat>,
}

/// Inputs shared by every route during a single build.
pub struct PathContext<'a> {
    pub schedule: &'a ScheduleStore,
    /// Grouped once up front, each group ascending by sequence.
    pub stop_times_by_trip: HashMap<&'a str, Vec<&'a StopTimeEntry>>,
    pub osm_paths: Option<&'a RefPaths>,
}

impl<'a> PathContext<'a> {
    pub fn new(schedule: &'a ScheduleStore, osm_paths: Option<&'a RefPaths>) -> Self {
        Self {
            schedule,
            stop_times_by_trip: schedule.stop_times_by_trip(),
            osm_paths,
        }
    }

    pub fn stop_count(&self, trip_id: &str) -> usize {
        self.stop_times_by_trip.get(trip_id).map_or(0, Vec::len)
    }
}

/// Picks the trip whose geometry best represents a route.
///
/// Trips with a shape reference win over trips without one; within the
/// winning group the trip with the most stop visits is chosen. On a tie the
/// earliest trip in `trips` order is kept.
pub fn select_best_trip<'t>(trips: &[&'t Trip], ctx: &PathContext<'_>) -> Option<&'t Trip> {
    let shaped: Vec<&'t Trip> = trips
        .iter()
        .copied()
        .filter(|t| t.shape_id.is_some())
        .collect();
    let pool: &[&'t Trip] = if shaped.is_empty() { trips } else { &shaped };

    let mut best: Option<(&'t Trip, usize)> = None;
    for &trip in pool {
        let count = ctx.stop_count(&trip.trip_id);
        if best.is_none_or(|(_, most)| count > most) {
            best = Some((trip, count));
        }
    }
    best.map(|(trip, _)| trip)
}

pub struct PathBuild {
    /// Ascending by route id.
    pub paths: Vec<ResolvedPath>,
    pub stats: PathStats,
}

/// Resolves route geometry by trying each provider in order.
pub struct RoutePathBuilder {
    providers: Vec<Box<dyn GeometryProvider>>,
}

impl Default for RoutePathBuilder {
    fn default() -> Self {
        Self::with_osm_kinds(&[RouteKind::Tram, RouteKind::Bus])
    }
}

impl RoutePathBuilder {
    pub fn new(providers: Vec<Box<dyn GeometryProvider>>) -> Self {
        Self { providers }
    }

    /// Shape, then OSM for the given route kinds, then stop sequence.
    pub fn with_osm_kinds(kinds: &[RouteKind]) -> Self {
        Self::new(vec![
            Box::new(ShapeProvider),
            Box::new(OsmProvider::new(kinds)),
            Box::new(StopSequenceProvider),
        ])
    }

    /// First provider result with at least two points.
    pub fn resolve(
        &self,
        route: &Route,
        trip: &Trip,
        ctx: &PathContext<'_>,
    ) -> Option<(GeometrySource, Vec<LonLat>)> {
        self.providers.iter().find_map(|provider| {
            provider
                .geometry(route, trip, ctx)
                .filter(|coords| coords.len() >= 2)
                .map(|coords| (provider.source(), coords))
        })
    }

    pub fn build(&self, schedule: &ScheduleStore, osm_paths: Option<&RefPaths>) -> PathBuild {
        let ctx = PathContext::new(schedule, osm_paths);

        let mut trips_by_route: HashMap<&str, Vec<&Trip>> = HashMap::new();
        for trip in schedule.trips.values() {
            trips_by_route
                .entry(trip.route_id.as_str())
                .or_default()
                .push(trip);
        }
        for trips in trips_by_route.values_mut() {
            trips.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
        }

        let mut routes: Vec<&Route> = schedule.routes.values().collect();
        routes.sort_by(|a, b| a.route_id.cmp(&b.route_id));

        let mut stats = PathStats::new();
        let mut paths = Vec::new();
        for route in routes {
            stats.routes += 1;
            let trips = trips_by_route
                .get(route.route_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let Some(trip) = select_best_trip(trips, &ctx) else {
                debug!(route_id = %route.route_id, "Route has no trips, skipping");
                stats.without_trip += 1;
                continue;
            };
            let Some((source, coordinates)) = self.resolve(route, trip, &ctx) else {
                debug!(
                    route_id = %route.route_id,
                    trip_id = %trip.trip_id,
                    "No geometry with two points, skipping"
                );
                stats.without_geometry += 1;
                continue;
            };

            stats.record(source);
            paths.push(ResolvedPath {
                route_id: route.route_id.clone(),
                short_name: route.short_name.clone(),
                color: route.color.clone(),
                route_kind: route.kind(),
                coordinates,
            });
        }

        info!(
            routes = stats.routes,
            emitted = stats.emitted,
            from_shape = stats.from_shape,
            from_osm = stats.from_osm,
            from_stop_sequence = stats.from_stop_sequence,
            osm_available = osm_paths.is_some_and(|p| !p.is_empty()),
            "Route paths built"
        );
        PathBuild { paths, stats }
    }
}

/// Builds paths with the default provider order, admitting OSM geometry for every route kind.
pub fn build_route_paths(
    schedule: &ScheduleStore,
    osm_paths: Option<&RefPaths>,
) -> Vec<ResolvedPath> {
    RoutePathBuilder::default().build(schedule, osm_paths).paths
}
