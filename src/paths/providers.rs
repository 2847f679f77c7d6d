//! Geometry sources for a route, one provider per source.

use serde::Serialize;

use super::PathContext;
use crate::geo::{LonLat, lon_lat};
use crate::osm::match_ref;
use crate::schedule::{Route, RouteKind, Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    Shape,
    Osm,
    StopSequence,
}

/// One way of drawing a route.
///
/// Providers are pure: they read the route, its selected trip and the
/// shared context, and return a polyline or `None`. The builder decides
/// whether a result is long enough to use.
pub trait GeometryProvider: Send + Sync {
    fn source(&self) -> GeometrySource;

    fn geometry(&self, route: &Route, trip: &Trip, ctx: &PathContext<'_>) -> Option<Vec<LonLat>>;
}

/// The selected trip's GTFS shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeProvider;

impl GeometryProvider for ShapeProvider {
    fn source(&self) -> GeometrySource {
        GeometrySource::Shape
    }

    fn geometry(&self, _route: &Route, trip: &Trip, ctx: &PathContext<'_>) -> Option<Vec<LonLat>> {
        let points = ctx.schedule.shape(trip.shape_id.as_deref()?)?;
        Some(points.iter().map(|p| lon_lat(p.lat, p.lng)).collect())
    }
}

/// OSM relation geometry matched on the route's short name.
///
/// Only routes whose kind is in `route_kinds` are looked up.
#[derive(Debug, Clone)]
pub struct OsmProvider {
    route_kinds: Vec<RouteKind>,
}

impl OsmProvider {
    pub fn new(route_kinds: &[RouteKind]) -> Self {
        Self {
            route_kinds: route_kinds.to_vec(),
        }
    }
}

impl Default for OsmProvider {
    fn default() -> Self {
        Self::new(&[RouteKind::Tram, RouteKind::Bus])
    }
}

impl GeometryProvider for OsmProvider {
    fn source(&self) -> GeometrySource {
        GeometrySource::Osm
    }

    fn geometry(&self, route: &Route, _trip: &Trip, ctx: &PathContext<'_>) -> Option<Vec<LonLat>> {
        if !self.route_kinds.contains(&route.kind()) {
            return None;
        }
        match_ref(&route.short_name, ctx.osm_paths?).map(<[LonLat]>::to_vec)
    }
}

/// Straight segments between the selected trip's stops, in visit order.
/// Visits to unknown stops are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopSequenceProvider;

impl GeometryProvider for StopSequenceProvider {
    fn source(&self) -> GeometrySource {
        GeometrySource::StopSequence
    }

    fn geometry(&self, _route: &Route, trip: &Trip, ctx: &PathContext<'_>) -> Option<Vec<LonLat>> {
        let visits = ctx.stop_times_by_trip.get(trip.trip_id.as_str())?;
        Some(
            visits
                .iter()
                .filter_map(|st| ctx.schedule.stops.get(&st.stop_id))
                .map(|stop| lon_lat(stop.lat, stop.lng))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::RefPaths;
    use crate::schedule::ScheduleStore;
    use crate::schedule::tests::{route, stop, stop_time, trip};
    use crate::schedule::ShapePoint;
    use std::collections::HashMap;

    fn schedule() -> ScheduleStore {
        ScheduleStore {
            stops: HashMap::from([
                ("S1".into(), stop("S1", 43.60, 3.87)),
                ("S2".into(), stop("S2", 43.61, 3.88)),
            ]),
            stop_times: vec![
                stop_time("TR1", "S2", 2),
                stop_time("TR1", "GONE", 3),
                stop_time("TR1", "S1", 1),
            ],
            shapes: HashMap::from([(
                "SH1".into(),
                vec![
                    ShapePoint { lat: 43.600, lng: 3.870, sequence: 1 },
                    ShapePoint { lat: 43.605, lng: 3.875, sequence: 2 },
                ],
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_shape_provider() {
        let store = schedule();
        let ctx = PathContext::new(&store, None);

        let shaped = ShapeProvider.geometry(&route("R1", "T1", 0), &trip("TR1", "R1", Some("SH1")), &ctx);
        assert_eq!(shaped, Some(vec![(3.870, 43.600), (3.875, 43.605)]));

        let unshaped = ShapeProvider.geometry(&route("R1", "T1", 0), &trip("TR1", "R1", None), &ctx);
        assert_eq!(unshaped, None);

        let dangling = ShapeProvider.geometry(&route("R1", "T1", 0), &trip("TR1", "R1", Some("NOPE")), &ctx);
        assert_eq!(dangling, None);
    }

    #[test]
    fn test_stop_sequence_provider_orders_and_skips_unknown_stops() {
        let store = schedule();
        let ctx = PathContext::new(&store, None);

        let coords = StopSequenceProvider.geometry(&route("R1", "T1", 0), &trip("TR1", "R1", None), &ctx);
        assert_eq!(coords, Some(vec![(3.87, 43.60), (3.88, 43.61)]));
    }

    #[test]
    fn test_osm_provider_respects_route_kinds() {
        let store = schedule();
        let osm: RefPaths = RefPaths::from([("1".into(), vec![(3.0, 43.0), (3.1, 43.1)])]);
        let ctx = PathContext::new(&store, Some(&osm));
        let bus = route("R1", "1", 3);
        let tram = route("R2", "T1", 0);
        let t = trip("TR1", "R1", None);

        let trams_only = OsmProvider::new(&[RouteKind::Tram]);
        assert_eq!(trams_only.geometry(&bus, &t, &ctx), None);
        assert!(trams_only.geometry(&tram, &t, &ctx).is_some());

        let all = OsmProvider::default();
        assert_eq!(all.geometry(&bus, &t, &ctx), Some(vec![(3.0, 43.0), (3.1, 43.1)]));
    }

    #[test]
    fn test_osm_provider_without_geometry_source() {
        let store = schedule();
        let ctx = PathContext::new(&store, None);

        let result = OsmProvider::default().geometry(&route("R1", "1", 0), &trip("TR1", "R1", None), &ctx);
        assert_eq!(result, None);
    }
}
