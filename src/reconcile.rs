//! Incremental update of a keyed vehicle collection between polls.
//!
//! The caller owns the collection; [`reconcile`] only describes how it
//! should change.

use std::collections::HashMap;

use crate::vehicles::Vehicle;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VehicleDiff {
    /// Vehicles not present before.
    pub added: Vec<Vehicle>,
    /// Vehicles present before whose record changed.
    pub updated: Vec<Vehicle>,
    /// Ids present before and missing from the new poll, ascending.
    pub removed: Vec<String>,
}

impl VehicleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Brings `current` in line with the poll this diff was computed from.
    pub fn apply(self, current: &mut HashMap<String, Vehicle>) {
        for id in &self.removed {
            current.remove(id);
        }
        for vehicle in self.added.into_iter().chain(self.updated) {
            current.insert(vehicle.vehicle_id.clone(), vehicle);
        }
    }
}

/// Compares the previous keyed collection with a fresh poll.
///
/// When `incoming` lists the same vehicle id more than once, the last record wins.
/// Unchanged vehicles appear in neither `added` nor `updated`.
pub fn reconcile(previous: &HashMap<String, Vehicle>, incoming: &[Vehicle]) -> VehicleDiff {
    let mut latest: HashMap<&str, &Vehicle> = HashMap::with_capacity(incoming.len());
    let mut order: Vec<&str> = Vec::with_capacity(incoming.len());
    for vehicle in incoming {
        if latest.insert(vehicle.vehicle_id.as_str(), vehicle).is_none() {
            order.push(vehicle.vehicle_id.as_str());
        }
    }

    let mut diff = VehicleDiff::default();
    for id in order {
        let vehicle = latest[id];
        match previous.get(id) {
            None => diff.added.push(vehicle.clone()),
            Some(old) if old != vehicle => diff.updated.push(vehicle.clone()),
            Some(_) => {}
        }
    }

    diff.removed = previous
        .keys()
        .filter(|id| !latest.contains_key(id.as_str()))
        .cloned()
        .collect();
    diff.removed.sort();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{LineInfo, RouteKind};
    use crate::vehicles::Position;

    fn vehicle(id: &str, lat: f64) -> Vehicle {
        Vehicle {
            vehicle_id: id.into(),
            position: Position { lat, lng: 3.88 },
            bearing: 0.0,
            line: LineInfo {
                id: "R1".into(),
                name: "1".into(),
                kind: RouteKind::Tram,
                color: "#005CA9".into(),
            },
            headsign: "Odysseum".into(),
            timestamp: 1_700_000_000,
        }
    }

    fn keyed(vehicles: &[Vehicle]) -> HashMap<String, Vehicle> {
        vehicles
            .iter()
            .map(|v| (v.vehicle_id.clone(), v.clone()))
            .collect()
    }

    #[test]
    fn test_reconcile_from_empty() {
        let diff = reconcile(&HashMap::new(), &[vehicle("A", 43.6), vehicle("B", 43.7)]);

        assert_eq!(diff.added.len(), 2);
        assert!(diff.updated.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_reconcile_added_updated_removed() {
        let previous = keyed(&[vehicle("A", 43.6), vehicle("B", 43.7), vehicle("C", 43.8)]);
        let incoming = [vehicle("A", 43.6), vehicle("B", 43.75), vehicle("D", 43.9)];

        let diff = reconcile(&previous, &incoming);

        assert_eq!(diff.added, vec![vehicle("D", 43.9)]);
        assert_eq!(diff.updated, vec![vehicle("B", 43.75)]);
        assert_eq!(diff.removed, vec!["C".to_string()]);
    }

    #[test]
    fn test_reconcile_last_duplicate_wins() {
        let diff = reconcile(&HashMap::new(), &[vehicle("A", 43.6), vehicle("A", 43.65)]);

        assert_eq!(diff.added, vec![vehicle("A", 43.65)]);
    }

    #[test]
    fn test_apply_matches_incoming() {
        let mut current = keyed(&[vehicle("A", 43.6), vehicle("C", 43.8)]);
        let incoming = [vehicle("A", 43.61), vehicle("B", 43.7)];

        let diff = reconcile(&current, &incoming);
        diff.apply(&mut current);

        assert_eq!(current, keyed(&incoming));
    }

    #[test]
    fn test_unchanged_poll_is_empty_diff() {
        let current = keyed(&[vehicle("A", 43.6)]);

        assert!(reconcile(&current, &[vehicle("A", 43.6)]).is_empty());
    }
}
