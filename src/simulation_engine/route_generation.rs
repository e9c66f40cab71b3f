// simulation_engine/route_generation.rs
// Straight-line route from an emergency vehicle to the nearest junction.

use crate::simulation_engine::intersections::{GeoPosition, IntersectionId, IntersectionRegistry};
use crate::simulation_engine::state::WorkingSet;
use serde::Serialize;
use std::cmp::Ordering;

/// Straight line from an intersection holding an emergency vehicle to its
/// nearest catalogued neighbour. Not a road route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmergencyRoute {
    pub from: IntersectionId,
    pub to: IntersectionId,
    pub path: [GeoPosition; 2],
}

pub fn emergency_route(set: &WorkingSet, registry: &IntersectionRegistry) -> Option<EmergencyRoute> {
    let origin = set.first_emergency()?;
    let destination = registry
        .iter()
        .filter(|i| i.id != origin.id)
        .min_by(|a, b| {
            a.position
                .distance_to(&origin.position)
                .partial_cmp(&b.position.distance_to(&origin.position))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        })?;

    Some(EmergencyRoute {
        from: origin.id,
        to: destination.id,
        path: [origin.position, destination.position],
    })
}
