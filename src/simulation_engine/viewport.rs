// simulation_engine/viewport.rs
// Viewport bounds and the working-set selection they drive.

use crate::global_variables::MAX_WORKING_SET_SIZE;
use crate::simulation_engine::intersections::{GeoPosition, Intersection, IntersectionId, IntersectionRegistry};
use crate::simulation_engine::state::{IntersectionState, WorkingSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Geographic rectangle, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn contains(&self, position: &GeoPosition) -> bool {
        position.lat >= self.south
            && position.lat <= self.north
            && position.lng >= self.west
            && position.lng <= self.east
    }

    pub fn center(&self) -> GeoPosition {
        GeoPosition::new((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
    }

    /// Smallest rectangle covering every intersection in the registry.
    pub fn covering(registry: &IntersectionRegistry) -> Option<Self> {
        let mut positions = registry.iter().map(|i| i.position);
        let first = positions.next()?;
        Some(positions.fold(
            Bounds::new(first.lat, first.lat, first.lng, first.lng),
            |b, p| Bounds::new(b.north.max(p.lat), b.south.min(p.lat), b.east.max(p.lng), b.west.min(p.lng)),
        ))
    }
}

/// Intersections inside `bounds`, capped at [`MAX_WORKING_SET_SIZE`].
///
/// When more fit than the cap allows, the ones nearest the rectangle centre win,
/// ties going to the lower id. Otherwise registry order is kept.
pub fn visible_intersections<'a>(bounds: &Bounds, registry: &'a IntersectionRegistry) -> Vec<&'a Intersection> {
    let mut candidates: Vec<&Intersection> = registry.iter().filter(|i| bounds.contains(&i.position)).collect();
    if candidates.len() <= MAX_WORKING_SET_SIZE {
        return candidates;
    }

    let center = bounds.center();
    candidates.sort_by(|a, b| {
        a.position
            .distance_to(&center)
            .partial_cmp(&b.position.distance_to(&center))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(MAX_WORKING_SET_SIZE);
    candidates
}

/// Recomputes the working set for a new viewport.
///
/// Members already present in `previous` keep their live state verbatim;
/// newcomers start from the registry baseline. No bounds means no change.
pub fn select_working_set(
    bounds: Option<&Bounds>,
    registry: &IntersectionRegistry,
    previous: &WorkingSet,
) -> WorkingSet {
    let Some(bounds) = bounds else {
        return previous.clone();
    };

    visible_intersections(bounds, registry)
        .into_iter()
        .map(|intersection| match previous.get(intersection.id) {
            Some(existing) => existing.clone(),
            None => IntersectionState::from_registry(intersection),
        })
        .collect()
}

/// Elects the busiest member to green so a fresh simulation never starts all red.
/// Equal queues go to the lower id. Returns the elected id.
pub fn elect_cold_start(set: &mut WorkingSet) -> Option<IntersectionId> {
    let elected = set
        .iter()
        .max_by(|a, b| a.queue_count.cmp(&b.queue_count).then_with(|| b.id.cmp(&a.id)))
        .map(|m| m.id)?;

    for member in set.iter_mut() {
        if member.id == elected {
            member.start_green_phase();
        } else {
            member.set_red();
        }
    }
    Some(elected)
}
