// simulation_engine/state.rs

use crate::global_variables::{FULL_PHASE_DURATION, MAX_QUEUE_COUNT};
use crate::simulation_engine::intersections::{GeoPosition, Intersection, IntersectionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal phase of an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Red,
    Green,
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LightState::Red => write!(f, "RED"),
            LightState::Green => write!(f, "GREEN"),
        }
    }
}

/// Live simulation state for one working-set member.
///
/// The static fields (`name`, `position`, `parking_spots`) are copied from the
/// registry so readers can render a member without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionState {
    pub id: IntersectionId,
    pub name: String,
    pub position: GeoPosition,
    pub parking_spots: u32,
    /// Vehicles waiting, in `0..=MAX_QUEUE_COUNT`.
    pub queue_count: u32,
    pub light_state: LightState,
    /// Seconds left in the green phase. Only decremented while green.
    pub countdown: u32,
    pub has_emergency_vehicle: bool,
    pub violation_count: u32,
    pub parking_available: u32,
    /// Derived every tick from the hourly profile; informational only.
    pub predicted_next_hour_count: u32,
}

impl IntersectionState {
    /// Baseline state for an intersection entering the working set.
    pub fn from_registry(intersection: &Intersection) -> Self {
        Self {
            id: intersection.id,
            name: intersection.name.clone(),
            position: intersection.position,
            parking_spots: intersection.parking_spots,
            queue_count: intersection.baseline_queue.min(MAX_QUEUE_COUNT),
            light_state: LightState::Red,
            countdown: FULL_PHASE_DURATION,
            has_emergency_vehicle: false,
            violation_count: 0,
            parking_available: intersection.baseline_parking.min(intersection.parking_spots),
            predicted_next_hour_count: 0,
        }
    }

    pub fn is_green(&self) -> bool {
        self.light_state == LightState::Green
    }

    /// Starts a fresh green phase: full countdown, queue discharged.
    pub fn start_green_phase(&mut self) {
        self.light_state = LightState::Green;
        self.countdown = FULL_PHASE_DURATION;
        self.queue_count = 0;
    }

    pub fn set_red(&mut self) {
        self.light_state = LightState::Red;
        self.countdown = FULL_PHASE_DURATION;
    }
}

/// The bounded subset of intersections currently under simulation.
///
/// Member order is meaningful: it is the order the viewport selector produced
/// and the order emergency ties are resolved in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WorkingSet {
    members: Vec<IntersectionState>,
}

impl WorkingSet {
    pub fn new(members: Vec<IntersectionState>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntersectionState> {
        self.members.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IntersectionState> {
        self.members.iter_mut()
    }

    pub fn get(&self, id: IntersectionId) -> Option<&IntersectionState> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: IntersectionId) -> Option<&mut IntersectionState> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    pub fn contains(&self, id: IntersectionId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<IntersectionId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// First green member in working-set order.
    pub fn green_holder(&self) -> Option<&IntersectionState> {
        self.members.iter().find(|m| m.is_green())
    }

    pub fn green_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_green()).count()
    }

    /// First member reporting an emergency vehicle, in working-set order.
    pub fn first_emergency(&self) -> Option<&IntersectionState> {
        self.members.iter().find(|m| m.has_emergency_vehicle)
    }

    pub fn as_slice(&self) -> &[IntersectionState] {
        &self.members
    }
}

impl FromIterator<IntersectionState> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = IntersectionState>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for WorkingSet {
    type Item = IntersectionState;
    type IntoIter = std::vec::IntoIter<IntersectionState>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{green_member, member};
    use super::*;

    #[test]
    fn new_members_start_red_at_baseline() {
        let intersection = Intersection::new(
            4,
            "Park Circus",
            GeoPosition::new(22.5397, 88.3693),
            100,
            20,
            60,
            [0; 24],
        );
        let state = IntersectionState::from_registry(&intersection);
        assert_eq!(state.light_state, LightState::Red);
        assert_eq!(state.countdown, FULL_PHASE_DURATION);
        assert_eq!(state.queue_count, 20);
        assert_eq!(state.parking_available, 60);
        assert_eq!(state.violation_count, 0);
        assert!(!state.has_emergency_vehicle);
    }

    #[test]
    fn green_holder_is_first_green_in_order() {
        let set = WorkingSet::new(vec![member(1, 3), green_member(5, 10), green_member(2, 4)]);
        assert_eq!(set.green_holder().map(|m| m.id), Some(IntersectionId(5)));
        assert_eq!(set.green_count(), 2);
    }
}
