// simulation_engine/simulation.rs
// One engine tick over the working set: arrivals, countdowns, emergency pinning.

use crate::global_variables::{EMERGENCY_MIN_COUNTDOWN, HOURS_PER_DAY, MANUAL_TIMER_MAX, MAX_QUEUE_COUNT};
use crate::simulation_engine::intersections::IntersectionRegistry;
use crate::simulation_engine::state::{IntersectionState, LightState, WorkingSet};
use rand::Rng;

/// Inputs to one tick that do not live in the working set.
#[derive(Debug, Clone, Copy)]
pub struct TickParams {
    /// Local hour of day, `0..24`.
    pub hour: usize,
    /// Chance a red intersection gains one vehicle this tick.
    pub arrival_probability: f64,
}

/// Advances every member by one tick and returns the next working set.
///
/// The input is left untouched so a caller can swap the result in atomically.
/// Signal handoff is not decided here; see
/// [`crate::control_system::traffic_light_controller::schedule`].
pub fn advance<R: Rng + ?Sized>(
    set: &WorkingSet,
    registry: &IntersectionRegistry,
    params: TickParams,
    rng: &mut R,
) -> WorkingSet {
    set.iter()
        .map(|member| {
            let mut next = member.clone();
            advance_member(&mut next, params.arrival_probability, rng);
            next.predicted_next_hour_count = registry
                .get(next.id)
                .map(|i| i.predicted_next_hour(params.hour % HOURS_PER_DAY))
                .unwrap_or(0);
            next
        })
        .collect()
}

fn advance_member<R: Rng + ?Sized>(member: &mut IntersectionState, arrival_probability: f64, rng: &mut R) {
    if member.has_emergency_vehicle {
        member.light_state = LightState::Green;
        member.countdown = member.countdown.max(EMERGENCY_MIN_COUNTDOWN);
        member.queue_count = 0;
    } else if member.is_green() {
        member.countdown = member.countdown.saturating_sub(1);
        member.queue_count = 0;
    } else if rng.random_bool(arrival_probability) {
        member.queue_count = (member.queue_count + 1).min(MAX_QUEUE_COUNT);
    }

    member.queue_count = member.queue_count.min(MAX_QUEUE_COUNT);
    member.countdown = member.countdown.min(MANUAL_TIMER_MAX);
}
