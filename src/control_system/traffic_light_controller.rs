// control_system/traffic_light_controller.rs
// Single-green scheduler run at the end of every tick.

use crate::simulation_engine::intersections::IntersectionId;
use crate::simulation_engine::state::{LightState, WorkingSet};
use serde::Serialize;

/// Why the green phase moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandoffReason {
    /// Nobody held green.
    Vacant,
    /// The holder's countdown ran out.
    Expired,
    /// An emergency vehicle preempted the current holder.
    Emergency,
}

/// Outcome of a scheduler pass that changed or renewed the green phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Handoff {
    pub from: Option<IntersectionId>,
    pub to: IntersectionId,
    pub reason: HandoffReason,
}

/// Decides whether the green phase must move and applies the handoff.
///
/// Runs after every member has been advanced for the tick. On return the set
/// holds at most one green member. Returns `None` when the current holder
/// simply keeps its phase.
pub fn schedule(set: &mut WorkingSet) -> Option<Handoff> {
    if set.is_empty() {
        return None;
    }

    let holder = set.green_holder().map(|m| (m.id, m.countdown, m.has_emergency_vehicle));
    let from = holder.map(|(id, _, _)| id);

    if let Some(emergency) = set.first_emergency().map(|m| m.id) {
        // Every flagged member is forced green by the tick, so only a green
        // member without a vehicle counts as a holder being displaced.
        let displaced = set
            .iter()
            .find(|m| m.is_green() && !m.has_emergency_vehicle)
            .map(|m| m.id);
        let already_green = set.get(emergency).is_some_and(|m| m.is_green());
        if already_green && displaced.is_none() {
            demote_other_greens(set, emergency);
            return None;
        }
        hand_green_to(set, emergency);
        return Some(Handoff {
            from: displaced.or(from),
            to: emergency,
            reason: HandoffReason::Emergency,
        });
    }

    match holder {
        None => {
            let next = busiest_red(set)?;
            hand_green_to(set, next);
            Some(Handoff {
                from: None,
                to: next,
                reason: HandoffReason::Vacant,
            })
        }
        Some((id, 0, false)) => {
            // A lone member has no red rival, so its own phase restarts.
            let next = busiest_red(set).unwrap_or(id);
            hand_green_to(set, next);
            Some(Handoff {
                from: Some(id),
                to: next,
                reason: HandoffReason::Expired,
            })
        }
        Some((id, _, _)) => {
            demote_other_greens(set, id);
            None
        }
    }
}

/// Red member with the longest queue; equal queues go to the lowest id.
pub fn busiest_red(set: &WorkingSet) -> Option<IntersectionId> {
    set.iter()
        .filter(|m| m.light_state == LightState::Red)
        .max_by(|a, b| a.queue_count.cmp(&b.queue_count).then_with(|| b.id.cmp(&a.id)))
        .map(|m| m.id)
}

fn hand_green_to(set: &mut WorkingSet, next: IntersectionId) {
    for member in set.iter_mut() {
        member.set_red();
    }
    if let Some(member) = set.get_mut(next) {
        member.start_green_phase();
    }
    log::info!("Signal handoff: intersection {} is now green", next);
}

fn demote_other_greens(set: &mut WorkingSet, keep: IntersectionId) {
    for member in set.iter_mut() {
        if member.is_green() && member.id != keep {
            log::debug!("Demoting duplicate green at intersection {}", member.id);
            member.set_red();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global_variables::FULL_PHASE_DURATION;
    use crate::simulation_engine::state::test_support::{green_member, member};

    #[test]
    fn empty_set_is_quiescent() {
        let mut set = WorkingSet::default();
        assert_eq!(schedule(&mut set), None);
    }

    #[test]
    fn vacant_set_elects_busiest_red() {
        let mut set = WorkingSet::new(vec![member(1, 4), member(2, 11), member(3, 6)]);
        let handoff = schedule(&mut set).unwrap();
        assert_eq!(handoff.to, IntersectionId(2));
        assert_eq!(handoff.reason, HandoffReason::Vacant);
        let elected = set.get(IntersectionId(2)).unwrap();
        assert!(elected.is_green());
        assert_eq!(elected.countdown, FULL_PHASE_DURATION);
        assert_eq!(elected.queue_count, 0);
    }

    #[test]
    fn equal_queues_go_to_lowest_id() {
        let mut set = WorkingSet::new(vec![member(7, 8), member(3, 8), member(5, 2)]);
        assert_eq!(schedule(&mut set).unwrap().to, IntersectionId(3));
    }

    #[test]
    fn running_phase_is_left_alone() {
        let mut set = WorkingSet::new(vec![green_member(1, 12), member(2, 40)]);
        let before = set.clone();
        assert_eq!(schedule(&mut set), None);
        assert_eq!(set, before);
    }

    #[test]
    fn expired_phase_hands_off_and_resets_everyone() {
        let mut set = WorkingSet::new(vec![green_member(1, 0), member(2, 9), member(3, 14)]);
        set.get_mut(IntersectionId(2)).unwrap().countdown = 17;
        let handoff = schedule(&mut set).unwrap();
        assert_eq!(
            handoff,
            Handoff {
                from: Some(IntersectionId(1)),
                to: IntersectionId(3),
                reason: HandoffReason::Expired,
            }
        );
        assert_eq!(set.green_count(), 1);
        for m in set.iter() {
            assert_eq!(m.countdown, FULL_PHASE_DURATION);
        }
        assert!(!set.get(IntersectionId(1)).unwrap().is_green());
    }

    #[test]
    fn emergency_preempts_longest_queue() {
        let mut busy = member(1, 5);
        busy.queue_count = 5;
        let mut emergency = member(2, 0);
        emergency.has_emergency_vehicle = true;
        emergency.light_state = LightState::Green;
        let mut set = WorkingSet::new(vec![green_member(3, 20), busy, emergency]);

        let handoff = schedule(&mut set).unwrap();
        assert_eq!(handoff.to, IntersectionId(2));
        assert_eq!(handoff.reason, HandoffReason::Emergency);
        assert_eq!(set.green_count(), 1);
        assert!(set.get(IntersectionId(2)).unwrap().is_green());
    }

    #[test]
    fn sole_emergency_holder_keeps_phase() {
        let mut holder = green_member(2, 33);
        holder.has_emergency_vehicle = true;
        let mut set = WorkingSet::new(vec![member(1, 30), holder]);
        assert_eq!(schedule(&mut set), None);
        assert_eq!(set.get(IntersectionId(2)).unwrap().countdown, 33);
    }

    #[test]
    fn first_emergency_in_order_wins() {
        let mut a = member(9, 0);
        a.has_emergency_vehicle = true;
        let mut b = member(1, 0);
        b.has_emergency_vehicle = true;
        let mut set = WorkingSet::new(vec![a, b]);
        assert_eq!(schedule(&mut set).unwrap().to, IntersectionId(9));
        assert_eq!(set.green_count(), 1);
    }

    #[test]
    fn settled_emergency_holder_is_not_handed_off_again() {
        let mut a = member(9, 0);
        a.has_emergency_vehicle = true;
        let mut b = member(1, 0);
        b.has_emergency_vehicle = true;
        let mut set = WorkingSet::new(vec![a, b]);
        assert!(schedule(&mut set).is_some());

        for _ in 0..10 {
            // What the tick does to flagged members before scheduling.
            set.get_mut(IntersectionId(9)).unwrap().countdown = 38;
            set.get_mut(IntersectionId(1)).unwrap().light_state = LightState::Green;

            assert_eq!(schedule(&mut set), None);
            assert_eq!(set.green_count(), 1);
            let holder = set.green_holder().unwrap();
            assert_eq!(holder.id, IntersectionId(9));
            assert_eq!(holder.countdown, 38);
        }
    }

    #[test]
    fn emergency_reports_displaced_regular_holder() {
        let mut flagged = green_member(5, 45);
        flagged.has_emergency_vehicle = true;
        let mut set = WorkingSet::new(vec![flagged, green_member(2, 17)]);
        let handoff = schedule(&mut set).unwrap();
        assert_eq!(handoff.from, Some(IntersectionId(2)));
        assert_eq!(handoff.to, IntersectionId(5));
        assert_eq!(set.green_count(), 1);
    }

    #[test]
    fn lone_member_renews_its_own_phase() {
        let mut set = WorkingSet::new(vec![green_member(4, 0)]);
        let handoff = schedule(&mut set).unwrap();
        assert_eq!(handoff.to, IntersectionId(4));
        assert_eq!(set.get(IntersectionId(4)).unwrap().countdown, FULL_PHASE_DURATION);
    }

    #[test]
    fn duplicate_greens_collapse_to_first() {
        let mut set = WorkingSet::new(vec![member(1, 3), green_member(2, 10), green_member(3, 20)]);
        assert_eq!(schedule(&mut set), None);
        assert_eq!(set.green_count(), 1);
        assert!(set.get(IntersectionId(2)).unwrap().is_green());
    }
}
