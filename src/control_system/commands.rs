// control_system/commands.rs
// Operator commands and their pure state transitions.

use crate::error::TrafficError;
use crate::global_variables::{FULL_PHASE_DURATION, LOW_PARKING_RATIO, MANUAL_TIMER_MAX, MANUAL_TIMER_MIN};
use crate::simulation_engine::intersections::IntersectionId;
use crate::simulation_engine::state::{IntersectionState, LightState};
use crate::simulation_engine::viewport::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    RedLight,
    Speeding,
    WrongWay,
    NoParking,
}

impl ViolationType {
    pub const ALL: [ViolationType; 4] = [
        ViolationType::RedLight,
        ViolationType::Speeding,
        ViolationType::WrongWay,
        ViolationType::NoParking,
    ];
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ViolationType::RedLight => write!(f, "Red Light Violation"),
            ViolationType::Speeding => write!(f, "Speeding"),
            ViolationType::WrongWay => write!(f, "Wrong Way"),
            ViolationType::NoParking => write!(f, "No Parking"),
        }
    }
}

impl FromStr for ViolationType {
    type Err = TrafficError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "red" | "redlight" | "redlightviolation" => Ok(ViolationType::RedLight),
            "speeding" => Ok(ViolationType::Speeding),
            "wrongway" => Ok(ViolationType::WrongWay),
            "noparking" => Ok(ViolationType::NoParking),
            _ => Err(TrafficError::Parse {
                input: s.to_string(),
                reason: "expected one of red-light, speeding, wrong-way, no-parking".to_string(),
            }),
        }
    }
}

/// A mutation against a single working-set member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberAction {
    /// Absolute countdown, clamped to the manual range.
    SetManualTimer(i64),
    /// Relative countdown change, clamped to the manual range.
    AdjustManualTimer(i64),
    ReportEmergencyVehicle(bool),
    AdjustParking(i64),
    RecordViolation(ViolationType),
}

/// Discrete message accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Member { id: IntersectionId, action: MemberAction },
    UpdateViewport(Option<Bounds>),
}

impl Command {
    pub fn set_manual_timer(id: IntersectionId, seconds: i64) -> Self {
        Command::Member {
            id,
            action: MemberAction::SetManualTimer(seconds),
        }
    }

    pub fn adjust_manual_timer(id: IntersectionId, delta: i64) -> Self {
        Command::Member {
            id,
            action: MemberAction::AdjustManualTimer(delta),
        }
    }

    pub fn report_emergency_vehicle(id: IntersectionId, present: bool) -> Self {
        Command::Member {
            id,
            action: MemberAction::ReportEmergencyVehicle(present),
        }
    }

    pub fn adjust_parking(id: IntersectionId, delta: i64) -> Self {
        Command::Member {
            id,
            action: MemberAction::AdjustParking(delta),
        }
    }

    pub fn record_violation(id: IntersectionId, violation: ViolationType) -> Self {
        Command::Member {
            id,
            action: MemberAction::RecordViolation(violation),
        }
    }

    pub fn update_viewport(bounds: Option<Bounds>) -> Self {
        Command::UpdateViewport(bounds)
    }
}

pub fn clamp_manual_timer(seconds: i64) -> u32 {
    seconds.clamp(MANUAL_TIMER_MIN as i64, MANUAL_TIMER_MAX as i64) as u32
}

/// Next state of `member` after `action`. Pure.
pub fn apply_action(member: &IntersectionState, action: MemberAction) -> IntersectionState {
    let mut next = member.clone();
    match action {
        MemberAction::SetManualTimer(seconds) => {
            next.countdown = clamp_manual_timer(seconds);
        }
        MemberAction::AdjustManualTimer(delta) => {
            next.countdown = clamp_manual_timer((member.countdown as i64).saturating_add(delta));
        }
        MemberAction::ReportEmergencyVehicle(true) => {
            if !member.has_emergency_vehicle {
                next.has_emergency_vehicle = true;
                next.light_state = LightState::Green;
                next.countdown = FULL_PHASE_DURATION;
            }
        }
        MemberAction::ReportEmergencyVehicle(false) => {
            next.has_emergency_vehicle = false;
        }
        MemberAction::AdjustParking(delta) => {
            let available = (member.parking_available as i64).saturating_add(delta);
            next.parking_available = available.clamp(0, member.parking_spots as i64) as u32;
        }
        MemberAction::RecordViolation(_) => {
            next.violation_count = member.violation_count.saturating_add(1);
        }
    }
    next
}

/// Message a transition should raise, if any. Pure.
///
/// The parking alert fires on every adjustment that leaves availability in
/// the low band, not only on the call that first crosses into it.
pub fn derive_notification(
    action: MemberAction,
    before: &IntersectionState,
    after: &IntersectionState,
) -> Option<String> {
    match action {
        MemberAction::ReportEmergencyVehicle(true) if !before.has_emergency_vehicle => {
            Some(format!("Emergency vehicle reported at {}", after.name))
        }
        MemberAction::AdjustParking(_) if is_low_parking(after) => {
            Some(format!("Parking at {} is nearly full", after.name))
        }
        MemberAction::RecordViolation(violation) => Some(format!(
            "Traffic violation detected at {}: {}",
            after.name, violation
        )),
        _ => None,
    }
}

pub fn is_low_parking(member: &IntersectionState) -> bool {
    (member.parking_available as f64) < member.parking_spots as f64 * LOW_PARKING_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::state::test_support::{green_member, member};

    #[test]
    fn manual_timer_is_clamped() {
        let m = member(1, 0);
        assert_eq!(apply_action(&m, MemberAction::SetManualTimer(200)).countdown, 60);
        assert_eq!(apply_action(&m, MemberAction::SetManualTimer(-50)).countdown, 5);
        assert_eq!(apply_action(&m, MemberAction::SetManualTimer(25)).countdown, 25);
    }

    #[test]
    fn relative_timer_adjustment_is_clamped() {
        let m = green_member(1, 58);
        assert_eq!(apply_action(&m, MemberAction::AdjustManualTimer(5)).countdown, 60);
        let m = green_member(1, 7);
        assert_eq!(apply_action(&m, MemberAction::AdjustManualTimer(-5)).countdown, 5);
    }

    #[test]
    fn extreme_deltas_saturate_instead_of_wrapping() {
        let m = green_member(1, 30);
        assert_eq!(apply_action(&m, MemberAction::AdjustManualTimer(i64::MAX)).countdown, 60);
        assert_eq!(apply_action(&m, MemberAction::AdjustManualTimer(i64::MIN)).countdown, 5);

        let m = member(1, 0);
        let full = apply_action(&m, MemberAction::AdjustParking(i64::MAX));
        assert_eq!(full.parking_available, 100);
        assert!(derive_notification(MemberAction::AdjustParking(i64::MAX), &m, &full).is_none());
        let empty = apply_action(&m, MemberAction::AdjustParking(i64::MIN));
        assert_eq!(empty.parking_available, 0);
        assert!(derive_notification(MemberAction::AdjustParking(i64::MIN), &m, &empty).is_some());
    }

    #[test]
    fn emergency_report_forces_green_once() {
        let m = member(1, 12);
        let after = apply_action(&m, MemberAction::ReportEmergencyVehicle(true));
        assert!(after.has_emergency_vehicle);
        assert!(after.is_green());
        assert_eq!(after.countdown, FULL_PHASE_DURATION);
        assert!(derive_notification(MemberAction::ReportEmergencyVehicle(true), &m, &after).is_some());

        let mut pinned = after.clone();
        pinned.countdown = 31;
        let again = apply_action(&pinned, MemberAction::ReportEmergencyVehicle(true));
        assert_eq!(again, pinned);
        assert!(derive_notification(MemberAction::ReportEmergencyVehicle(true), &pinned, &again).is_none());
    }

    #[test]
    fn clearing_emergency_keeps_phase() {
        let mut m = green_member(1, 40);
        m.has_emergency_vehicle = true;
        let after = apply_action(&m, MemberAction::ReportEmergencyVehicle(false));
        assert!(!after.has_emergency_vehicle);
        assert!(after.is_green());
        assert_eq!(after.countdown, 40);
        assert!(derive_notification(MemberAction::ReportEmergencyVehicle(false), &m, &after).is_none());
    }

    #[test]
    fn parking_is_bounded_and_alerts_in_low_band() {
        let m = member(1, 0); // 50 of 100 free
        let full = apply_action(&m, MemberAction::AdjustParking(500));
        assert_eq!(full.parking_available, 100);
        let empty = apply_action(&m, MemberAction::AdjustParking(-500));
        assert_eq!(empty.parking_available, 0);
        assert!(derive_notification(MemberAction::AdjustParking(-500), &m, &empty).is_some());

        let mut nine = m.clone();
        nine.parking_available = 9;
        let ten = apply_action(&nine, MemberAction::AdjustParking(1));
        assert_eq!(ten.parking_available, 10);
        assert!(derive_notification(MemberAction::AdjustParking(1), &nine, &ten).is_none());
        let eight = apply_action(&nine, MemberAction::AdjustParking(-1));
        assert!(derive_notification(MemberAction::AdjustParking(-1), &nine, &eight).is_some());
    }

    #[test]
    fn violations_always_notify() {
        let m = member(3, 0);
        let after = apply_action(&m, MemberAction::RecordViolation(ViolationType::WrongWay));
        assert_eq!(after.violation_count, 1);
        assert_eq!(
            derive_notification(MemberAction::RecordViolation(ViolationType::WrongWay), &m, &after).as_deref(),
            Some("Traffic violation detected at Junction 3: Wrong Way")
        );
    }

    #[test]
    fn violation_types_parse_loosely() {
        assert_eq!("red-light".parse::<ViolationType>().unwrap(), ViolationType::RedLight);
        assert_eq!("Wrong Way".parse::<ViolationType>().unwrap(), ViolationType::WrongWay);
        assert_eq!("no_parking".parse::<ViolationType>().unwrap(), ViolationType::NoParking);
        assert!("jaywalking".parse::<ViolationType>().is_err());
    }
}
