// flow_analyzer/traffic_analyzer.rs

use crate::global_variables::HOURS_PER_DAY;
use crate::simulation_engine::intersections::{IntersectionId, IntersectionRegistry};
use crate::simulation_engine::state::{IntersectionState, WorkingSet};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Hour-over-hour movement of an intersection's demand profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficTrend {
    pub id: IntersectionId,
    pub name: String,
    pub current_count: u32,
    pub direction: TrendDirection,
    /// Rounded to one decimal. Zero when the previous hour had no demand.
    pub percentage_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CongestionLevel {
    Light,
    Moderate,
    Heavy,
}

impl CongestionLevel {
    pub fn from_queue(queue_count: u32) -> Self {
        if queue_count > 30 {
            CongestionLevel::Heavy
        } else if queue_count > 15 {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Light
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParkingLevel {
    Ample,
    Limited,
    Critical,
}

impl ParkingLevel {
    pub fn from_availability(available: u32, spots: u32) -> Self {
        let share = if spots == 0 {
            0.0
        } else {
            available as f64 / spots as f64
        };
        if share < 0.2 {
            ParkingLevel::Critical
        } else if share < 0.5 {
            ParkingLevel::Limited
        } else {
            ParkingLevel::Ample
        }
    }
}

/// (direction, percentage change) from the previous hour's value to `hour`'s.
pub fn traffic_trend(profile: &[u32; HOURS_PER_DAY], hour: usize) -> (TrendDirection, f64) {
    let current = profile[hour % HOURS_PER_DAY] as f64;
    let previous = profile[(hour + HOURS_PER_DAY - 1) % HOURS_PER_DAY] as f64;
    let change = current - previous;

    let percentage = if previous != 0.0 {
        (change / previous * 1000.0).round() / 10.0
    } else {
        0.0
    };
    let direction = if change > 0.0 {
        TrendDirection::Increasing
    } else if change < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    (direction, percentage)
}

/// Trends for every working-set member at `hour`.
pub fn analyze_trends(set: &WorkingSet, registry: &IntersectionRegistry, hour: usize) -> Vec<TrafficTrend> {
    set.iter()
        .filter_map(|member| {
            let intersection = registry.get(member.id)?;
            let (direction, percentage_change) = traffic_trend(&intersection.hourly_profile, hour);
            Some(TrafficTrend {
                id: member.id,
                name: member.name.clone(),
                current_count: member.queue_count,
                direction,
                percentage_change,
            })
        })
        .collect()
}

/// Aggregate view of the working set for the operator console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub members: usize,
    pub green: Option<IntersectionId>,
    pub green_countdown: Option<u32>,
    pub total_queued: u32,
    pub emergencies: Vec<IntersectionId>,
    pub total_violations: u32,
    pub most_congested: Option<(IntersectionId, CongestionLevel)>,
}

pub fn system_status(set: &WorkingSet) -> SystemStatus {
    let holder = set.green_holder();
    let most_congested = set
        .iter()
        .max_by(|a, b| a.queue_count.cmp(&b.queue_count).then_with(|| b.id.cmp(&a.id)))
        .map(|m: &IntersectionState| (m.id, CongestionLevel::from_queue(m.queue_count)));

    SystemStatus {
        members: set.len(),
        green: holder.map(|m| m.id),
        green_countdown: holder.map(|m| m.countdown),
        total_queued: set.iter().map(|m| m.queue_count).sum(),
        emergencies: set.iter().filter(|m| m.has_emergency_vehicle).map(|m| m.id).collect(),
        total_violations: set.iter().map(|m| m.violation_count).sum(),
        most_congested,
    }
}
