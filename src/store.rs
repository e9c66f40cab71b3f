// store.rs
// Owner of the registry, working set and notification log.

use crate::config::{read_file, SimulationConfig};
use crate::control_system::commands::{apply_action, derive_notification, Command, MemberAction, ViolationType};
use crate::control_system::traffic_light_controller::schedule;
use crate::error::Result;
use crate::flow_analyzer::traffic_analyzer::{analyze_trends, system_status, SystemStatus, TrafficTrend};
use crate::global_variables::{DEFAULT_ARRIVAL_PROBABILITY, HOURS_PER_DAY, NOTIFICATION_CAPACITY};
use crate::monitoring::notifications::{Notification, NotificationSink};
use crate::shared_data::{Clock, SystemClock, TickReport};
use crate::simulation_engine::intersections::{IntersectionId, IntersectionRegistry};
use crate::simulation_engine::route_generation::{emergency_route, EmergencyRoute};
use crate::simulation_engine::simulation::{advance, TickParams};
use crate::simulation_engine::state::WorkingSet;
use crate::simulation_engine::viewport::{elect_cold_start, select_working_set, Bounds};
use chrono::Timelike;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Single owner of all simulation state.
///
/// Every mutation goes through [`TrafficStore::dispatch`] or
/// [`TrafficStore::tick`]; readers only ever see fully applied states.
pub struct TrafficStore {
    registry: IntersectionRegistry,
    working_set: WorkingSet,
    notifications: NotificationSink,
    /// Set once the first non-empty working set has elected a green holder.
    initialized: bool,
    emergency_route_active: bool,
    arrival_probability: f64,
    ticks: u64,
    rng: SmallRng,
    clock: Box<dyn Clock>,
}

impl TrafficStore {
    pub fn new(registry: IntersectionRegistry, rng: SmallRng, clock: Box<dyn Clock>) -> Self {
        Self {
            registry,
            working_set: WorkingSet::default(),
            notifications: NotificationSink::new(NOTIFICATION_CAPACITY),
            initialized: false,
            emergency_route_active: false,
            arrival_probability: DEFAULT_ARRIVAL_PROBABILITY,
            ticks: 0,
            rng,
            clock,
        }
    }

    /// Builds a store from configuration and applies the initial viewport.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let registry = match &config.catalog_path {
            Some(path) => IntersectionRegistry::from_json(&read_file(path)?, &mut rng)?,
            None => IntersectionRegistry::kolkata(&mut rng),
        };
        log::info!("Loaded {} intersections", registry.len());

        let bounds = config.initial_viewport.or_else(|| Bounds::covering(&registry));
        let mut store = Self::new(registry, rng, Box::new(SystemClock))
            .with_arrival_probability(config.arrival_probability);
        store.update_viewport(bounds);
        Ok(store)
    }

    pub fn with_arrival_probability(mut self, probability: f64) -> Self {
        self.arrival_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.notifications()
    }

    pub fn hourly_profile(&self, id: IntersectionId) -> Option<[u32; HOURS_PER_DAY]> {
        self.registry.hourly_profile(id)
    }

    pub fn registry(&self) -> &IntersectionRegistry {
        &self.registry
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn current_hour(&self) -> usize {
        self.clock.now().hour() as usize
    }

    pub fn set_emergency_route_active(&mut self, active: bool) {
        self.emergency_route_active = active;
    }

    /// The emergency line, when route display is active and a member has an emergency vehicle.
    pub fn emergency_route(&self) -> Option<EmergencyRoute> {
        if !self.emergency_route_active {
            return None;
        }
        emergency_route(&self.working_set, &self.registry)
    }

    pub fn trends(&self) -> Vec<TrafficTrend> {
        analyze_trends(&self.working_set, &self.registry, self.current_hour())
    }

    pub fn status(&self) -> SystemStatus {
        system_status(&self.working_set)
    }

    /// Applies one command. Commands naming an id outside the working set are ignored.
    pub fn dispatch(&mut self, command: Command) -> Option<Notification> {
        match command {
            Command::Member { id, action } => self.apply_member_action(id, action),
            Command::UpdateViewport(bounds) => {
                self.apply_viewport(bounds);
                None
            }
        }
    }

    pub fn set_manual_timer(&mut self, id: IntersectionId, seconds: i64) {
        self.dispatch(Command::set_manual_timer(id, seconds));
    }

    pub fn report_emergency_vehicle(&mut self, id: IntersectionId, present: bool) -> Option<Notification> {
        self.dispatch(Command::report_emergency_vehicle(id, present))
    }

    pub fn adjust_parking(&mut self, id: IntersectionId, delta: i64) -> Option<Notification> {
        self.dispatch(Command::adjust_parking(id, delta))
    }

    pub fn record_violation(&mut self, id: IntersectionId, violation: ViolationType) -> Option<Notification> {
        self.dispatch(Command::record_violation(id, violation))
    }

    pub fn update_viewport(&mut self, bounds: Option<Bounds>) {
        self.dispatch(Command::update_viewport(bounds));
    }

    /// Advances the simulation by one tick and publishes the result.
    pub fn tick(&mut self) -> TickReport {
        let timestamp = self.clock.now();
        let params = TickParams {
            hour: timestamp.hour() as usize,
            arrival_probability: self.arrival_probability,
        };

        let mut next = advance(&self.working_set, &self.registry, params, &mut self.rng);
        let handoff = schedule(&mut next);
        self.working_set = next;
        self.ticks += 1;

        log::debug!(
            "Tick {}: {} members, green = {:?}",
            self.ticks,
            self.working_set.len(),
            self.working_set.green_holder().map(|m| m.id)
        );
        TickReport {
            tick: self.ticks,
            timestamp,
            handoff,
        }
    }

    fn apply_member_action(&mut self, id: IntersectionId, action: MemberAction) -> Option<Notification> {
        let Some(before) = self.working_set.get(id).cloned() else {
            log::warn!("Ignoring {:?} for intersection {} outside the working set", action, id);
            return None;
        };

        let after = apply_action(&before, action);
        let message = derive_notification(action, &before, &after);
        if let Some(member) = self.working_set.get_mut(id) {
            *member = after;
        }
        if matches!(action, MemberAction::ReportEmergencyVehicle(true)) && !before.has_emergency_vehicle {
            log::info!("Emergency vehicle reported at intersection {}", id);
        }

        let timestamp = self.clock.now();
        message.map(|message| self.notifications.append(message, timestamp))
    }

    fn apply_viewport(&mut self, bounds: Option<Bounds>) {
        if bounds.is_none() {
            return;
        }
        let mut next = select_working_set(bounds.as_ref(), &self.registry, &self.working_set);
        if !self.initialized && !next.is_empty() {
            if let Some(elected) = elect_cold_start(&mut next) {
                log::info!("Cold start: intersection {} elected green", elected);
            }
            self.initialized = true;
        }
        log::info!("Viewport now covers intersections {:?}", next.ids());
        self.working_set = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global_variables::FULL_PHASE_DURATION;
    use crate::shared_data::FixedClock;
    use crate::simulation_engine::intersections::{GeoPosition, Intersection};

    fn store(points: &[(u32, f64, f64, u32)]) -> TrafficStore {
        let registry = IntersectionRegistry::new(
            points
                .iter()
                .map(|&(id, lat, lng, queue)| {
                    Intersection::new(id, &format!("Junction {}", id), GeoPosition::new(lat, lng), 100, queue, 50, [5; 24])
                })
                .collect(),
        )
        .unwrap();
        TrafficStore::new(registry, SmallRng::seed_from_u64(11), Box::new(FixedClock::at_hour(9)))
    }

    fn everywhere() -> Option<Bounds> {
        Some(Bounds::new(90.0, -90.0, 180.0, -180.0))
    }

    #[test]
    fn first_viewport_elects_busiest_only_once() {
        let mut store = store(&[(1, 0.0, 0.0, 3), (2, 0.1, 0.0, 9), (3, 0.2, 0.0, 1)]);
        store.update_viewport(everywhere());
        assert_eq!(store.working_set().green_holder().map(|m| m.id), Some(IntersectionId(2)));

        store.set_manual_timer(IntersectionId(2), 20);
        store.update_viewport(everywhere());
        let holder = store.working_set().green_holder().unwrap();
        assert_eq!(holder.id, IntersectionId(2));
        assert_eq!(holder.countdown, 20);
    }

    #[test]
    fn empty_first_viewport_defers_election() {
        let mut store = store(&[(1, 0.0, 0.0, 3), (2, 0.1, 0.0, 9)]);
        store.update_viewport(Some(Bounds::new(50.0, 40.0, 50.0, 40.0)));
        assert!(store.working_set().is_empty());
        store.update_viewport(everywhere());
        assert_eq!(store.working_set().green_holder().map(|m| m.id), Some(IntersectionId(2)));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut store = store(&[(1, 0.0, 0.0, 3)]);
        store.update_viewport(everywhere());
        let before = store.working_set().clone();
        assert!(store.record_violation(IntersectionId(99), ViolationType::Speeding).is_none());
        assert!(store.report_emergency_vehicle(IntersectionId(99), true).is_none());
        store.set_manual_timer(IntersectionId(99), 30);
        assert_eq!(store.working_set(), &before);
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn emergency_report_notifies_and_preempts_on_next_tick() {
        let mut store = store(&[(1, 0.0, 0.0, 5), (2, 0.1, 0.0, 2)]).with_arrival_probability(0.0);
        store.update_viewport(everywhere());
        assert_eq!(store.working_set().green_holder().map(|m| m.id), Some(IntersectionId(1)));

        let note = store.report_emergency_vehicle(IntersectionId(2), true).unwrap();
        assert_eq!(note.message, "Emergency vehicle reported at Junction 2");

        let report = store.tick();
        assert_eq!(report.handoff.map(|h| h.to), Some(IntersectionId(2)));
        assert_eq!(store.working_set().green_count(), 1);
        assert_eq!(store.working_set().green_holder().map(|m| m.id), Some(IntersectionId(2)));
    }

    #[test]
    fn two_emergencies_hand_off_once() {
        let mut store = store(&[(1, 0.0, 0.0, 5), (2, 0.1, 0.0, 2), (3, 0.2, 0.0, 8)]).with_arrival_probability(0.0);
        store.update_viewport(everywhere());
        store.report_emergency_vehicle(IntersectionId(1), true);
        store.report_emergency_vehicle(IntersectionId(2), true);

        let first = store.tick().handoff.unwrap();
        assert_eq!(first.from, Some(IntersectionId(3)));
        assert_eq!(first.to, IntersectionId(1));

        for _ in 0..10 {
            assert_eq!(store.tick().handoff, None);
            assert_eq!(store.working_set().green_count(), 1);
            assert_eq!(store.working_set().green_holder().map(|m| m.id), Some(IntersectionId(1)));
        }
    }

    #[test]
    fn extreme_parking_delta_is_clamped() {
        let mut store = store(&[(1, 0.0, 0.0, 5)]);
        store.update_viewport(everywhere());
        assert!(store.adjust_parking(IntersectionId(1), i64::MAX).is_none());
        assert_eq!(store.working_set().get(IntersectionId(1)).unwrap().parking_available, 100);
        store.dispatch(Command::adjust_manual_timer(IntersectionId(1), i64::MAX));
        assert_eq!(store.working_set().get(IntersectionId(1)).unwrap().countdown, 60);
    }

    #[test]
    fn tick_uses_clock_hour_for_prediction() {
        let mut store = store(&[(1, 0.0, 0.0, 5)]);
        store.update_viewport(everywhere());
        store.tick();
        assert_eq!(store.working_set().get(IntersectionId(1)).unwrap().predicted_next_hour_count, 5);
        assert_eq!(store.tick_count(), 1);
    }

    #[test]
    fn green_phase_expires_after_full_duration() {
        let mut store = store(&[(1, 0.0, 0.0, 5), (2, 0.1, 0.0, 2)]).with_arrival_probability(0.0);
        store.update_viewport(everywhere());
        for _ in 0..FULL_PHASE_DURATION - 1 {
            assert!(store.tick().handoff.is_none());
        }
        let handoff = store.tick().handoff.unwrap();
        assert_eq!(handoff.from, Some(IntersectionId(1)));
        assert_eq!(handoff.to, IntersectionId(2));
    }

    #[test]
    fn route_is_hidden_until_activated() {
        let mut store = store(&[(1, 0.0, 0.0, 5), (2, 0.1, 0.0, 2)]);
        store.update_viewport(everywhere());
        store.report_emergency_vehicle(IntersectionId(1), true);
        assert!(store.emergency_route().is_none());
        store.set_emergency_route_active(true);
        assert_eq!(store.emergency_route().map(|r| r.to), Some(IntersectionId(2)));
    }
}
