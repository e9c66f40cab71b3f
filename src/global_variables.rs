// global_variables.rs

// Queue limits
pub const MAX_QUEUE_COUNT: u32 = 40;

// Signal timing (seconds)
pub const FULL_PHASE_DURATION: u32 = 45;
pub const EMERGENCY_MIN_COUNTDOWN: u32 = 30;
pub const MANUAL_TIMER_MIN: u32 = 5;
pub const MANUAL_TIMER_MAX: u32 = 60;

// Vehicle arrival while red
pub const DEFAULT_ARRIVAL_PROBABILITY: f64 = 0.2;

// Viewport
pub const MAX_WORKING_SET_SIZE: usize = 5;

// Notifications
pub const NOTIFICATION_CAPACITY: usize = 10;

// Parking alert fires when availability drops below this share of capacity.
pub const LOW_PARKING_RATIO: f64 = 0.1;

// Tick driver
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1000;
// tokio's interval rejects a zero period.
pub const MIN_TICK_PERIOD: std::time::Duration = std::time::Duration::from_millis(1);

pub const HOURS_PER_DAY: usize = 24;
