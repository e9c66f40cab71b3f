// shared_data.rs

use crate::control_system::traffic_light_controller::Handoff;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

/// Source of wall-clock time for timestamps and the hour-of-day profile lookup.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant. Used to make ticks reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Today's date at `hour:00:00` local time.
    pub fn at_hour(hour: u32) -> Self {
        let date = Local::now().date_naive();
        let naive = date.and_hms_opt(hour % 24, 0, 0).unwrap_or_default();
        let instant = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(Local::now);
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// 1-based tick counter.
    pub tick: u64,
    pub timestamp: DateTime<Local>,
    pub handoff: Option<Handoff>,
}
