// Clock abstraction so reminder checks can run against simulated time

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::{Mutex, PoisonError};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the host system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Time zone used to turn instants into wall-clock reminder times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallClockZone {
    /// Whatever the host is configured with
    Local,
    Named(Tz),
}

impl WallClockZone {
    /// Resolve an optional IANA zone name; `None` selects the host zone
    pub fn from_setting(name: Option<&str>) -> Result<Self, String> {
        match name {
            None => Ok(WallClockZone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(WallClockZone::Named)
                .map_err(|e| format!("Invalid timezone '{}': {}", name, e)),
        }
    }

    pub fn wall_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            WallClockZone::Local => instant.with_timezone(&Local).naive_local(),
            WallClockZone::Named(tz) => instant.with_timezone(tz).naive_local(),
        }
    }
}
