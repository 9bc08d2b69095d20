use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use leadflow_core::clock::Clock;

/// Manually driven clock. Clones share the same instant, so a test can keep a
/// handle while the engine under test owns another.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// 2025-03-03 12:00:00 UTC, a Monday.
    pub fn default_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Self::default_instant())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
