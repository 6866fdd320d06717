//! Injected time source
//!
//! Token window math and scan timestamps must be deterministic under test,
//! so every service takes a `Clock` instead of reading system time inline.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Time source for token windows and event timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by system time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Start at a fixed epoch offset, handy for window arithmetic in tests
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).expect("valid timestamp"))
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock().expect("clock poisoned") = to;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut current = self.current.lock().expect("clock poisoned");
        *current += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("clock poisoned")
    }
}
