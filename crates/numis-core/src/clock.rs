//! Strictly increasing timestamps for audit ordering.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Hands out wall-clock timestamps that never repeat or go backwards
/// within the process, even if the system clock is stepped back.
#[derive(Debug, Default)]
pub struct AuditClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl AuditClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.tick(Utc::now())
    }

    /// Advance the clock with an externally observed wall time.
    pub fn tick(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}
