//! Clock & IDs leaf component.
//!
//! Monotonic time drives cache TTLs; wall time stamps records and run
//! summaries. Kept behind a trait so cache tests can advance time without
//! sleeping.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of monotonic and wall-clock time, injected wherever a component
/// needs "now" rather than calling `Instant::now()`/`Utc::now()` directly.
pub trait Clock: Send + Sync {
    fn monotonic_now(&self) -> Instant;
    fn utc_now(&self) -> DateTime<Utc>;
}

/// The real system clock, used everywhere outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually-advanced clock for deterministic TTL tests.
#[derive(Debug)]
pub struct FakeClock {
    monotonic: std::sync::Mutex<Instant>,
    wall: std::sync::Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            monotonic: std::sync::Mutex::new(Instant::now()),
            wall: std::sync::Mutex::new(wall),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut monotonic = self.monotonic.lock().unwrap();
        *monotonic += by;
        let mut wall = self.wall.lock().unwrap();
        *wall += chrono::Duration::from_std(by).expect("duration fits in chrono::Duration");
    }
}

impl Clock for FakeClock {
    fn monotonic_now(&self) -> Instant {
        *self.monotonic.lock().unwrap()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        *self.wall.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_both_monotonic_and_wall_time() {
        let clock = FakeClock::new(Utc::now());
        let before_monotonic = clock.monotonic_now();
        let before_wall = clock.utc_now();

        clock.advance(Duration::from_secs(60));

        assert!(clock.monotonic_now() > before_monotonic);
        assert!(clock.utc_now() > before_wall);
    }
}
