//! Wall-clock gate for opportunity rescans

use chrono::{DateTime, Duration, Utc};

/// Config seconds as a chrono duration, saturating far beyond any race length
pub(crate) fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::from(u32::try_from(secs).unwrap_or(u32::MAX)))
}

/// Allows a rescan only once `interval` has elapsed since the last one.
///
/// The first window starts at construction, so a fresh twin waits one full
/// interval before its first rescan. A time source that moves back before the
/// last scan (a recorded session replayed after the twin was built) restarts
/// the window at the earlier instant.
#[derive(Debug, Clone)]
pub struct ScanThrottle {
    interval: Duration,
    last_scan: DateTime<Utc>,
}

impl ScanThrottle {
    pub fn new(interval_secs: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            interval: seconds(interval_secs),
            last_scan: started_at,
        }
    }

    /// True once strictly more than the interval has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_scan > self.interval
    }

    pub fn record(&mut self, now: DateTime<Utc>) {
        self.last_scan = now;
    }

    /// Check and, if due, record in one step.
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.last_scan {
            self.last_scan = now;
            return false;
        }
        if self.is_due(now) {
            self.record(now);
            true
        } else {
            false
        }
    }

    pub fn last_scan(&self) -> DateTime<Utc> {
        self.last_scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }

    #[test]
    fn waits_one_interval_after_construction() {
        let throttle = ScanThrottle::new(15, t0());
        assert!(!throttle.is_due(t0()));
        assert!(!throttle.is_due(t0() + Duration::seconds(15)));
        assert!(throttle.is_due(t0() + Duration::seconds(16)));
    }

    #[test]
    fn suppresses_rapid_rescans() {
        let mut throttle = ScanThrottle::new(15, t0());
        let first = t0() + Duration::seconds(20);
        assert!(throttle.try_acquire(first));
        assert!(!throttle.try_acquire(first + Duration::seconds(5)));
        assert!(throttle.try_acquire(first + Duration::seconds(16)));
    }

    #[test]
    fn rewound_clock_restarts_the_window() {
        let mut throttle = ScanThrottle::new(15, t0());
        let recorded = t0() - Duration::days(400);
        assert!(!throttle.try_acquire(recorded));
        assert_eq!(throttle.last_scan(), recorded);
        assert!(!throttle.try_acquire(recorded + Duration::seconds(10)));
        assert!(throttle.try_acquire(recorded + Duration::seconds(90)));
    }

    #[test]
    fn zero_interval_allows_any_later_instant() {
        let mut throttle = ScanThrottle::new(0, t0());
        assert!(throttle.try_acquire(t0() + Duration::milliseconds(1)));
    }
}
