//! Heartbeat tracking: "idle" vs "gone".
//!
//! No traffic from a device can mean two things — it is idle, or it left.
//! The monitor separates them without constant chatter: the NAS pings at a
//! per-session interval, and only after several intervals pass with no
//! ping does the session count as disconnected.

use std::time::{Duration, SystemTime};

/// Liveness state for one session.
///
/// The monitor itself never changes session status — it only answers
/// "is this session overdue?" and keeps the strike count. The state
/// machine decides what a third strike means.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatMonitor {
    /// Expected ping cadence, fixed at session creation from the
    /// package's duration tier.
    interval: Duration,
    last_heartbeat: SystemTime,
    /// Consecutive sweep passes that found the session overdue.
    /// Reset to 0 by any heartbeat.
    missed: u32,
    /// Strikes tolerated before the session counts as disconnected.
    max_missed: u32,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration, max_missed: u32, now: SystemTime) -> Self {
        Self {
            interval,
            last_heartbeat: now,
            missed: 0,
            max_missed,
        }
    }

    /// Records a heartbeat: stamps the time and clears the strikes.
    pub fn beat(&mut self, now: SystemTime) {
        self.last_heartbeat = now;
        self.missed = 0;
    }

    /// `true` when more than one interval has passed since the last beat.
    ///
    /// A `now` before the last beat (clock skew between NAS reports) is
    /// not overdue.
    pub fn overdue(&self, now: SystemTime) -> bool {
        now.duration_since(self.last_heartbeat)
            .map(|since| since > self.interval)
            .unwrap_or(false)
    }

    /// Adds a strike and returns the new count.
    pub fn record_missed(&mut self) -> u32 {
        self.missed += 1;
        self.missed
    }

    /// `true` once the tolerance is used up.
    pub fn is_exhausted(&self) -> bool {
        self.missed >= self.max_missed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_heartbeat(&self) -> SystemTime {
        self.last_heartbeat
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_754_000_000)
    }

    fn monitor() -> HeartbeatMonitor {
        HeartbeatMonitor::new(Duration::from_secs(300), 3, t0())
    }

    #[test]
    fn test_overdue_within_interval_is_false() {
        let m = monitor();
        assert!(!m.overdue(t0() + Duration::from_secs(300)));
    }

    #[test]
    fn test_overdue_past_interval_is_true() {
        let m = monitor();
        assert!(m.overdue(t0() + Duration::from_secs(301)));
    }

    #[test]
    fn test_overdue_with_skewed_clock_is_false() {
        let m = monitor();
        assert!(!m.overdue(t0() - Duration::from_secs(10)));
    }

    #[test]
    fn test_beat_resets_strikes_and_stamp() {
        let mut m = monitor();
        m.record_missed();
        m.record_missed();
        let later = t0() + Duration::from_secs(900);
        m.beat(later);
        assert_eq!(m.missed(), 0);
        assert_eq!(m.last_heartbeat(), later);
        assert!(!m.overdue(later + Duration::from_secs(300)));
    }

    #[test]
    fn test_is_exhausted_after_three_strikes() {
        let mut m = monitor();
        assert_eq!(m.record_missed(), 1);
        assert!(!m.is_exhausted());
        m.record_missed();
        assert!(!m.is_exhausted());
        m.record_missed();
        assert!(m.is_exhausted());
    }
}
