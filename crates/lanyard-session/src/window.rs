//! The access window: the purchased duration as an absolute deadline.

use std::time::{Duration, SystemTime};

/// Seconds in one wall-clock day of purchased access.
pub const SECS_PER_DAY: u64 = 86_400;

/// One voucher redemption's access window.
///
/// `expires_at` is computed exactly once, at creation, as
/// `started_at + duration_days` — it is never recomputed from activity.
/// Disconnected time is not refunded. The only operation that moves the
/// deadline is an explicit [`extend`](Self::extend), and the window counts
/// how often that happened.
///
/// `SystemTime` rather than `Instant`: the deadline is a calendar fact
/// that must survive archival and be meaningful days later, not a
/// process-local monotonic reading.
#[derive(Debug, Clone, Copy)]
pub struct AccessWindow {
    started_at: SystemTime,
    expires_at: SystemTime,
    /// The purchased duration (grows with extensions). Consulted directly
    /// by the connected-time expiry mode.
    entitlement: Duration,
    extensions: u32,
}

impl AccessWindow {
    /// Opens a window of `duration_days` starting at `now`.
    ///
    /// The caller has already validated `duration_days >= 1`.
    pub fn open(now: SystemTime, duration_days: u32) -> Self {
        let entitlement = days(duration_days);
        Self {
            started_at: now,
            expires_at: now + entitlement,
            entitlement,
            extensions: 0,
        }
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// The total purchased duration, including extensions.
    pub fn entitlement(&self) -> Duration {
        self.entitlement
    }

    pub fn extensions(&self) -> u32 {
        self.extensions
    }

    /// `true` once `now` has reached the deadline.
    pub fn is_past(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// `max(0, expires_at - now)`.
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.expires_at
            .duration_since(now)
            .unwrap_or(Duration::ZERO)
    }

    /// Moves the deadline forward by `extra_days` and records the
    /// extension. Returns the new deadline.
    pub fn extend(&mut self, extra_days: u32) -> SystemTime {
        let extra = days(extra_days);
        self.expires_at += extra;
        self.entitlement += extra;
        self.extensions += 1;
        self.expires_at
    }
}

fn days(n: u32) -> Duration {
    Duration::from_secs(u64::from(n) * SECS_PER_DAY)
}
