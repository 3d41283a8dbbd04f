//! Session policy: the operator-tunable knobs.
//!
//! The tier thresholds and strike counts here were magic numbers buried in
//! the state machine once; they are configuration now so an operator can
//! tune them per deployment without touching lifecycle code.

use std::time::Duration;

use lanyard_identity::RegistryLimits;
use tracing::warn;

// ---------------------------------------------------------------------------
// HeartbeatTiers
// ---------------------------------------------------------------------------

/// Maps a package's purchased duration to its heartbeat interval.
///
/// The interval scales with duration so a 5-minute voucher isn't dominated
/// by heartbeat overhead relative to its lifetime, while a monthly voucher
/// tolerates long radio-silence gaps (device sleep) without false-pausing.
///
/// Defaults match the shipped package catalog:
///
/// | purchased duration | interval |
/// |---|---|
/// | ≥ 30 days | 30 min |
/// | ≥ 7 days  | 15 min |
/// | shorter   | 5 min  |
#[derive(Debug, Clone)]
pub struct HeartbeatTiers {
    /// `(minimum days, interval)` pairs, kept sorted by days descending so
    /// `interval_for` can take the first tier that fits.
    tiers: Vec<(u32, Duration)>,
    /// Interval for packages shorter than every tier.
    base: Duration,
}

impl Default for HeartbeatTiers {
    fn default() -> Self {
        Self {
            tiers: vec![
                (30, Duration::from_secs(1800)),
                (7, Duration::from_secs(900)),
            ],
            base: Duration::from_secs(300),
        }
    }
}

impl HeartbeatTiers {
    /// Builds a custom tier table. Order doesn't matter — it is sorted.
    pub fn new(mut tiers: Vec<(u32, Duration)>, base: Duration) -> Self {
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers, base }
    }

    /// The heartbeat interval for a package of the given duration.
    pub fn interval_for(&self, duration_days: u32) -> Duration {
        self.tiers
            .iter()
            .find(|(min_days, _)| duration_days >= *min_days)
            .map(|(_, interval)| *interval)
            .unwrap_or(self.base)
    }
}

// ---------------------------------------------------------------------------
// ExpiryPolicy
// ---------------------------------------------------------------------------

/// How the purchased duration is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// The deadline is `start + duration` in wall-clock time, set once at
    /// creation. A customer who disconnects for a day during a 7-day
    /// voucher does not get that day back. This is the product's billing
    /// model: it matches how the voucher was priced and bounds session
    /// lifetime even under chronic intermittent connectivity.
    #[default]
    WallClock,

    /// The session expires once *accrued online time* reaches the
    /// purchased duration; disconnected stretches consume nothing, so the
    /// calendar deadline is not consulted. Off by default; exists for
    /// markets that bill connected time.
    ConnectedTimeOnly,
}

// ---------------------------------------------------------------------------
// SessionPolicy
// ---------------------------------------------------------------------------

/// All per-deployment session behavior in one place.
///
/// One copy lives in the engine; sessions capture the values they need at
/// creation (interval, strike count), so changing the policy affects new
/// sessions only.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Duration-tiered heartbeat intervals.
    pub heartbeat_tiers: HeartbeatTiers,
    /// Missed heartbeats tolerated before pausing. Default 3, absorbing
    /// single dropped packets without declaring the device gone.
    pub max_missed_heartbeats: u32,
    /// Whether the sweeper flags lingering paused sessions as
    /// `Reconnecting` (ready for seamless resume). Default on.
    pub auto_reconnect: bool,
    /// Anti-sharing caps on distinct MACs/IPs. Default unbounded.
    pub limits: RegistryLimits,
    /// Wall-clock (default) or connected-time expiry.
    pub expiry: ExpiryPolicy,
}

impl SessionPolicy {
    /// Clamp and fix any out-of-range values so the policy is safe to use.
    ///
    /// A zero strike count would pause a session on its first overdue
    /// check; it is forced up to 1.
    pub fn validated(mut self) -> Self {
        if self.max_missed_heartbeats == 0 {
            warn!("max_missed_heartbeats of 0 is not usable — clamping to 1");
            self.max_missed_heartbeats = 1;
        }
        self
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            heartbeat_tiers: HeartbeatTiers::default(),
            max_missed_heartbeats: 3,
            auto_reconnect: true,
            limits: RegistryLimits::default(),
            expiry: ExpiryPolicy::default(),
        }
    }
}

impl SessionPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}
