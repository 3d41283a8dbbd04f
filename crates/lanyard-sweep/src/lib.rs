//! Fixed-interval sweep scheduler for Lanyard.
//!
//! The engine's expiry and missed-heartbeat checks are driven by one
//! background task on a fixed cadence (default 60 s — deliberately
//! independent of any session's heartbeat interval). This crate provides
//! the timer for that task: a scheduler that fires on schedule, detects
//! when a sweep ran long, and skips ahead rather than building up a
//! backlog of overdue passes.
//!
//! # Integration
//!
//! The scheduler sits inside the sweeper task's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = &mut shutdown_rx => break,
//!         info = scheduler.wait_for_sweep() => {
//!             engine.sweep(SystemTime::now()).await;
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the sweep cadence.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweep passes. Default: 60 s.
    pub interval: Duration,
    /// Random jitter (0–max ms) added before the *first* pass so several
    /// engine instances started together don't all sweep at the same
    /// instant (thundering-herd mitigation).
    pub initial_jitter_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_jitter_ms: 2_000,
        }
    }
}

impl SweepConfig {
    /// Minimum supported sweep interval.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a config for a specific interval with default jitter.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`SweepScheduler::new`]. A sub-second
    /// interval would make the sweeper a busy loop.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "sweep interval below minimum — clamping to 1s"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Sweep info
// ---------------------------------------------------------------------------

/// Information about a sweep pass, returned by
/// [`SweepScheduler::wait_for_sweep`].
#[derive(Debug, Clone, Copy)]
pub struct SweepInfo {
    /// Monotonically increasing pass number (starts at 1).
    pub pass: u64,
    /// How late this pass fired relative to its schedule.
    pub late_by: Duration,
    /// `true` if the pass fired significantly late (>10% of the
    /// interval). The next pass is rescheduled from now, not from the
    /// missed deadline.
    pub overrun: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval scheduler. One per engine sweeper task.
pub struct SweepScheduler {
    config: SweepConfig,
    /// When the next pass should fire.
    next: TokioInstant,
    pass: u64,
}

impl SweepScheduler {
    /// Create a scheduler; the first pass fires one interval (plus
    /// jitter) from now.
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter_ms > 0 {
            let ms = rand::rng().random_range(0..config.initial_jitter_ms);
            Duration::from_millis(ms)
        } else {
            Duration::ZERO
        };
        let next = TokioInstant::now() + config.interval + jitter;

        debug!(
            interval_secs = config.interval.as_secs(),
            jitter_ms = jitter.as_millis() as u64,
            "sweep scheduler created"
        );

        Self {
            config,
            next,
            pass: 0,
        }
    }

    /// Create a scheduler for a specific interval with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(SweepConfig::with_interval(interval))
    }

    /// Wait until the next sweep pass is due.
    ///
    /// If the previous pass ran longer than the interval (an overrun),
    /// the schedule restarts from now — missed passes are skipped, never
    /// replayed. A sweep that fires late still sees every due session on
    /// its next pass, so skipping is safe; replaying would only pile more
    /// work onto an already-loaded engine.
    pub async fn wait_for_sweep(&mut self) -> SweepInfo {
        time::sleep_until(self.next).await;

        let now = TokioInstant::now();
        self.pass += 1;

        let late_by = now.saturating_duration_since(self.next);
        let overrun = late_by > self.config.interval / 10;

        if overrun {
            warn!(
                pass = self.pass,
                late_ms = late_by.as_millis() as u64,
                "sweep pass overran — rescheduling from now"
            );
            self.next = now + self.config.interval;
        } else {
            self.next += self.config.interval;
        }

        trace!(pass = self.pass, overrun, "sweep pass due");

        SweepInfo {
            pass: self.pass,
            late_by,
            overrun,
        }
    }

    /// The configured (validated) interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Number of passes that have fired so far.
    pub fn pass_count(&self) -> u64 {
        self.pass
    }
}
