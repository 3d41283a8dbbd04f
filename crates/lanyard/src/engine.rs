//! The session engine: the concurrent store and public lifecycle API.
//!
//! All mutation goes through the engine's operations, never direct field
//! writes — that is what preserves the aggregate's invariants. Sessions
//! are independent, so the engine serializes *per session*, not globally:
//!
//! - The index (`token → session`) lives behind a `std::sync::RwLock`
//!   whose guard is held only for map lookups and insertions — never
//!   across an `.await`.
//! - Each session sits behind its own `tokio::sync::Mutex`. A concurrent
//!   activity report and an expiry sweep on the SAME session take turns;
//!   unrelated sessions never wait on each other.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use lanyard_protocol::{
    ActivityReport, HeartbeatReport, MacAddr, SessionEvent, SessionSnapshot,
    SessionToken, VoucherCode, VoucherGrant,
};
use lanyard_session::{Session, SessionPolicy, token};
use tokio::sync::{Mutex, broadcast};

use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine-level configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Session behavior knobs (heartbeat tiers, strike count, caps, ...).
    pub policy: SessionPolicy,
    /// Capacity of the lifecycle event broadcast channel. Slow
    /// subscribers that fall more than this far behind see a `Lagged`
    /// error and skip ahead — they never stall the engine.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: SessionPolicy::default(),
            event_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEngine
// ---------------------------------------------------------------------------

/// What a combined sweep pass changed.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Sessions that reached `Expired` this pass.
    pub expired: Vec<SessionToken>,
    /// Sessions whose liveness state changed (paused or flagged
    /// reconnecting) this pass.
    pub liveness_changed: Vec<SessionToken>,
}

impl SweepOutcome {
    /// `true` if the pass changed nothing.
    pub fn is_quiet(&self) -> bool {
        self.expired.is_empty() && self.liveness_changed.is_empty()
    }
}

/// The session store and lifecycle API. Cheap to clone (an `Arc` inside);
/// every handler task and the sweeper share one engine.
#[derive(Clone)]
pub struct SessionEngine {
    shared: Arc<EngineShared>,
}

struct EngineShared {
    policy: SessionPolicy,
    index: RwLock<SessionIndex>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Default)]
struct SessionIndex {
    /// Primary index. Terminal sessions stay here (answering stale NAS
    /// retries with `Terminal`, not `NotFound`) until the persistence
    /// collaborator drains them via
    /// [`SessionEngine::drain_archived`].
    by_token: HashMap<SessionToken, Arc<Mutex<Session>>>,
    /// Secondary index: the latest session for each voucher.
    by_voucher: HashMap<VoucherCode, SessionToken>,
}

impl SessionEngine {
    /// Creates an empty engine.
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            shared: Arc::new(EngineShared {
                policy: config.policy.validated(),
                index: RwLock::new(SessionIndex::default()),
                events,
            }),
        }
    }

    /// Subscribes to the lifecycle event stream (RADIUS bridge,
    /// notifications). Events sent before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // ----------------------------------------------------------------------
    // Creation
    // ----------------------------------------------------------------------

    /// Opens a session for a validated voucher grant.
    ///
    /// If the voucher already has a live session (the customer re-ran the
    /// portal flow instead of resuming by token), that session is
    /// seamlessly reconnected with the reported addresses and returned —
    /// redeeming a voucher never yields two live sessions.
    ///
    /// # Errors
    /// [`SessionError::InvalidDuration`](lanyard_session::SessionError::InvalidDuration)
    /// for a zero-day grant; rejected before any state is created.
    pub async fn create_session(
        &self,
        grant: &VoucherGrant,
        mac: MacAddr,
        ip: IpAddr,
        now: SystemTime,
    ) -> Result<SessionSnapshot, EngineError> {
        // Re-redemption of a voucher with a live session: resume it.
        if let Some(existing) = self.live_session_for(&grant.voucher_code) {
            let mut session = existing.lock().await;
            if !session.status().is_terminal() {
                tracing::info!(
                    voucher = %grant.voucher_code,
                    token = %session.token(),
                    "voucher already has a live session — reconnecting"
                );
                let event = session.record_activity(mac, ip, now)?;
                let snapshot = session.snapshot(now);
                drop(session);
                if let Some(event) = event {
                    self.emit(event);
                }
                return Ok(snapshot);
            }
        }

        let mut index =
            self.shared.index.write().expect("session index poisoned");

        // Mint a token the store has never seen. A collision is a
        // 2^-128 event; the retry loop exists so it is survivable, not
        // because it is expected.
        let token = loop {
            let candidate = token::issue();
            if !index.by_token.contains_key(&candidate) {
                break candidate;
            }
            tracing::warn!("session token collision — reissuing");
        };

        let session =
            Session::open(grant, token.clone(), mac, ip, &self.shared.policy, now)?;
        let created = session.created_event();
        let snapshot = session.snapshot(now);

        index
            .by_token
            .insert(token.clone(), Arc::new(Mutex::new(session)));
        index
            .by_voucher
            .insert(grant.voucher_code.clone(), token.clone());
        drop(index);

        self.emit(created);
        Ok(snapshot)
    }

    // ----------------------------------------------------------------------
    // NAS report handlers
    // ----------------------------------------------------------------------

    /// Applies a NAS activity report (MAC/IP observation + implicit
    /// liveness). The report's own timestamp is trusted as `now`.
    pub async fn record_activity(
        &self,
        report: &ActivityReport,
    ) -> Result<(), EngineError> {
        let session = self.lookup(&report.token)?;
        let mut session = session.lock().await;
        let event = session
            .record_activity(report.mac, report.ip, report.timestamp)
            .map_err(|err| self.downgrade_terminal(&report.token, err))?;
        drop(session);

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    /// Applies a liveness ping.
    pub async fn record_heartbeat(
        &self,
        report: &HeartbeatReport,
    ) -> Result<(), EngineError> {
        let session = self.lookup(&report.token)?;
        let mut session = session.lock().await;
        let event = session
            .record_heartbeat(report.timestamp)
            .map_err(|err| self.downgrade_terminal(&report.token, err))?;
        drop(session);

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Sweeps
    // ----------------------------------------------------------------------

    /// One combined sweep pass: expirations first, then missed
    /// heartbeats. The ordering guarantees that a session which is both
    /// past its deadline and overdue ends `Expired`, never `Paused`.
    pub async fn sweep(&self, now: SystemTime) -> SweepOutcome {
        SweepOutcome {
            expired: self.sweep_expirations(now).await,
            liveness_changed: self.sweep_missed_heartbeats(now).await,
        }
    }

    /// Expires every non-terminal session whose window has closed —
    /// including paused and reconnecting ones. Returns the sessions that
    /// changed, for caller-side notification.
    pub async fn sweep_expirations(
        &self,
        now: SystemTime,
    ) -> Vec<SessionToken> {
        let mut expired = Vec::new();
        for (token, session) in self.all_sessions() {
            let mut session = session.lock().await;
            if let Some(event) = session.check_expiry(now) {
                drop(session);
                expired.push(token);
                self.emit(event);
            }
        }
        expired
    }

    /// Advances the missed-heartbeat state of every session: strikes for
    /// overdue active sessions (pausing at the limit), reconnecting flags
    /// for lingering paused ones. Returns the sessions that changed state.
    pub async fn sweep_missed_heartbeats(
        &self,
        now: SystemTime,
    ) -> Vec<SessionToken> {
        let mut changed = Vec::new();
        for (token, session) in self.all_sessions() {
            let mut session = session.lock().await;
            if let Some(event) = session.check_heartbeat(now) {
                drop(session);
                changed.push(token);
                self.emit(event);
            }
        }
        changed
    }

    // ----------------------------------------------------------------------
    // Administrative operations
    // ----------------------------------------------------------------------

    /// Ends a session (explicit disconnect or operator action).
    /// Idempotent: terminating a terminal session is an accepted no-op.
    pub async fn terminate(
        &self,
        token: &SessionToken,
        reason: &str,
        now: SystemTime,
    ) -> Result<(), EngineError> {
        let session = self.lookup(token)?;
        let mut session = session.lock().await;
        let event = session.terminate(reason, now);
        drop(session);

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    /// Freezes a session pending review (abuse response). Only valid
    /// from active/paused; a later [`terminate`](Self::terminate) closes it.
    pub async fn suspend(
        &self,
        token: &SessionToken,
        reason: &str,
        now: SystemTime,
    ) -> Result<(), EngineError> {
        let session = self.lookup(token)?;
        let mut session = session.lock().await;
        let event = session.suspend(reason, now)?;
        drop(session);

        self.emit(event);
        Ok(())
    }

    /// Moves a session's deadline forward (a top-up purchase). Returns
    /// the new deadline.
    pub async fn extend(
        &self,
        token: &SessionToken,
        extra_days: u32,
    ) -> Result<SystemTime, EngineError> {
        let session = self.lookup(token)?;
        let mut session = session.lock().await;
        Ok(session.extend(extra_days)?)
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// `max(0, expires_at - now)` for the session.
    pub async fn remaining(
        &self,
        token: &SessionToken,
        now: SystemTime,
    ) -> Result<Duration, EngineError> {
        let session = self.lookup(token)?;
        let session = session.lock().await;
        Ok(session.remaining(now))
    }

    /// Wall-clock time since session start (paused intervals included),
    /// frozen at the terminal transition.
    pub async fn elapsed(
        &self,
        token: &SessionToken,
        now: SystemTime,
    ) -> Result<Duration, EngineError> {
        let session = self.lookup(token)?;
        let session = session.lock().await;
        Ok(session.elapsed(now))
    }

    /// Allow-list membership check for the firewall/traffic-shaping hot
    /// path — reads the session without driving the state machine.
    pub async fn is_mac_allowed(
        &self,
        token: &SessionToken,
        mac: MacAddr,
    ) -> Result<bool, EngineError> {
        let session = self.lookup(token)?;
        let session = session.lock().await;
        Ok(session.is_mac_allowed(mac))
    }

    pub async fn is_ip_allowed(
        &self,
        token: &SessionToken,
        ip: IpAddr,
    ) -> Result<bool, EngineError> {
        let session = self.lookup(token)?;
        let session = session.lock().await;
        Ok(session.is_ip_allowed(ip))
    }

    /// A point-in-time copy of the session for portal/admin UIs.
    pub async fn snapshot(
        &self,
        token: &SessionToken,
        now: SystemTime,
    ) -> Result<SessionSnapshot, EngineError> {
        let session = self.lookup(token)?;
        let session = session.lock().await;
        Ok(session.snapshot(now))
    }

    /// The latest session token for a voucher, if any is stored.
    pub fn find_by_voucher(&self, voucher: &VoucherCode) -> Option<SessionToken> {
        let index = self.shared.index.read().expect("session index poisoned");
        index.by_voucher.get(voucher).cloned()
    }

    /// Number of sessions resident in the store (terminal ones included
    /// until drained).
    pub fn session_count(&self) -> usize {
        let index = self.shared.index.read().expect("session index poisoned");
        index.by_token.len()
    }

    // ----------------------------------------------------------------------
    // Archival
    // ----------------------------------------------------------------------

    /// Removes terminal sessions from the store and returns their final
    /// snapshots for the persistence collaborator (sessions are archived
    /// on terminal transition, never deleted outright).
    ///
    /// Split from the sweeps so the accounting bridge can react to the
    /// terminal events before the records leave memory. Until a session
    /// is drained, stale NAS retries against it still resolve to
    /// `Terminal` rather than the alarming `NotFound`.
    pub async fn drain_archived(&self) -> Vec<SessionSnapshot> {
        let mut archived = Vec::new();
        let mut drained_tokens = Vec::new();

        for (token, session) in self.all_sessions() {
            let session = session.lock().await;
            if session.status().is_terminal() {
                // Both terminal transitions stamp session_end; the
                // deadline fallback keeps this total.
                let at = session.session_end().unwrap_or(session.expires_at());
                archived.push(session.snapshot(at));
                drained_tokens.push((token, session.voucher_code().clone()));
            }
        }

        if !drained_tokens.is_empty() {
            let mut index =
                self.shared.index.write().expect("session index poisoned");
            for (token, voucher) in &drained_tokens {
                index.by_token.remove(token);
                // Only drop the voucher mapping if it still points at the
                // drained session — the voucher may have a newer one.
                if index.by_voucher.get(voucher) == Some(token) {
                    index.by_voucher.remove(voucher);
                }
            }
            tracing::info!(count = drained_tokens.len(), "archived sessions drained");
        }

        archived
    }

    // ----------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------

    /// Clones the session handle out of the index. The read guard lives
    /// only for this map lookup.
    fn lookup(
        &self,
        token: &SessionToken,
    ) -> Result<Arc<Mutex<Session>>, EngineError> {
        let index = self.shared.index.read().expect("session index poisoned");
        index
            .by_token
            .get(token)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(token.clone()))
    }

    /// Snapshot of all session handles, taken under the read lock, so
    /// sweeps iterate without holding it.
    fn all_sessions(&self) -> Vec<(SessionToken, Arc<Mutex<Session>>)> {
        let index = self.shared.index.read().expect("session index poisoned");
        index
            .by_token
            .iter()
            .map(|(token, session)| (token.clone(), Arc::clone(session)))
            .collect()
    }

    /// The session the voucher index currently points at, if any.
    fn live_session_for(
        &self,
        voucher: &VoucherCode,
    ) -> Option<Arc<Mutex<Session>>> {
        let token = self.find_by_voucher(voucher)?;
        self.lookup(&token).ok()
    }

    /// Logs the expected post-terminal noise at low severity before
    /// handing the error back.
    fn downgrade_terminal(
        &self,
        token: &SessionToken,
        err: lanyard_session::SessionError,
    ) -> EngineError {
        if let lanyard_session::SessionError::Terminal { status } = &err {
            tracing::debug!(
                %token,
                %status,
                "report for terminal session ignored (stale NAS retry)"
            );
        }
        EngineError::Session(err)
    }

    fn emit(&self, event: SessionEvent) {
        // A send error only means nobody is subscribed right now; the
        // engine's own state does not depend on delivery.
        let _ = self.shared.events.send(event);
    }
}
