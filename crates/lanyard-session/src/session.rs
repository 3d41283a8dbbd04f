//! The session aggregate: one voucher redemption's access window.
//!
//! A `Session` is the server's record of a customer who redeemed a voucher
//! and connected a device. It owns the three supporting components — the
//! access window (expiry), the device registry (identity), and the
//! heartbeat monitor (liveness) — and is the ONLY place session state is
//! mutated. Every status change goes through the transition table in
//! [`SessionStatus`], and every operation that changed externally-visible
//! state hands back the [`SessionEvent`] the engine should broadcast.
//!
//! Time never comes from the ambient clock here: every time-dependent
//! method takes an explicit `now` (NAS reports carry their own timestamps,
//! and sweeps are stamped by the caller). That is what keeps expiry exact
//! and every test deterministic.

use std::net::IpAddr;
use std::time::{Duration, SystemTime};

use lanyard_identity::DeviceRegistry;
use lanyard_protocol::{
    MacAddr, PackageId, SessionEvent, SessionSnapshot, SessionStatus,
    SessionToken, VoucherCode, VoucherGrant,
};

use crate::{
    AccessWindow, ExpiryPolicy, HeartbeatMonitor, SessionError, SessionPolicy,
};

/// A fresh session starts with a perfect connection quality score.
const QUALITY_FULL: f64 = 100.0;
/// Each disconnection costs this much score.
const QUALITY_DISCONNECT_PENALTY: f64 = 5.0;
/// Each on-time heartbeat earns this much back.
const QUALITY_HEARTBEAT_RECOVERY: f64 = 1.0;

/// One voucher session. See the module docs for the ownership story.
#[derive(Debug, Clone)]
pub struct Session {
    // -- Identity (immutable after creation) ------------------------------
    token: SessionToken,
    voucher_code: VoucherCode,
    phone_number: String,
    package_id: PackageId,
    radius_username: String,

    // -- Components --------------------------------------------------------
    status: SessionStatus,
    window: AccessWindow,
    devices: DeviceRegistry,
    liveness: HeartbeatMonitor,

    // -- Timing ------------------------------------------------------------
    last_activity: SystemTime,
    /// Set on the terminal transition (expire/terminate); a suspension
    /// does NOT set it — only the closing terminate does.
    session_end: Option<SystemTime>,
    /// Accrued online time. Only advances while `Active`.
    total_online: Duration,
    /// `Some(when accrual started)` while the session is `Active`.
    accrual_mark: Option<SystemTime>,

    // -- Connectivity history (diagnostic only) ----------------------------
    disconnection_count: u32,
    last_disconnection: Option<SystemTime>,
    quality: f64,

    // -- Policy captured at creation ---------------------------------------
    auto_reconnect: bool,
    expiry_policy: ExpiryPolicy,
}

impl Session {
    /// Opens a session for a validated voucher grant.
    ///
    /// The token comes from the caller (the engine mints and
    /// uniqueness-checks it against the store). The heartbeat interval is
    /// derived here, once, from the package's duration tier.
    ///
    /// # Errors
    /// [`SessionError::InvalidDuration`] if the grant's duration is zero —
    /// rejected before any state exists.
    pub fn open(
        grant: &VoucherGrant,
        token: SessionToken,
        mac: MacAddr,
        ip: IpAddr,
        policy: &SessionPolicy,
        now: SystemTime,
    ) -> Result<Self, SessionError> {
        if grant.duration_days == 0 {
            return Err(SessionError::InvalidDuration);
        }

        let interval = policy.heartbeat_tiers.interval_for(grant.duration_days);
        let session = Self {
            token: token.clone(),
            voucher_code: grant.voucher_code.clone(),
            phone_number: grant.phone_number.clone(),
            package_id: grant.package_id,
            radius_username: grant.radius_username.clone(),
            status: SessionStatus::Active,
            window: AccessWindow::open(now, grant.duration_days),
            devices: DeviceRegistry::new(mac, ip, policy.limits),
            liveness: HeartbeatMonitor::new(
                interval,
                policy.max_missed_heartbeats,
                now,
            ),
            last_activity: now,
            session_end: None,
            total_online: Duration::ZERO,
            accrual_mark: Some(now),
            disconnection_count: 0,
            last_disconnection: None,
            quality: QUALITY_FULL,
            auto_reconnect: policy.auto_reconnect,
            expiry_policy: policy.expiry,
        };

        tracing::info!(
            token = %token,
            voucher = %session.voucher_code,
            days = grant.duration_days,
            interval_secs = interval.as_secs(),
            "session opened"
        );
        Ok(session)
    }

    /// The `Created` event for a freshly-opened session.
    pub fn created_event(&self) -> SessionEvent {
        SessionEvent::Created {
            token: self.token.clone(),
            voucher_code: self.voucher_code.clone(),
            expires_at: self.window.expires_at(),
        }
    }

    // ----------------------------------------------------------------------
    // Report handlers
    // ----------------------------------------------------------------------

    /// Handles a NAS activity report: "this token was seen from mac/ip".
    ///
    /// Unconditional trust: a MAC or IP that differs from the current one
    /// is adopted into the allow-list and becomes current — the captive
    /// portal already bound this token to a physical access event, so the
    /// report is the same device roaming, not a new client. Resumes a
    /// paused/reconnecting session; a suspended session records the
    /// observation but stays frozen.
    ///
    /// # Errors
    /// - [`SessionError::Terminal`] after expiry/termination (no state is
    ///   touched — stale NAS retries must not resurrect a session).
    /// - [`SessionError::Identity`] if an anti-sharing cap rejects the
    ///   address.
    pub fn record_activity(
        &mut self,
        mac: MacAddr,
        ip: IpAddr,
        now: SystemTime,
    ) -> Result<Option<SessionEvent>, SessionError> {
        self.reject_if_terminal()?;

        self.devices.observe_mac(mac)?;
        self.devices.observe_ip(ip)?;
        self.last_activity = now;

        if self.status.is_resumable() {
            return Ok(Some(self.resume(now)));
        }
        Ok(None)
    }

    /// Handles a liveness ping: clears strikes and resumes if paused.
    pub fn record_heartbeat(
        &mut self,
        now: SystemTime,
    ) -> Result<Option<SessionEvent>, SessionError> {
        self.reject_if_terminal()?;

        self.liveness.beat(now);
        self.quality = (self.quality + QUALITY_HEARTBEAT_RECOVERY).min(QUALITY_FULL);

        if self.status.is_resumable() {
            return Ok(Some(self.resume(now)));
        }
        Ok(None)
    }

    // ----------------------------------------------------------------------
    // Sweep steps (called by the engine's periodic sweeper)
    // ----------------------------------------------------------------------

    /// Expiry check. Runs BEFORE the heartbeat check each sweep pass, so a
    /// session that is both overdue and past its deadline ends `Expired`,
    /// never `Paused`.
    ///
    /// Expires any state that may legally reach `Expired` — including
    /// `Paused` and `Reconnecting`: a session that never heartbeats again
    /// must still expire on schedule. A `Suspended` session is frozen
    /// pending administrative action and is skipped.
    pub fn check_expiry(&mut self, now: SystemTime) -> Option<SessionEvent> {
        if !self.status.can_transition_to(SessionStatus::Expired) {
            return None;
        }

        let due = match self.expiry_policy {
            ExpiryPolicy::WallClock => self.window.is_past(now),
            // Disconnected time does not consume the entitlement in this
            // mode, so the calendar deadline is NOT consulted.
            ExpiryPolicy::ConnectedTimeOnly => {
                self.total_online(now) >= self.window.entitlement()
            }
        };
        if !due {
            return None;
        }

        self.accrue_online(now);
        self.transition(SessionStatus::Expired);
        self.session_end = Some(now);
        Some(SessionEvent::Expired {
            token: self.token.clone(),
            total_online: self.total_online,
        })
    }

    /// Missed-heartbeat check.
    ///
    /// An overdue `Active` session collects a strike per sweep pass; at
    /// the strike limit it pauses and the disconnection is recorded. A
    /// `Paused` session with auto-reconnect on is flagged `Reconnecting`
    /// (ready for seamless resume on the device's next report).
    pub fn check_heartbeat(&mut self, now: SystemTime) -> Option<SessionEvent> {
        match self.status {
            SessionStatus::Active => {
                if !self.liveness.overdue(now) {
                    return None;
                }
                let missed = self.liveness.record_missed();
                if !self.liveness.is_exhausted() {
                    tracing::debug!(
                        token = %self.token,
                        missed,
                        "missed heartbeat within tolerance"
                    );
                    return None;
                }

                self.accrue_online(now);
                self.transition(SessionStatus::Paused);
                self.disconnection_count += 1;
                self.last_disconnection = Some(now);
                self.quality =
                    (self.quality - QUALITY_DISCONNECT_PENALTY).max(0.0);
                Some(SessionEvent::Paused {
                    token: self.token.clone(),
                    missed_heartbeats: missed,
                })
            }
            SessionStatus::Paused if self.auto_reconnect => {
                self.transition(SessionStatus::Reconnecting);
                Some(SessionEvent::Reconnecting {
                    token: self.token.clone(),
                })
            }
            _ => None,
        }
    }

    // ----------------------------------------------------------------------
    // Administrative operations
    // ----------------------------------------------------------------------

    /// Ends the session from any non-terminal state.
    ///
    /// Idempotent: terminating an already-terminal session returns `None`
    /// and changes nothing — NAS equipment retries disconnects.
    pub fn terminate(
        &mut self,
        reason: &str,
        now: SystemTime,
    ) -> Option<SessionEvent> {
        if self.status.is_terminal() {
            tracing::debug!(token = %self.token, status = %self.status, "terminate on terminal session ignored");
            return None;
        }

        self.accrue_online(now);
        self.transition(SessionStatus::Terminated);
        self.session_end = Some(now);
        Some(SessionEvent::Terminated {
            token: self.token.clone(),
            reason: reason.to_string(),
            total_online: self.total_online,
        })
    }

    /// Administrative freeze (abuse response). Valid only from
    /// `Active`/`Paused`; accrual stops but `session_end` stays unset
    /// until a later [`terminate`](Self::terminate) closes the record.
    pub fn suspend(
        &mut self,
        reason: &str,
        now: SystemTime,
    ) -> Result<SessionEvent, SessionError> {
        match self.status {
            SessionStatus::Active | SessionStatus::Paused => {
                self.accrue_online(now);
                self.transition(SessionStatus::Suspended);
                Ok(SessionEvent::Suspended {
                    token: self.token.clone(),
                    reason: reason.to_string(),
                })
            }
            status if status.is_terminal() => {
                Err(SessionError::Terminal { status })
            }
            status => Err(SessionError::NotSuspendable { status }),
        }
    }

    /// Moves the deadline forward by `extra_days` (a top-up purchase).
    /// This is the one sanctioned way `expires_at` changes.
    pub fn extend(
        &mut self,
        extra_days: u32,
    ) -> Result<SystemTime, SessionError> {
        self.reject_if_terminal()?;
        if extra_days == 0 {
            return Err(SessionError::InvalidDuration);
        }
        let new_deadline = self.window.extend(extra_days);
        tracing::info!(
            token = %self.token,
            extra_days,
            extensions = self.window.extensions(),
            "session extended"
        );
        Ok(new_deadline)
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// `max(0, expires_at - now)` — wall-clock, regardless of status.
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.window.remaining(now)
    }

    /// Wall-clock time since the session started, stopping at the
    /// terminal transition. Paused intervals are NOT subtracted —
    /// consistent with the wall-clock expiry policy.
    pub fn elapsed(&self, now: SystemTime) -> Duration {
        self.session_end
            .unwrap_or(now)
            .duration_since(self.window.started_at())
            .unwrap_or(Duration::ZERO)
    }

    /// Accrued online time, including the currently-running active span.
    pub fn total_online(&self, now: SystemTime) -> Duration {
        match self.accrual_mark {
            Some(mark) => {
                self.total_online
                    + now.duration_since(mark).unwrap_or(Duration::ZERO)
            }
            None => self.total_online,
        }
    }

    /// Allow-list membership check for the firewall hot path.
    pub fn is_mac_allowed(&self, mac: MacAddr) -> bool {
        self.devices.is_mac_allowed(mac)
    }

    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.devices.is_ip_allowed(ip)
    }

    /// A point-in-time copy for the portal/admin UIs.
    pub fn snapshot(&self, now: SystemTime) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token.clone(),
            voucher_code: self.voucher_code.clone(),
            package_id: self.package_id,
            status: self.status,
            connected: self.status == SessionStatus::Active,
            expires_at: self.window.expires_at(),
            remaining_secs: self.remaining(now).as_secs(),
            elapsed_secs: self.elapsed(now).as_secs(),
            total_online_secs: self.total_online(now).as_secs(),
            current_mac: self.devices.current_mac(),
            current_ip: self.devices.current_ip(),
            mac_changes: self.devices.mac_changes(),
            ip_changes: self.devices.ip_changes(),
            heartbeat_interval_secs: self.liveness.interval().as_secs(),
            last_heartbeat: self.liveness.last_heartbeat(),
            missed_heartbeats: self.liveness.missed(),
            disconnection_count: self.disconnection_count,
            extension_count: self.window.extensions(),
            connection_quality_score: self.quality,
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn voucher_code(&self) -> &VoucherCode {
        &self.voucher_code
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn package_id(&self) -> PackageId {
        self.package_id
    }

    pub fn radius_username(&self) -> &str {
        &self.radius_username
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn expires_at(&self) -> SystemTime {
        self.window.expires_at()
    }

    pub fn started_at(&self) -> SystemTime {
        self.window.started_at()
    }

    pub fn session_end(&self) -> Option<SystemTime> {
        self.session_end
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.liveness.interval()
    }

    pub fn last_activity(&self) -> SystemTime {
        self.last_activity
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    // ----------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------

    fn reject_if_terminal(&self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::Terminal {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Resumes a paused/reconnecting session. Re-arms the heartbeat
    /// monitor — resuming without clearing the strike count would re-pause
    /// the session on the very next sweep.
    fn resume(&mut self, now: SystemTime) -> SessionEvent {
        self.transition(SessionStatus::Active);
        self.accrual_mark = Some(now);
        self.liveness.beat(now);
        SessionEvent::Resumed {
            token: self.token.clone(),
        }
    }

    /// Folds the running active span into `total_online` and stops accrual.
    fn accrue_online(&mut self, now: SystemTime) {
        if let Some(mark) = self.accrual_mark.take() {
            self.total_online +=
                now.duration_since(mark).unwrap_or(Duration::ZERO);
        }
    }

    /// The single choke point for status changes. Every caller has already
    /// checked legality, so an illegal edge here is a bug in this file.
    fn transition(&mut self, next: SessionStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {}",
            self.status,
            next
        );
        tracing::info!(
            token = %self.token,
            from = %self.status,
            to = %next,
            "session status change"
        );
        self.status = next;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for the session aggregate.
    //!
    //! Time-dependent behavior is tested by constructing explicit
    //! `SystemTime`s and handing them to the operations — no sleeping, no
    //! wall clock, fully deterministic.

    use super::*;
    use crate::token;
    use crate::window::SECS_PER_DAY;

    // -- Helpers ----------------------------------------------------------

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_754_000_000)
    }

    fn at(secs_after_start: u64) -> SystemTime {
        t0() + Duration::from_secs(secs_after_start)
    }

    fn mac(last: u8) -> MacAddr {
        MacAddr::from_octets([0xAA, 0xAA, 0xAA, 0xAA, 0xAA, last])
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    fn grant(duration_days: u32) -> VoucherGrant {
        VoucherGrant {
            voucher_code: VoucherCode::new("VCH-1234567"),
            phone_number: "255700000001".to_string(),
            package_id: PackageId(7),
            duration_days,
            radius_username: "255700000001_VCH-1234567".to_string(),
        }
    }

    fn session(duration_days: u32) -> Session {
        Session::open(
            &grant(duration_days),
            token::issue(),
            mac(0xAA),
            ip(1),
            &SessionPolicy::default(),
            t0(),
        )
        .expect("open should succeed")
    }

    /// Drives a fresh session through enough missed-heartbeat sweeps to
    /// pause it. Returns the time of the pausing sweep.
    fn pause_by_sweeps(s: &mut Session) -> SystemTime {
        let interval = s.heartbeat_interval();
        let mut now = t0();
        for strike in 1..=3 {
            now += interval + Duration::from_secs(1);
            let event = s.check_heartbeat(now);
            if strike < 3 {
                assert!(event.is_none(), "paused too early at strike {strike}");
            } else {
                assert!(
                    matches!(event, Some(SessionEvent::Paused { .. })),
                    "expected pause on third strike"
                );
            }
        }
        now
    }

    // =====================================================================
    // open()
    // =====================================================================

    #[test]
    fn test_open_zero_duration_returns_invalid_duration() {
        let result = Session::open(
            &grant(0),
            token::issue(),
            mac(0xAA),
            ip(1),
            &SessionPolicy::default(),
            t0(),
        );
        assert!(matches!(result, Err(SessionError::InvalidDuration)));
    }

    #[test]
    fn test_open_deadline_is_start_plus_package_days_exactly() {
        let s = session(7);
        assert_eq!(
            s.expires_at(),
            t0() + Duration::from_secs(7 * SECS_PER_DAY)
        );
    }

    #[test]
    fn test_open_heartbeat_interval_follows_duration_tier() {
        assert_eq!(
            session(30).heartbeat_interval(),
            Duration::from_secs(1800)
        );
        assert_eq!(session(7).heartbeat_interval(), Duration::from_secs(900));
        assert_eq!(session(2).heartbeat_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_open_seeds_allow_lists_with_initial_addresses() {
        let s = session(1);
        assert!(s.is_mac_allowed(mac(0xAA)));
        assert!(s.is_ip_allowed(ip(1)));
        assert_eq!(s.status(), SessionStatus::Active);
    }

    // =====================================================================
    // record_activity()
    // =====================================================================

    #[test]
    fn test_record_activity_new_mac_is_adopted_and_counted() {
        // A device rotating from its factory MAC to a randomized one:
        // both stay allowed and the change counter reads 1.
        let mut s = session(1);
        let bb = MacAddr::from_octets([0xBB; 6]);

        s.record_activity(bb, ip(1), at(60)).expect("should succeed");

        assert!(s.is_mac_allowed(mac(0xAA)));
        assert!(s.is_mac_allowed(bb));
        assert_eq!(s.devices().mac_changes(), 1);
        assert_eq!(s.devices().current_mac(), bb);
    }

    #[test]
    fn test_record_activity_does_not_touch_deadline() {
        let mut s = session(1);
        let deadline = s.expires_at();

        s.record_activity(mac(0xBB), ip(2), at(3600)).unwrap();
        s.record_heartbeat(at(3700)).unwrap();

        assert_eq!(s.expires_at(), deadline);
    }

    #[test]
    fn test_record_activity_resumes_paused_session() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);

        let event = s
            .record_activity(mac(0xAA), ip(1), paused_at + Duration::from_secs(5))
            .expect("should succeed");

        assert!(matches!(event, Some(SessionEvent::Resumed { .. })));
        assert_eq!(s.status(), SessionStatus::Active);
    }

    #[test]
    fn test_record_activity_on_expired_session_returns_terminal() {
        let mut s = session(1);
        s.check_expiry(at(SECS_PER_DAY)).expect("should expire");

        let result = s.record_activity(mac(0xBB), ip(2), at(SECS_PER_DAY + 60));

        assert!(matches!(
            result,
            Err(SessionError::Terminal {
                status: SessionStatus::Expired
            })
        ));
        // Nothing was mutated: the new MAC was not adopted.
        assert!(!s.is_mac_allowed(mac(0xBB)));
        assert_eq!(s.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_record_activity_on_suspended_session_does_not_resume() {
        let mut s = session(1);
        s.suspend("tos violation", at(100)).expect("should suspend");

        let event = s
            .record_activity(mac(0xBB), ip(2), at(200))
            .expect("observation itself is accepted");

        assert!(event.is_none());
        assert_eq!(s.status(), SessionStatus::Suspended);
        // The observation was still recorded for audit.
        assert!(s.is_mac_allowed(mac(0xBB)));
    }

    // =====================================================================
    // record_heartbeat() / check_heartbeat()
    // =====================================================================

    #[test]
    fn test_check_heartbeat_three_strikes_pause_the_session() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);

        let snap = s.snapshot(paused_at);
        assert_eq!(snap.status, SessionStatus::Paused);
        assert_eq!(snap.disconnection_count, 1);
        assert!(snap.connection_quality_score < QUALITY_FULL);
    }

    #[test]
    fn test_check_heartbeat_within_interval_no_strike() {
        let mut s = session(1);
        // 300s interval; a sweep at 200s finds nothing overdue.
        assert!(s.check_heartbeat(at(200)).is_none());
        assert_eq!(s.snapshot(at(200)).missed_heartbeats, 0);
    }

    #[test]
    fn test_record_heartbeat_resets_strikes_and_resumes() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);

        let event = s
            .record_heartbeat(paused_at + Duration::from_secs(10))
            .expect("should succeed");

        assert!(matches!(event, Some(SessionEvent::Resumed { .. })));
        assert_eq!(s.status(), SessionStatus::Active);
        assert_eq!(
            s.snapshot(paused_at + Duration::from_secs(10)).missed_heartbeats,
            0
        );
    }

    #[test]
    fn test_check_heartbeat_paused_session_advances_to_reconnecting() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);

        // Next sweep pass flags it ready for seamless resume.
        let event = s.check_heartbeat(paused_at + Duration::from_secs(60));
        assert!(matches!(event, Some(SessionEvent::Reconnecting { .. })));
        assert_eq!(s.status(), SessionStatus::Reconnecting);

        // And a report brings it back.
        let event = s
            .record_heartbeat(paused_at + Duration::from_secs(120))
            .unwrap();
        assert!(matches!(event, Some(SessionEvent::Resumed { .. })));
    }

    #[test]
    fn test_check_heartbeat_paused_without_auto_reconnect_stays_paused() {
        let policy = SessionPolicy {
            auto_reconnect: false,
            ..SessionPolicy::default()
        };
        let mut s = Session::open(
            &grant(1),
            token::issue(),
            mac(0xAA),
            ip(1),
            &policy,
            t0(),
        )
        .unwrap();
        let paused_at = pause_by_sweeps(&mut s);

        assert!(s.check_heartbeat(paused_at + Duration::from_secs(60)).is_none());
        assert_eq!(s.status(), SessionStatus::Paused);
    }

    // =====================================================================
    // check_expiry()
    // =====================================================================

    #[test]
    fn test_check_expiry_before_deadline_is_none() {
        let mut s = session(1);
        assert!(s.check_expiry(at(SECS_PER_DAY - 1)).is_none());
        assert_eq!(s.status(), SessionStatus::Active);
    }

    #[test]
    fn test_check_expiry_past_deadline_expires_active_session() {
        let mut s = session(1);
        let event = s.check_expiry(at(SECS_PER_DAY)).expect("should expire");
        assert!(matches!(event, SessionEvent::Expired { .. }));
        assert_eq!(s.status(), SessionStatus::Expired);
        assert_eq!(s.session_end(), Some(at(SECS_PER_DAY)));
    }

    #[test]
    fn test_check_expiry_expires_paused_session_too() {
        // A session that never heartbeats again must still expire on
        // schedule, not linger indefinitely.
        let mut s = session(1);
        pause_by_sweeps(&mut s);

        let event = s
            .check_expiry(at(SECS_PER_DAY + 30))
            .expect("paused session must expire");
        assert!(matches!(event, SessionEvent::Expired { .. }));
        assert_eq!(s.status(), SessionStatus::Expired);

        // Later heartbeats are rejected and change nothing.
        let result = s.record_heartbeat(at(SECS_PER_DAY + 90));
        assert!(matches!(
            result,
            Err(SessionError::Terminal {
                status: SessionStatus::Expired
            })
        ));
        assert_eq!(s.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_check_expiry_skips_suspended_session() {
        let mut s = session(1);
        s.suspend("fraud review", at(100)).unwrap();

        assert!(s.check_expiry(at(2 * SECS_PER_DAY)).is_none());
        assert_eq!(s.status(), SessionStatus::Suspended);
    }

    #[test]
    fn test_check_expiry_connected_time_mode_uses_accrued_time() {
        let policy = SessionPolicy {
            expiry: ExpiryPolicy::ConnectedTimeOnly,
            ..SessionPolicy::default()
        };
        let mut s = Session::open(
            &grant(1),
            token::issue(),
            mac(0xAA),
            ip(1),
            &policy,
            t0(),
        )
        .unwrap();

        // Pause after ~3 intervals of accrual (~15 min of online time).
        let paused_at = pause_by_sweeps(&mut s);
        // TWO wall-clock days pass while paused: under wall-clock expiry
        // this session would be long dead, but paused time consumed no
        // entitlement here.
        let much_later = paused_at + Duration::from_secs(2 * SECS_PER_DAY);
        assert!(s.check_expiry(much_later).is_none());

        // Resume and let accrued online time reach one full day.
        s.record_heartbeat(much_later).unwrap();
        let accrued_out = much_later + Duration::from_secs(SECS_PER_DAY);
        assert!(s.check_expiry(accrued_out).is_some());
        assert_eq!(s.status(), SessionStatus::Expired);
    }

    // =====================================================================
    // terminate() / suspend()
    // =====================================================================

    #[test]
    fn test_terminate_twice_second_call_is_noop() {
        let mut s = session(1);
        let first = s.terminate("admin disconnect", at(500));
        assert!(matches!(first, Some(SessionEvent::Terminated { .. })));
        let end = s.session_end();

        let second = s.terminate("retry", at(900));
        assert!(second.is_none());
        assert_eq!(s.session_end(), end, "end time must not move");
        assert_eq!(s.status(), SessionStatus::Terminated);
    }

    #[test]
    fn test_terminate_closes_suspended_session() {
        let mut s = session(1);
        s.suspend("fraud review", at(100)).unwrap();
        assert_eq!(s.session_end(), None, "suspension leaves the record open");

        let event = s.terminate("review upheld", at(900));
        assert!(matches!(event, Some(SessionEvent::Terminated { .. })));
        assert_eq!(s.session_end(), Some(at(900)));
    }

    #[test]
    fn test_suspend_from_reconnecting_is_rejected() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);
        s.check_heartbeat(paused_at + Duration::from_secs(60)); // -> Reconnecting

        let result = s.suspend("nope", paused_at + Duration::from_secs(90));
        assert!(matches!(
            result,
            Err(SessionError::NotSuspendable {
                status: SessionStatus::Reconnecting
            })
        ));
    }

    #[test]
    fn test_suspend_on_terminated_session_returns_terminal() {
        let mut s = session(1);
        s.terminate("done", at(100));
        let result = s.suspend("late", at(200));
        assert!(matches!(result, Err(SessionError::Terminal { .. })));
    }

    // =====================================================================
    // extend()
    // =====================================================================

    #[test]
    fn test_extend_moves_deadline_exactly_once_per_call() {
        let mut s = session(1);
        let new_deadline = s.extend(2).expect("should succeed");
        assert_eq!(new_deadline, t0() + Duration::from_secs(3 * SECS_PER_DAY));
        assert_eq!(s.expires_at(), new_deadline);
        assert_eq!(s.snapshot(at(0)).extension_count, 1);
    }

    #[test]
    fn test_extend_zero_days_is_invalid() {
        let mut s = session(1);
        assert!(matches!(s.extend(0), Err(SessionError::InvalidDuration)));
    }

    #[test]
    fn test_extend_on_expired_session_is_rejected() {
        let mut s = session(1);
        s.check_expiry(at(SECS_PER_DAY)).unwrap();
        assert!(matches!(s.extend(1), Err(SessionError::Terminal { .. })));
    }

    // =====================================================================
    // Accrual and queries
    // =====================================================================

    #[test]
    fn test_total_online_only_advances_while_active() {
        let mut s = session(1);
        let paused_at = pause_by_sweeps(&mut s);
        let online_at_pause = s.total_online(paused_at);

        // An hour passes while paused: no accrual.
        let later = paused_at + Duration::from_secs(3600);
        assert_eq!(s.total_online(later), online_at_pause);

        // Resuming restarts the meter.
        s.record_heartbeat(later).unwrap();
        assert_eq!(
            s.total_online(later + Duration::from_secs(120)),
            online_at_pause + Duration::from_secs(120)
        );
    }

    #[test]
    fn test_elapsed_is_wall_clock_and_freezes_at_end() {
        let mut s = session(7);
        // Ongoing: elapsed tracks the wall clock, pauses included.
        pause_by_sweeps(&mut s);
        assert_eq!(s.elapsed(at(5000)), Duration::from_secs(5000));

        s.terminate("admin", at(6000));
        assert_eq!(s.elapsed(at(9999)), Duration::from_secs(6000));
    }

    #[test]
    fn test_remaining_counts_down_to_zero() {
        let s = session(1);
        assert_eq!(
            s.remaining(at(SECS_PER_DAY - 25)),
            Duration::from_secs(25)
        );
        assert_eq!(s.remaining(at(SECS_PER_DAY + 25)), Duration::ZERO);
    }

    #[test]
    fn test_snapshot_reflects_live_state() {
        let mut s = session(7);
        s.record_activity(mac(0xBB), ip(2), at(50)).unwrap();

        let snap = s.snapshot(at(100));
        assert_eq!(snap.status, SessionStatus::Active);
        assert!(snap.connected);
        assert_eq!(snap.mac_changes, 1);
        assert_eq!(snap.ip_changes, 1);
        assert_eq!(snap.current_mac, mac(0xBB));
        assert_eq!(snap.heartbeat_interval_secs, 900);
        assert_eq!(snap.elapsed_secs, 100);
        assert_eq!(snap.total_online_secs, 100);
    }
}
