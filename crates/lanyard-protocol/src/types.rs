//! Core types for Lanyard's integration surface.
//!
//! This module defines the identities and report structures that cross the
//! engine boundary: what the captive portal hands over when a voucher is
//! redeemed, what the NAS reports while a device is online, and what the
//! engine answers when queried.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The opaque reconnection token that identifies one voucher session.
///
/// Minted once at session creation, immutable for the session's lifetime,
/// and never reused across sessions — even for the same voucher. The portal
/// presents it to resume a session after a redirect or device sleep without
/// re-prompting for the voucher code, so possession of the token IS the
/// authorization boundary.
///
/// This is a "newtype wrapper" around `String`: it costs nothing at runtime
/// but stops a voucher code from being passed where a token is expected.
///
/// `#[serde(transparent)]` serializes the inner string directly, so a token
/// appears in JSON as `"9f86d081..."`, not `{ "0": "9f86d081..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    /// Wraps an existing token string (e.g. one decoded from a NAS report).
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrows the raw token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A prepaid voucher code, as printed on the scratch card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherCode(pub String);

impl VoucherCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the internet package a voucher was sold against.
///
/// The catalog itself (names, prices, speeds) lives outside the engine;
/// sessions only carry the ID through for accounting and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub u64);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PKG-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MacAddr
// ---------------------------------------------------------------------------

/// A 48-bit hardware address, stored in canonical binary form.
///
/// MAC addresses arrive from NAS equipment in several spellings
/// (`aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF`, mixed case). Parsing them
/// into six octets up front means membership checks in the allow-list are
/// byte comparisons, not case-folded string games.
///
/// `Ord` is derived so the type can live in a `BTreeSet` (the allow-list's
/// ordered-set representation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Builds an address from raw octets.
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the six raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddr {
    type Err = ProtocolError;

    /// Parses `AA:BB:CC:DD:EE:FF` or `AA-BB-CC-DD-EE-FF`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = if s.contains('-') { '-' } else { ':' };
        let mut octets = [0u8; 6];
        let mut count = 0;

        for part in s.split(sep) {
            if count == 6 || part.len() != 2 {
                return Err(ProtocolError::InvalidMac(s.to_string()));
            }
            octets[count] = u8::from_str_radix(part, 16)
                .map_err(|_| ProtocolError::InvalidMac(s.to_string()))?;
            count += 1;
        }

        if count != 6 {
            return Err(ProtocolError::InvalidMac(s.to_string()));
        }
        Ok(Self(octets))
    }
}

/// Canonical display form: uppercase, colon-separated.
impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// On the wire a MAC is a string in canonical form, not an octet array —
/// that keeps NAS report payloads human-readable in logs and debuggers.
impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a voucher session.
///
/// ```text
///            ┌──────(resume)──────────────┐
///            ▼                            │
///         Active ──(missed beats)──→ Paused ──(auto-reconnect)──→ Reconnecting
///            │                            │                            │
///            │◄───────────(resume)────────┴────────────────────────────┘
///            │
///            ├──(admin)──→ Suspended ──(admin)──→ Terminated   [terminal]
///            ├──(admin)──→ Terminated                          [terminal]
///            └──(deadline)─→ Expired                           [terminal]
/// ```
///
/// The Active↔Paused↔Reconnecting cycle may repeat any number of times;
/// everything else is monotonic toward a terminal state. `Expired` and
/// `Terminated` are final — nothing leaves them, and reports against them
/// are answered with a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Device is connected and the purchased window is accruing online time.
    Active,
    /// Too many missed heartbeats — device presumed gone, window still open.
    Paused,
    /// Paused session flagged ready for seamless resume (no re-auth).
    Reconnecting,
    /// Administratively frozen (abuse response); only a terminate leaves it.
    Suspended,
    /// Purchased window elapsed.
    Expired,
    /// Explicitly or administratively ended.
    Terminated,
}

impl SessionStatus {
    /// `true` once no further transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Terminated)
    }

    /// `true` for the states a heartbeat or activity report may resume.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Paused | Self::Reconnecting)
    }

    /// The full transition table. Every status change in the engine goes
    /// through this check, so an illegal edge can't be introduced by a
    /// single forgotten `if`.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match self {
            Active => matches!(next, Paused | Suspended | Expired | Terminated),
            Paused => matches!(
                next,
                Active | Reconnecting | Suspended | Expired | Terminated
            ),
            Reconnecting => matches!(next, Active | Expired | Terminated),
            Suspended => matches!(next, Terminated),
            Expired | Terminated => false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Reconnecting => "reconnecting",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Inbound reports
// ---------------------------------------------------------------------------

/// The voucher validation result handed over by the captive portal.
///
/// Lanyard begins where voucher authentication ends: the portal has already
/// checked the code, taken payment, and resolved the package. This struct
/// is that hand-off, and it is everything the engine needs to open a
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherGrant {
    pub voucher_code: VoucherCode,
    pub phone_number: String,
    pub package_id: PackageId,
    /// Purchased duration in wall-clock days. Must be at least 1.
    pub duration_days: u32,
    /// Username provisioned in the RADIUS user table for this redemption.
    pub radius_username: String,
}

/// A NAS activity report: "this token was just seen from this MAC/IP".
///
/// Sent at minimum on every MAC/IP change and at heartbeat cadence. The
/// timestamp is the NAS's own observation time; the engine trusts it as
/// `now` rather than stamping arrival time, so reports delayed in transit
/// still land on the correct side of a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    pub token: SessionToken,
    pub mac: MacAddr,
    pub ip: IpAddr,
    pub timestamp: SystemTime,
}

/// A bare liveness ping for a session, without address observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReport {
    pub token: SessionToken,
    pub timestamp: SystemTime,
}

// ---------------------------------------------------------------------------
// Query response
// ---------------------------------------------------------------------------

/// Point-in-time view of one session, served to the portal and admin UIs.
///
/// Everything here is derived — the snapshot is a copy, and mutating it
/// has no effect on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub token: SessionToken,
    pub voucher_code: VoucherCode,
    pub package_id: PackageId,
    pub status: SessionStatus,
    /// Convenience flag: `status == Active`.
    pub connected: bool,
    pub expires_at: SystemTime,
    pub remaining_secs: u64,
    pub elapsed_secs: u64,
    /// Accrued online time (only advances while Active).
    pub total_online_secs: u64,
    pub current_mac: MacAddr,
    pub current_ip: IpAddr,
    pub mac_changes: u32,
    pub ip_changes: u32,
    pub heartbeat_interval_secs: u64,
    pub last_heartbeat: SystemTime,
    pub missed_heartbeats: u32,
    pub disconnection_count: u32,
    pub extension_count: u32,
    pub connection_quality_score: f64,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- MacAddr ----------------------------------------------------------

    #[test]
    fn test_mac_from_str_colon_form_parses() {
        let mac: MacAddr = "aa:bb:cc:dd:ee:ff".parse().expect("should parse");
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_mac_from_str_dash_form_parses() {
        let mac: MacAddr = "AA-BB-CC-DD-EE-FF".parse().expect("should parse");
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_mac_from_str_is_case_insensitive() {
        let lower: MacAddr = "0a:1b:2c:3d:4e:5f".parse().unwrap();
        let upper: MacAddr = "0A:1B:2C:3D:4E:5F".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_mac_from_str_rejects_short_input() {
        assert!("aa:bb:cc:dd:ee".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_from_str_rejects_long_input() {
        assert!("aa:bb:cc:dd:ee:ff:00".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_from_str_rejects_bad_hex() {
        assert!("gg:bb:cc:dd:ee:ff".parse::<MacAddr>().is_err());
        assert!("aaa:bb:cc:dd:ee:f".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_display_is_canonical_uppercase() {
        let mac = MacAddr::from_octets([0x0A, 0x1B, 0x2C, 0x3D, 0x4E, 0x5F]);
        assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_mac_serde_round_trips_as_string() {
        let mac = MacAddr::from_octets([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"DE:AD:BE:EF:00:01\"");
        let back: MacAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    // -- SessionStatus transition table -----------------------------------

    #[test]
    fn test_can_transition_to_terminal_states_allow_nothing() {
        for next in [
            SessionStatus::Active,
            SessionStatus::Paused,
            SessionStatus::Reconnecting,
            SessionStatus::Suspended,
            SessionStatus::Expired,
            SessionStatus::Terminated,
        ] {
            assert!(!SessionStatus::Expired.can_transition_to(next));
            assert!(!SessionStatus::Terminated.can_transition_to(next));
        }
    }

    #[test]
    fn test_can_transition_to_active_paused_reconnecting_cycle() {
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Paused));
        assert!(SessionStatus::Paused.can_transition_to(SessionStatus::Active));
        assert!(
            SessionStatus::Paused.can_transition_to(SessionStatus::Reconnecting)
        );
        assert!(
            SessionStatus::Reconnecting.can_transition_to(SessionStatus::Active)
        );
    }

    #[test]
    fn test_can_transition_to_suspended_only_terminates() {
        assert!(
            SessionStatus::Suspended.can_transition_to(SessionStatus::Terminated)
        );
        assert!(!SessionStatus::Suspended.can_transition_to(SessionStatus::Active));
        assert!(
            !SessionStatus::Suspended.can_transition_to(SessionStatus::Expired)
        );
    }

    #[test]
    fn test_can_transition_to_suspend_reachable_from_active_and_paused_only() {
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Suspended));
        assert!(SessionStatus::Paused.can_transition_to(SessionStatus::Suspended));
        assert!(
            !SessionStatus::Reconnecting
                .can_transition_to(SessionStatus::Suspended)
        );
    }

    #[test]
    fn test_is_terminal_flags_expired_and_terminated() {
        assert!(SessionStatus::Expired.is_terminal());
        assert!(SessionStatus::Terminated.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
        assert!(!SessionStatus::Suspended.is_terminal());
    }
}
