//! Lifecycle events emitted by the engine.
//!
//! Every session state change produces one [`SessionEvent`]. Two external
//! collaborators consume the stream: the RADIUS accounting bridge (which
//! turns them into Start / Interim-Update / Stop records) and the
//! notification subsystem ("your session is ending" alerts). The engine
//! itself never reads events back — they are outbound only.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::{SessionStatus, SessionToken, VoucherCode};

/// A session lifecycle transition.
///
/// Events carry enough context for the bridge to build an accounting
/// record without querying the engine back: the token is always present,
/// and terminal events carry the accrued online time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A voucher was redeemed and a session opened.
    Created {
        token: SessionToken,
        voucher_code: VoucherCode,
        expires_at: SystemTime,
    },
    /// A paused or reconnecting session was resumed by a heartbeat or
    /// activity report.
    Resumed { token: SessionToken },
    /// Heartbeat tolerance exhausted; the device is presumed gone.
    Paused {
        token: SessionToken,
        missed_heartbeats: u32,
    },
    /// A paused session was flagged ready for seamless resume.
    Reconnecting { token: SessionToken },
    /// The purchased window elapsed.
    Expired {
        token: SessionToken,
        total_online: Duration,
    },
    /// The session was explicitly or administratively ended.
    Terminated {
        token: SessionToken,
        reason: String,
        total_online: Duration,
    },
    /// Administrative freeze (abuse response).
    Suspended {
        token: SessionToken,
        reason: String,
    },
}

impl SessionEvent {
    /// The session this event belongs to.
    pub fn token(&self) -> &SessionToken {
        match self {
            Self::Created { token, .. }
            | Self::Resumed { token }
            | Self::Paused { token, .. }
            | Self::Reconnecting { token }
            | Self::Expired { token, .. }
            | Self::Terminated { token, .. }
            | Self::Suspended { token, .. } => token,
        }
    }

    /// The status the session holds after this event.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Created { .. } | Self::Resumed { .. } => SessionStatus::Active,
            Self::Paused { .. } => SessionStatus::Paused,
            Self::Reconnecting { .. } => SessionStatus::Reconnecting,
            Self::Expired { .. } => SessionStatus::Expired,
            Self::Terminated { .. } => SessionStatus::Terminated,
            Self::Suspended { .. } => SessionStatus::Suspended,
        }
    }

    /// Maps the transition onto a RADIUS accounting record kind.
    ///
    /// A pause is a `Stop` (the device is gone and the NAS should stop
    /// metering), a resume is a fresh `Start`. `Reconnecting` is internal
    /// bookkeeping and produces no accounting record at all.
    pub fn accounting_kind(&self) -> Option<AccountingKind> {
        match self {
            Self::Created { .. } | Self::Resumed { .. } => {
                Some(AccountingKind::Start)
            }
            Self::Paused { .. }
            | Self::Expired { .. }
            | Self::Terminated { .. }
            | Self::Suspended { .. } => Some(AccountingKind::Stop),
            Self::Reconnecting { .. } => None,
        }
    }
}

/// The three RADIUS accounting record kinds the bridge can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountingKind {
    Start,
    InterimUpdate,
    Stop,
}
