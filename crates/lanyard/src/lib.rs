//! Lanyard: voucher-backed hotspot session continuity.
//!
//! Lanyard tracks a customer's purchased access window across a
//! captive-portal network where the device's MAC and IP can legitimately
//! change mid-session (MAC randomization, DHCP renewal, AP roaming),
//! enforces the purchased duration exactly, and detects genuine
//! disconnection — without mistaking a roaming device for a new,
//! unauthorized client.
//!
//! # The flow
//!
//! ```text
//! portal validates voucher ──→ SessionEngine::create_session
//! NAS reports activity/beats ─→ record_activity / record_heartbeat
//! background sweeper (60s) ──→ sweep_expirations + sweep_missed_heartbeats
//! engine emits transitions ──→ RADIUS accounting bridge, notifications
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use lanyard::prelude::*;
//!
//! let engine = SessionEngine::new(EngineConfig::default());
//! let mut events = engine.subscribe();
//! let sweeper = spawn_sweeper(engine.clone(), SweepConfig::default());
//!
//! let snap = engine
//!     .create_session(&grant, mac, ip, SystemTime::now())
//!     .await?;
//! // hand snap.token to the portal; the NAS reports against it from here
//! ```

mod engine;
mod error;
mod sweeper;

pub use engine::{EngineConfig, SessionEngine, SweepOutcome};
pub use error::EngineError;
pub use sweeper::{SweeperHandle, spawn_sweeper};

// The vocabulary the engine speaks, re-exported so embedders need only
// this crate.
pub use lanyard_identity::{IdentityError, RegistryLimits};
pub use lanyard_protocol::{
    AccountingKind, ActivityReport, HeartbeatReport, MacAddr, PackageId,
    SessionEvent, SessionSnapshot, SessionStatus, SessionToken, VoucherCode,
    VoucherGrant,
};
pub use lanyard_session::{
    ExpiryPolicy, HeartbeatTiers, SessionError, SessionPolicy,
};
pub use lanyard_sweep::SweepConfig;

/// One-line import for embedders.
pub mod prelude {
    pub use crate::{
        ActivityReport, EngineConfig, EngineError, HeartbeatReport, MacAddr,
        SessionEngine, SessionEvent, SessionPolicy, SessionSnapshot,
        SessionStatus, SessionToken, SweepConfig, SweeperHandle, VoucherCode,
        VoucherGrant, spawn_sweeper,
    };
}
