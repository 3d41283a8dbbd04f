//! Shared types for Lanyard's integration surface.
//!
//! This crate defines everything that crosses the engine's boundary:
//!
//! - **Types** ([`SessionToken`], [`MacAddr`], [`SessionStatus`],
//!   [`ActivityReport`], etc.) — the identities and report structures the
//!   captive portal and NAS exchange with the engine.
//! - **Events** ([`SessionEvent`]) — lifecycle transitions the engine emits
//!   for the RADIUS accounting bridge and notification subsystem.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those structures are
//!   converted to/from bytes at the integration boundary.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing or
//!   (de)serializing them.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about session state or storage — it
//! only defines the vocabulary the other layers speak:
//!
//! ```text
//! NAS / portal (bytes, strings) → Protocol (typed reports) → Engine (session state)
//! ```

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{AccountingKind, SessionEvent};
pub use types::{
    ActivityReport, HeartbeatReport, MacAddr, PackageId, SessionSnapshot,
    SessionStatus, SessionToken, VoucherCode, VoucherGrant,
};
