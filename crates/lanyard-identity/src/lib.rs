//! Device identity tracking for Lanyard sessions.
//!
//! Consumer devices rotate their MAC address per network (MAC
//! randomization) and pick up new IPs on DHCP renewal or AP roaming.
//! Rejecting those as "new devices" would force re-authentication
//! mid-session and break the product's "buy once, stay connected"
//! guarantee. This crate implements the other side of that bargain:
//! **monotonic trust expansion** — once an address has been observed under
//! a valid session token, it stays trusted until the session ends.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)   ← routes NAS observations to the owning session
//!     ↕
//! Session (above)  ← owns one DeviceRegistry per session
//!     ↕
//! Identity (this crate) ← the allow-lists and change counters
//! ```

mod error;
mod registry;

pub use error::IdentityError;
pub use registry::{DeviceRegistry, Observation, RegistryLimits};
