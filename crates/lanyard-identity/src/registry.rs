//! The device registry: per-session MAC/IP allow-lists.

use std::collections::BTreeSet;
use std::net::IpAddr;

use lanyard_protocol::MacAddr;

use crate::IdentityError;

// ---------------------------------------------------------------------------
// RegistryLimits
// ---------------------------------------------------------------------------

/// Optional caps on how many distinct addresses one session may accumulate.
///
/// The default is unbounded on both axes — token possession is the
/// authorization boundary, and a phone that rotates its MAC daily for a
/// month is still one customer. Operators who see voucher sharing can set
/// a cap, turning the excess observation into a hard error instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryLimits {
    /// Maximum distinct MAC addresses per session. `None` = unbounded.
    pub max_macs: Option<usize>,
    /// Maximum distinct IP addresses per session. `None` = unbounded.
    pub max_ips: Option<usize>,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// What the registry concluded about one reported address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Same address as the current one — nothing changed.
    Unchanged,
    /// Different from current, but already in the allow-list (a device
    /// flipping back to an earlier randomized MAC, or an IP reassigned by
    /// the same DHCP pool). Becomes current; the change counter advances.
    Known,
    /// Never seen before. Added to the allow-list and made current.
    Adopted,
}

impl Observation {
    /// `true` if the observation moved the session's current address.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

// ---------------------------------------------------------------------------
// DeviceRegistry
// ---------------------------------------------------------------------------

/// The set of MAC and IP addresses currently considered "the same device"
/// for one session.
///
/// Invariants:
/// - The allow-lists are append-only: an address, once trusted, is never
///   evicted within a session (only session termination discards them).
/// - The current MAC/IP is always a member of its allow-list.
/// - Change counters are monotonic and diagnostic only — nothing reads
///   them to make decisions.
///
/// The lists are `BTreeSet`s rather than `Vec`s so membership checks are
/// logarithmic and iteration order is stable for snapshots and audit dumps.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    current_mac: MacAddr,
    current_ip: IpAddr,
    allowed_macs: BTreeSet<MacAddr>,
    allowed_ips: BTreeSet<IpAddr>,
    mac_changes: u32,
    ip_changes: u32,
    limits: RegistryLimits,
}

impl DeviceRegistry {
    /// Creates a registry seeded with the device that redeemed the voucher.
    pub fn new(initial_mac: MacAddr, initial_ip: IpAddr, limits: RegistryLimits) -> Self {
        Self {
            current_mac: initial_mac,
            current_ip: initial_ip,
            allowed_macs: BTreeSet::from([initial_mac]),
            allowed_ips: BTreeSet::from([initial_ip]),
            mac_changes: 0,
            ip_changes: 0,
            limits,
        }
    }

    /// Records a MAC observation under this session's token.
    ///
    /// Unconditional trust: any MAC reported by the access infrastructure
    /// for a valid token is accepted as the same device, because the
    /// captive portal already bound the token to a physical access event.
    ///
    /// # Errors
    /// [`IdentityError::MacLimitReached`] if adopting the address would
    /// exceed a configured cap. The registry is left untouched.
    pub fn observe_mac(&mut self, mac: MacAddr) -> Result<Observation, IdentityError> {
        if mac == self.current_mac {
            return Ok(Observation::Unchanged);
        }

        let observation = if self.allowed_macs.contains(&mac) {
            Observation::Known
        } else {
            if let Some(limit) = self.limits.max_macs {
                if self.allowed_macs.len() >= limit {
                    return Err(IdentityError::MacLimitReached { limit });
                }
            }
            self.allowed_macs.insert(mac);
            Observation::Adopted
        };

        tracing::debug!(old = %self.current_mac, new = %mac, "MAC change accepted");
        self.current_mac = mac;
        self.mac_changes += 1;
        Ok(observation)
    }

    /// Records an IP observation. Same trust rule as [`observe_mac`](Self::observe_mac).
    pub fn observe_ip(&mut self, ip: IpAddr) -> Result<Observation, IdentityError> {
        if ip == self.current_ip {
            return Ok(Observation::Unchanged);
        }

        let observation = if self.allowed_ips.contains(&ip) {
            Observation::Known
        } else {
            if let Some(limit) = self.limits.max_ips {
                if self.allowed_ips.len() >= limit {
                    return Err(IdentityError::IpLimitReached { limit });
                }
            }
            self.allowed_ips.insert(ip);
            Observation::Adopted
        };

        tracing::debug!(old = %self.current_ip, new = %ip, "IP change accepted");
        self.current_ip = ip;
        self.ip_changes += 1;
        Ok(observation)
    }

    /// Pure membership check, used by firewall integration on the hot path.
    pub fn is_mac_allowed(&self, mac: MacAddr) -> bool {
        self.allowed_macs.contains(&mac)
    }

    /// Pure membership check for IPs.
    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.allowed_ips.contains(&ip)
    }

    pub fn current_mac(&self) -> MacAddr {
        self.current_mac
    }

    pub fn current_ip(&self) -> IpAddr {
        self.current_ip
    }

    /// How many times the current MAC moved to a different address.
    pub fn mac_changes(&self) -> u32 {
        self.mac_changes
    }

    pub fn ip_changes(&self) -> u32 {
        self.ip_changes
    }

    /// Number of distinct MACs this session trusts.
    pub fn trusted_mac_count(&self) -> usize {
        self.allowed_macs.len()
    }

    pub fn trusted_ip_count(&self) -> usize {
        self.allowed_ips.len()
    }

    /// The trusted MACs in stable order, for snapshots and audit dumps.
    pub fn allowed_macs(&self) -> impl Iterator<Item = &MacAddr> {
        self.allowed_macs.iter()
    }

    pub fn allowed_ips(&self) -> impl Iterator<Item = &IpAddr> {
        self.allowed_ips.iter()
    }
}

// =========================================================================
// Tests
// =========================================================================
