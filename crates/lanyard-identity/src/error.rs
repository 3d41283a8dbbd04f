//! Error types for the identity layer.

/// Errors that can occur while recording a device observation.
///
/// Both variants exist only when an operator has configured an
/// anti-sharing cap ([`RegistryLimits`](crate::RegistryLimits)); with the
/// default unbounded policy the registry never fails.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The session already trusts the configured maximum number of
    /// distinct MAC addresses.
    #[error("session already trusts {limit} distinct MAC addresses")]
    MacLimitReached { limit: usize },

    /// The session already trusts the configured maximum number of
    /// distinct IP addresses.
    #[error("session already trusts {limit} distinct IP addresses")]
    IpLimitReached { limit: usize },
}
