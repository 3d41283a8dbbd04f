//! Error types for the session layer.

use lanyard_identity::IdentityError;
use lanyard_protocol::SessionStatus;

/// Errors that can occur while operating on a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Creation or extension with a non-positive duration. Rejected before
    /// any state is created — the portal shows this to the customer.
    #[error("package duration must be at least one day")]
    InvalidDuration,

    /// An operation reached a session that is already expired or
    /// terminated. NAS devices routinely retry stale tokens after session
    /// end, so callers log this at low severity and treat it as a no-op —
    /// the state machine guarantees nothing was mutated.
    #[error("session is {status} and no longer accepts operations")]
    Terminal { status: SessionStatus },

    /// `suspend` was called on a session that is neither active nor
    /// paused (suspension is an abuse response against a live session).
    #[error("suspend requires an active or paused session (currently {status})")]
    NotSuspendable { status: SessionStatus },

    /// A device observation was rejected by a configured anti-sharing cap.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
