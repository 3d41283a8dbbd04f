//! Unified error type for the engine's public API.

use lanyard_protocol::SessionToken;
use lanyard_session::SessionError;

/// Errors returned by [`SessionEngine`](crate::SessionEngine) operations.
///
/// The split matters operationally: `NotFound` is always surfaced loudly
/// (an unknown token may be forgery or a badly stale client), while a
/// wrapped [`SessionError::Terminal`] is the expected noise of NAS
/// equipment retrying tokens after session end and is logged at `debug`
/// before being returned.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No session exists for this token — never silently ignored.
    #[error("no session for token {0}")]
    NotFound(SessionToken),

    /// A session-level rejection (invalid duration, terminal state,
    /// anti-sharing cap, ...).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_identity::IdentityError;
    use lanyard_protocol::SessionStatus;

    #[test]
    fn test_from_session_error() {
        let err: EngineError = SessionError::InvalidDuration.into();
        assert!(matches!(err, EngineError::Session(_)));
        assert!(err.to_string().contains("at least one day"));
    }

    #[test]
    fn test_from_identity_error_via_session_error() {
        let session_err: SessionError =
            IdentityError::MacLimitReached { limit: 4 }.into();
        let err: EngineError = session_err.into();
        assert!(err.to_string().contains("4 distinct MAC"));
    }

    #[test]
    fn test_terminal_error_names_the_status() {
        let err: EngineError = SessionError::Terminal {
            status: SessionStatus::Expired,
        }
        .into();
        assert!(err.to_string().contains("expired"));
    }
}
