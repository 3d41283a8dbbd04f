//! Session token issuance.
//!
//! The token is what lets a device resume its session after a captive-
//! portal redirect or device sleep without retyping the voucher code — so
//! it must be unguessable. 128 bits of OS-seeded randomness makes guessing
//! a live token computationally infeasible, and deriving nothing from the
//! voucher code or timestamp means a leaked voucher batch reveals nothing
//! about the tokens in play.

use lanyard_protocol::SessionToken;
use rand::Rng;

/// Length of an issued token in characters (16 bytes as lowercase hex).
pub const TOKEN_LEN: usize = 32;

/// Mints a fresh session token: 128 random bits, hex-encoded.
///
/// Hex keeps the token URL-safe for the portal's resume links. Uniqueness
/// across sessions is enforced by the engine's store (which retries on the
/// astronomically-rare collision), not here.
pub fn issue() -> SessionToken {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    SessionToken::new(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_token_has_expected_length() {
        assert_eq!(issue().as_str().len(), TOKEN_LEN);
    }

    #[test]
    fn test_issue_token_is_lowercase_hex() {
        let token = issue();
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "unexpected character in {token}"
        );
    }

    #[test]
    fn test_issue_tokens_do_not_repeat() {
        // Not a proof of randomness, just a tripwire for a broken RNG hookup.
        let mut seen = std::collections::HashSet::new();
        for _ in 0..128 {
            assert!(seen.insert(issue()), "duplicate token issued");
        }
    }
}
