//! Error types for the protocol layer.
//!
//! Each crate in Lanyard defines its own error enum, so a `ProtocolError`
//! always means "the bytes or text were wrong", never "the session state
//! machine refused" — those live in the session and engine crates.

/// Errors that can occur while parsing or (de)serializing protocol types.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a protocol type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed JSON, missing fields, or a
    /// truncated NAS payload.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The text is not a valid 48-bit MAC address in colon or dash form.
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),
}
