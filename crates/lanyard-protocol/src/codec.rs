//! Codec trait and implementations for the integration boundary.
//!
//! A "codec" converts between Rust types and raw bytes. Lanyard itself is
//! transport-agnostic: NAS callbacks might arrive over HTTP, a message
//! queue, or a pipe, and the accounting bridge may want events in whatever
//! framing its collector expects. The engine only needs *something* that
//! implements [`Codec`] — the strategy pattern, so a binary codec can be
//! swapped in later without touching any other code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode protocol types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec is shared across Tokio tasks
/// for the lifetime of the integration; `DeserializeOwned` (rather than
/// plain `Deserialize`) so decoded values own their data and the input
/// buffer can be dropped immediately.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps NAS reports and accounting events human-readable in logs and
/// packet captures, which is worth far more during an outage than the bytes
/// a binary format would save. Behind the default-on `json` feature so
/// embedders with their own codec can drop the dependency.
///
/// ## Example
///
/// ```rust
/// use lanyard_protocol::{Codec, HeartbeatReport, JsonCodec, SessionToken};
/// use std::time::SystemTime;
///
/// let codec = JsonCodec;
/// let report = HeartbeatReport {
///     token: SessionToken::new("9f86d081deadbeef9f86d081deadbeef"),
///     timestamp: SystemTime::UNIX_EPOCH,
/// };
///
/// let bytes = codec.encode(&report).unwrap();
/// let decoded: HeartbeatReport = codec.decode(&bytes).unwrap();
/// assert_eq!(report, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
