//! Error types for the protocol layer.
//!
//! Each crate in Turncoat defines its own error enum. A `ProtocolError`
//! always means "these bytes or this token could not be understood",
//! never a rule violation or a delivery failure.

/// Errors that can occur while encoding, decoding, or parsing.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: a truncated state file, missing fields, or a file
    /// written by something else entirely.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The input parsed but is not a valid protocol value, e.g. an
    /// interactive choice token the engine never issued.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
