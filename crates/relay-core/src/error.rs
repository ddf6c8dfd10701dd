//! Error types for the relay RPC substrate.
//!
//! One taxonomy covers both crates: framing problems that desynchronize a
//! connection, recoverable probe failures, per-call decode failures, and
//! local registration errors. Nothing here is process-fatal.

use crate::call_error::CallError;
use thiserror::Error;

/// Main error type for relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    // Framing errors: the connection should be treated as desynchronized.
    #[error("framing error: {reason}")]
    Framing { reason: String },

    #[error("protocol version mismatch: peer sent {got_major}.{got_minor}")]
    VersionMismatch { got_major: u32, got_minor: u32 },

    /// The buffer holds a well-formed envelope of a different kind.
    /// Recoverable: a caller probing for one kind may retry with another.
    #[error("unexpected envelope type: expected '{expected}', got '{got}'")]
    WrongEnvelopeType { expected: char, got: char },

    // Per-call parse failures: scoped to one call, other in-flight calls
    // on the same connection are unaffected.
    #[error("malformed call identifier {input:?}: {reason}")]
    MalformedIdentifier { input: String, reason: String },

    #[error("malformed argument list: {reason}")]
    MalformedArguments { reason: String },

    #[error("decode failure at byte {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    // Registration errors
    #[error("handler already registered for {name:?}")]
    DuplicateHandler { name: String },

    // Transport errors, reported by the connection collaborator.
    #[error("transport error: {message}")]
    Transport { message: String },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create a framing error.
    pub fn framing(reason: impl Into<String>) -> Self {
        RelayError::Framing {
            reason: reason.into(),
        }
    }

    /// Create a malformed-identifier error.
    pub fn malformed_identifier(input: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::MalformedIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode failure positioned at a byte offset.
    pub fn decode(offset: usize, reason: impl Into<String>) -> Self {
        RelayError::Decode {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        RelayError::Transport {
            message: message.into(),
        }
    }

    /// Whether this error leaves the connection usable.
    ///
    /// Framing and version errors mean the byte stream can no longer be
    /// trusted; everything else is scoped to a single call.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::Framing { .. } | RelayError::VersionMismatch { .. }
        )
    }

    /// Map a local failure to the wire-level outcome sent back to a caller.
    pub fn to_call_error(&self) -> CallError {
        match self {
            RelayError::MalformedIdentifier { .. }
            | RelayError::MalformedArguments { .. }
            | RelayError::Decode { .. } => CallError::bad_args(self.to_string()),

            RelayError::Transport { .. } => CallError::send_failed(self.to_string()),

            _ => CallError::internal(self.to_string()),
        }
    }
}
