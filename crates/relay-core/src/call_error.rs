//! Wire-level call outcomes.
//!
//! A `CallError` travels in every result envelope and is also used for
//! local dispatch failures, so callers see one uniform shape. The code
//! registry is closed; unknown numbers arriving off the wire decode to
//! [`CallErrorCode::InternalError`] with the original number preserved in
//! the note.

use std::fmt;

/// Fixed registry of call outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CallErrorCode {
    Okay = 0,
    BadArgs = 1,
    CommandFailed = 2,
    NoSuchCommand = 3,
    ResolveFailed = 4,
    SendFailed = 5,
    ReplyTimeout = 6,
    InternalError = 7,
}

impl CallErrorCode {
    /// Numeric form used on the wire.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a wire code; `None` for numbers outside the registry.
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(CallErrorCode::Okay),
            1 => Some(CallErrorCode::BadArgs),
            2 => Some(CallErrorCode::CommandFailed),
            3 => Some(CallErrorCode::NoSuchCommand),
            4 => Some(CallErrorCode::ResolveFailed),
            5 => Some(CallErrorCode::SendFailed),
            6 => Some(CallErrorCode::ReplyTimeout),
            7 => Some(CallErrorCode::InternalError),
            _ => None,
        }
    }
}

/// Outcome of a call: a registry code plus a free-text diagnostic note.
///
/// The canonical success value is code `Okay` with an empty note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    code: CallErrorCode,
    note: String,
}

impl CallError {
    pub fn new(code: CallErrorCode, note: impl Into<String>) -> Self {
        CallError {
            code,
            note: note.into(),
        }
    }

    /// The canonical success value.
    pub fn okay() -> Self {
        CallError::new(CallErrorCode::Okay, "")
    }

    pub fn bad_args(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::BadArgs, note)
    }

    pub fn command_failed(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::CommandFailed, note)
    }

    pub fn no_such_command(name: &str) -> Self {
        CallError::new(CallErrorCode::NoSuchCommand, format!("no such command: {name}"))
    }

    pub fn resolve_failed(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::ResolveFailed, note)
    }

    pub fn send_failed(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::SendFailed, note)
    }

    pub fn reply_timeout(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::ReplyTimeout, note)
    }

    pub fn internal(note: impl Into<String>) -> Self {
        CallError::new(CallErrorCode::InternalError, note)
    }

    /// Reconstruct from wire values. Unknown codes become `InternalError`
    /// with the number kept in the note for diagnostics.
    pub fn from_wire(code: u32, note: impl Into<String>) -> Self {
        match CallErrorCode::from_u32(code) {
            Some(code) => CallError::new(code, note),
            None => CallError::new(
                CallErrorCode::InternalError,
                format!("unknown error code {code}: {}", note.into()),
            ),
        }
    }

    pub fn code(&self) -> CallErrorCode {
        self.code
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn is_okay(&self) -> bool {
        self.code == CallErrorCode::Okay
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.note.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.note)
        }
    }
}
