//! Call identifiers: the addressable name of a remote call.
//!
//! Textual grammar: `[protocol "://"] target "/" command ["?" args]`.
//! When the protocol is omitted the well-known directory-service name
//! (`finder`) is assumed. Target and command are escaped in the textual
//! form so they may contain structural characters.
//!
//! A `CallId` is an immutable value: derived properties (string without
//! arguments, packed size, the directory-service and resolved predicates)
//! are recomputed on demand, and "mutation" is construction of a new value
//! via [`CallId::with_target`] and friends. This deliberately trades a
//! little recomputation for the absence of cache-invalidation state.

use crate::args::ArgList;
use crate::atom::{Atom, AtomKind, AtomValue};
use crate::error::{RelayError, Result};
use crate::escape::{escape, unescape_str};
use crate::wire::WireConfig;
use std::fmt;
use std::str::FromStr;

/// The parsed representation of a remote-call address.
#[derive(Debug, Clone, PartialEq)]
pub struct CallId {
    protocol: String,
    target: String,
    command: String,
    args: ArgList,
}

impl CallId {
    pub fn new(
        protocol: impl Into<String>,
        target: impl Into<String>,
        command: impl Into<String>,
        args: ArgList,
    ) -> Self {
        CallId {
            protocol: protocol.into(),
            target: target.into(),
            command: command.into(),
            args,
        }
    }

    /// A call routed through the directory service (the common case).
    pub fn finder(target: impl Into<String>, command: impl Into<String>, args: ArgList) -> Self {
        CallId::new(WireConfig::FINDER_PROTOCOL, target, command, args)
    }

    /// Parse the textual form.
    pub fn parse(input: &str) -> Result<CallId> {
        let malformed = |reason: &str| RelayError::malformed_identifier(input, reason);

        let (path, args_text) = match input.split_once(WireConfig::ARGS_SEP) {
            Some((path, args)) => (path, Some(args)),
            None => (input, None),
        };

        let (protocol, rest) = match path.split_once(WireConfig::PROTOCOL_SEP) {
            Some((proto, rest)) => (unescape_str(proto)?, rest),
            None => (WireConfig::FINDER_PROTOCOL.to_string(), path),
        };
        if protocol.is_empty() {
            return Err(malformed("empty protocol"));
        }

        let (target, command) = rest
            .split_once(WireConfig::COMMAND_SEP)
            .ok_or_else(|| malformed("missing target/command separator"))?;
        let target = unescape_str(target)?;
        let command = unescape_str(command)?;
        if target.is_empty() {
            return Err(malformed("empty target"));
        }
        if command.is_empty() {
            return Err(malformed("empty command"));
        }

        let args = match args_text {
            Some(text) => ArgList::from_text(text).map_err(|e| {
                RelayError::malformed_identifier(input, format!("bad arguments: {e}"))
            })?,
            None => ArgList::new(),
        };

        Ok(CallId {
            protocol,
            target,
            command,
            args,
        })
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &ArgList {
        &self.args
    }

    /// New identifier with a different target; everything else carried over.
    pub fn with_target(&self, target: impl Into<String>) -> CallId {
        CallId {
            protocol: self.protocol.clone(),
            target: target.into(),
            command: self.command.clone(),
            args: self.args.clone(),
        }
    }

    /// New identifier with a different protocol, e.g. after the directory
    /// service resolved the target to a concrete transport.
    pub fn with_protocol(&self, protocol: impl Into<String>) -> CallId {
        CallId {
            protocol: protocol.into(),
            target: self.target.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
        }
    }

    /// Canonical string form without the argument list.
    pub fn string_without_args(&self) -> String {
        let mut out = escape(self.protocol.as_bytes());
        out.push_str(WireConfig::PROTOCOL_SEP);
        out.push_str(&escape(self.target.as_bytes()));
        out.push(WireConfig::COMMAND_SEP);
        out.push_str(&escape(self.command.as_bytes()));
        out
    }

    /// Whether this call is addressed to the directory service itself:
    /// directory protocol and a target whose name also begins with the
    /// directory placeholder (self-registration and directory-internal
    /// calls).
    pub fn is_for_directory(&self) -> bool {
        self.protocol == WireConfig::FINDER_PROTOCOL
            && self.target.starts_with(WireConfig::FINDER_PROTOCOL)
    }

    /// Whether the identifier already points at a concrete transport-level
    /// target instead of requiring a directory lookup.
    pub fn is_resolved(&self) -> bool {
        self.protocol != WireConfig::FINDER_PROTOCOL
    }

    // ------------------------------------------------------------------
    // Binary form: one unnamed text atom holding the string-without-args,
    // followed by the packed argument list.
    // ------------------------------------------------------------------

    pub fn packed_bytes(&self) -> usize {
        Atom::unnamed(AtomValue::Text(self.string_without_args())).packed_bytes()
            + self.args.packed_bytes()
    }

    /// Write the binary encoding; 0 and no write if `buf` is too small.
    pub fn pack(&self, buf: &mut [u8]) -> usize {
        let need = self.packed_bytes();
        if buf.len() < need {
            return 0;
        }
        let head = Atom::unnamed(AtomValue::Text(self.string_without_args()));
        let mut pos = head.pack(buf);
        pos += self.args.pack(&mut buf[pos..]);
        debug_assert_eq!(pos, need);
        need
    }

    /// Reconstruct from the binary form, returning the identifier and the
    /// bytes consumed. The embedded atom must be a populated text atom.
    pub fn unpack(buf: &[u8]) -> Result<(CallId, usize)> {
        let (head, mut pos) = Atom::unpack(buf).ok_or_else(|| {
            RelayError::malformed_identifier("<packed>", "truncated call atom")
        })?;
        let text = match head.value() {
            AtomValue::Text(t) if !t.is_empty() => t.clone(),
            AtomValue::Text(_) => {
                return Err(RelayError::malformed_identifier(
                    "<packed>",
                    "empty call atom",
                ))
            }
            _ => {
                return Err(RelayError::malformed_identifier(
                    "<packed>",
                    format!(
                        "expected a {} atom, got {}",
                        AtomKind::Text.type_name(),
                        head.kind().type_name()
                    ),
                ))
            }
        };
        let mut call = CallId::parse(&text)?;

        let (args, used) = ArgList::unpack(&buf[pos..]).ok_or_else(|| {
            RelayError::MalformedArguments {
                reason: "truncated packed argument list".to_string(),
            }
        })?;
        pos += used;
        call.args = args;

        Ok((call, pos))
    }
}

impl fmt::Display for CallId {
    /// Inverse of [`CallId::parse`]: the argument text is appended only
    /// when the list is non-empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_without_args())?;
        if !self.args.is_empty() {
            write!(f, "{}{}", WireConfig::ARGS_SEP, self.args.to_text())?;
        }
        Ok(())
    }
}

impl FromStr for CallId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        CallId::parse(s)
    }
}
