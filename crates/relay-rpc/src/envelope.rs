//! Line-delimited message framing for the directory-service protocol.
//!
//! Wire format, all header lines `\n`-terminated ASCII:
//!
//! ```text
//! Relay Protocol <major>.<minor>
//! MsgType <tag>
//! Seqno <decimal>
//! Data
//! <payload bytes>
//! ```
//!
//! A call envelope's payload is the canonical string form of a
//! [`CallId`]; a result envelope's payload is
//! `<code> / <escaped note>\n<argument list text or empty>`.
//!
//! Header parsing is a strict single-pass scan: every literal label must
//! match exactly, the version pair must equal this implementation's own,
//! and the message-type character must equal the kind the caller expects.
//! Parsing returns the byte offset where the payload begins so the caller
//! can slice the remainder without re-scanning.

use bytes::{BufMut, Bytes, BytesMut};
use relay_core::escape::{escape, unescape_str};
use relay_core::{ArgList, CallError, CallId, RelayError, Result};

/// Framing constants. The header labels and version pair must be
/// reproduced byte-for-byte to interoperate with unmodified peers.
pub struct ProtocolConfig;

impl ProtocolConfig {
    pub const PREAMBLE: &'static str = "Relay Protocol";
    pub const MAJOR: u32 = 0;
    pub const MINOR: u32 = 1;
    pub const MSGTYPE_LABEL: &'static str = "MsgType";
    pub const SEQNO_LABEL: &'static str = "Seqno";
    pub const DATA_LABEL: &'static str = "Data";

    /// Upper bound on a frame we are willing to assemble.
    pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

    /// Base for freshly created sequence counters. Arbitrary but fixed,
    /// so captures are easy to eyeball.
    pub const SEQNO_BASE: u32 = 1000;
}

/// The two concrete envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Carries a call identifier (a request).
    Call,
    /// Carries a call outcome plus result arguments (a response).
    Result,
}

impl EnvelopeKind {
    pub fn tag(self) -> char {
        match self {
            EnvelopeKind::Call => 'c',
            EnvelopeKind::Result => 'r',
        }
    }
}

fn header(kind: EnvelopeKind, seqno: u32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(
        format!(
            "{} {}.{}\n",
            ProtocolConfig::PREAMBLE,
            ProtocolConfig::MAJOR,
            ProtocolConfig::MINOR
        )
        .as_bytes(),
    );
    buf.put_slice(format!("{} {}\n", ProtocolConfig::MSGTYPE_LABEL, kind.tag()).as_bytes());
    buf.put_slice(format!("{} {}\n", ProtocolConfig::SEQNO_LABEL, seqno).as_bytes());
    buf.put_slice(ProtocolConfig::DATA_LABEL.as_bytes());
    buf.put_u8(b'\n');
    buf
}

/// Encode a call envelope.
pub fn encode_call(seqno: u32, call: &CallId) -> Bytes {
    let mut buf = header(EnvelopeKind::Call, seqno);
    buf.put_slice(call.to_string().as_bytes());
    buf.freeze()
}

/// Encode a result envelope.
pub fn encode_result(seqno: u32, error: &CallError, args: &ArgList) -> Bytes {
    let mut buf = header(EnvelopeKind::Result, seqno);
    buf.put_slice(error.code().as_u32().to_string().as_bytes());
    buf.put_slice(b" / ");
    buf.put_slice(escape(error.note().as_bytes()).as_bytes());
    buf.put_u8(b'\n');
    buf.put_slice(args.to_text().as_bytes());
    buf.freeze()
}

/// Strictly parse the envelope header, expecting a particular kind.
///
/// On success returns the sequence number and the offset of the first
/// payload byte. A mismatched kind yields [`RelayError::WrongEnvelopeType`]
/// so a caller probing for one kind can retry with the other; everything
/// else is a framing or version error that desynchronizes the connection.
pub fn parse_header(buf: &[u8], expected: EnvelopeKind) -> Result<(u32, usize)> {
    let mut scan = Scanner::new(buf);

    // Preamble and version pair.
    scan.literal(ProtocolConfig::PREAMBLE.as_bytes())?;
    scan.literal(b" ")?;
    let major = scan.decimal("major version")?;
    scan.literal(b".")?;
    let minor = scan.decimal("minor version")?;
    scan.literal(b"\n")?;
    if major != ProtocolConfig::MAJOR || minor != ProtocolConfig::MINOR {
        return Err(RelayError::VersionMismatch {
            got_major: major,
            got_minor: minor,
        });
    }

    // Message type.
    scan.literal(ProtocolConfig::MSGTYPE_LABEL.as_bytes())?;
    scan.literal(b" ")?;
    let tag = scan.byte("message type")? as char;
    scan.literal(b"\n")?;
    if tag != expected.tag() {
        return Err(RelayError::WrongEnvelopeType {
            expected: expected.tag(),
            got: tag,
        });
    }

    // Sequence number.
    scan.literal(ProtocolConfig::SEQNO_LABEL.as_bytes())?;
    scan.literal(b" ")?;
    let seqno = scan.decimal("sequence number")?;
    scan.literal(b"\n")?;

    // Payload marker.
    scan.literal(ProtocolConfig::DATA_LABEL.as_bytes())?;
    scan.literal(b"\n")?;

    Ok((seqno, scan.pos))
}

/// Decode a call envelope into its sequence number and call identifier.
pub fn decode_call(buf: &[u8]) -> Result<(u32, CallId)> {
    let (seqno, payload_at) = parse_header(buf, EnvelopeKind::Call)?;
    let payload = std::str::from_utf8(&buf[payload_at..]).map_err(|e| {
        RelayError::malformed_identifier("<non-UTF-8>", e.to_string())
    })?;
    let call = CallId::parse(payload)?;
    Ok((seqno, call))
}

/// Decode a result envelope into its sequence number, outcome, and
/// result arguments.
pub fn decode_result(buf: &[u8]) -> Result<(u32, CallError, ArgList)> {
    let (seqno, payload_at) = parse_header(buf, EnvelopeKind::Result)?;
    let payload = &buf[payload_at..];

    let line_end = payload
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| RelayError::framing("result payload missing error line"))?;
    let line = std::str::from_utf8(&payload[..line_end])
        .map_err(|_| RelayError::framing("result error line is not UTF-8"))?;

    let (code, note) = line
        .split_once(" / ")
        .ok_or_else(|| RelayError::framing("result error line missing code/note separator"))?;
    let code: u32 = code
        .parse()
        .map_err(|_| RelayError::framing(format!("bad error code {code:?}")))?;
    let note = unescape_str(note)?;
    let error = CallError::from_wire(code, note);

    let args_text = std::str::from_utf8(&payload[line_end + 1..])
        .map_err(|_| RelayError::MalformedArguments {
            reason: "result arguments are not UTF-8".to_string(),
        })?;
    let args = ArgList::from_text(args_text)?;

    Ok((seqno, error, args))
}

/// Minimal strict scanner over the header bytes.
struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Scanner { buf, pos: 0 }
    }

    fn literal(&mut self, expected: &[u8]) -> Result<()> {
        let end = self.pos + expected.len();
        match self.buf.get(self.pos..end) {
            Some(got) if got == expected => {
                self.pos = end;
                Ok(())
            }
            _ => Err(RelayError::framing(format!(
                "expected {:?} at byte {}",
                String::from_utf8_lossy(expected),
                self.pos
            ))),
        }
    }

    fn byte(&mut self, what: &str) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| RelayError::framing(format!("truncated {what}")))?;
        self.pos += 1;
        Ok(b)
    }

    /// A non-empty run of decimal digits.
    fn decimal(&mut self, what: &str) -> Result<u32> {
        let start = self.pos;
        while self
            .buf
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(RelayError::framing(format!("missing {what}")));
        }
        std::str::from_utf8(&self.buf[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| RelayError::framing(format!("bad {what}")))
    }
}
