//! Typed value codec.
//!
//! An [`Atom`] is a single named-or-unnamed value with a fixed kind and two
//! serializations: a printable text form used inside the call identifier
//! grammar, and a compact tag-prefixed binary form. Both encodings
//! round-trip: decoding an atom's own encoding yields an equal atom,
//! including for unnamed atoms, empty text, empty binary, and empty lists.
//!
//! Text form: `name:type=value` with name and value escaped per
//! [`crate::escape`]; the `=value` part is omitted for the `none` kind.
//! List values are their elements' text forms, each escaped as a unit and
//! joined by commas.
//!
//! Binary form: one tag byte (kind in the low 7 bits, bit 7 set when a
//! name follows), an optional u32-BE length-prefixed name, then a
//! kind-specific payload. Integers travel big-endian; text, binary, and
//! list payloads are u32-BE length/count prefixed.

use crate::addr::{Ipv4Net, Ipv6Net, Mac};
use crate::error::{RelayError, Result};
use crate::escape::{escape, unescape, unescape_str};
use crate::wire::WireConfig;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The kind of value an atom carries. Immutable after construction: the
/// kind is determined by the [`AtomValue`] variant and there is no setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    NoValue,
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Fp64,
    Ipv4,
    Ipv4Net,
    Ipv6,
    Ipv6Net,
    Mac,
    Text,
    Binary,
    List,
}

impl AtomKind {
    /// Type name used in the text form.
    pub fn type_name(self) -> &'static str {
        match self {
            AtomKind::NoValue => "none",
            AtomKind::Bool => "bool",
            AtomKind::Int32 => "i32",
            AtomKind::Uint32 => "u32",
            AtomKind::Int64 => "i64",
            AtomKind::Uint64 => "u64",
            AtomKind::Fp64 => "fp64",
            AtomKind::Ipv4 => "ipv4",
            AtomKind::Ipv4Net => "ipv4net",
            AtomKind::Ipv6 => "ipv6",
            AtomKind::Ipv6Net => "ipv6net",
            AtomKind::Mac => "mac",
            AtomKind::Text => "txt",
            AtomKind::Binary => "binary",
            AtomKind::List => "list",
        }
    }

    /// Inverse of [`type_name`](Self::type_name).
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(AtomKind::NoValue),
            "bool" => Some(AtomKind::Bool),
            "i32" => Some(AtomKind::Int32),
            "u32" => Some(AtomKind::Uint32),
            "i64" => Some(AtomKind::Int64),
            "u64" => Some(AtomKind::Uint64),
            "fp64" => Some(AtomKind::Fp64),
            "ipv4" => Some(AtomKind::Ipv4),
            "ipv4net" => Some(AtomKind::Ipv4Net),
            "ipv6" => Some(AtomKind::Ipv6),
            "ipv6net" => Some(AtomKind::Ipv6Net),
            "mac" => Some(AtomKind::Mac),
            "txt" => Some(AtomKind::Text),
            "binary" => Some(AtomKind::Binary),
            "list" => Some(AtomKind::List),
            _ => None,
        }
    }

    /// Tag code used in the binary form (low 7 bits of the tag byte).
    pub fn wire_code(self) -> u8 {
        match self {
            AtomKind::NoValue => 0,
            AtomKind::Bool => 1,
            AtomKind::Int32 => 2,
            AtomKind::Uint32 => 3,
            AtomKind::Int64 => 4,
            AtomKind::Uint64 => 5,
            AtomKind::Fp64 => 6,
            AtomKind::Ipv4 => 7,
            AtomKind::Ipv4Net => 8,
            AtomKind::Ipv6 => 9,
            AtomKind::Ipv6Net => 10,
            AtomKind::Mac => 11,
            AtomKind::Text => 12,
            AtomKind::Binary => 13,
            AtomKind::List => 14,
        }
    }

    /// Inverse of [`wire_code`](Self::wire_code).
    pub fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AtomKind::NoValue),
            1 => Some(AtomKind::Bool),
            2 => Some(AtomKind::Int32),
            3 => Some(AtomKind::Uint32),
            4 => Some(AtomKind::Int64),
            5 => Some(AtomKind::Uint64),
            6 => Some(AtomKind::Fp64),
            7 => Some(AtomKind::Ipv4),
            8 => Some(AtomKind::Ipv4Net),
            9 => Some(AtomKind::Ipv6),
            10 => Some(AtomKind::Ipv6Net),
            11 => Some(AtomKind::Mac),
            12 => Some(AtomKind::Text),
            13 => Some(AtomKind::Binary),
            14 => Some(AtomKind::List),
            _ => None,
        }
    }
}

/// The value payload of an atom.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomValue {
    NoValue,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Fp64(f64),
    Ipv4(Ipv4Addr),
    Ipv4Net(Ipv4Net),
    Ipv6(Ipv6Addr),
    Ipv6Net(Ipv6Net),
    Mac(Mac),
    Text(String),
    Binary(Vec<u8>),
    List(Vec<Atom>),
}

impl AtomValue {
    pub fn kind(&self) -> AtomKind {
        match self {
            AtomValue::NoValue => AtomKind::NoValue,
            AtomValue::Bool(_) => AtomKind::Bool,
            AtomValue::Int32(_) => AtomKind::Int32,
            AtomValue::Uint32(_) => AtomKind::Uint32,
            AtomValue::Int64(_) => AtomKind::Int64,
            AtomValue::Uint64(_) => AtomKind::Uint64,
            AtomValue::Fp64(_) => AtomKind::Fp64,
            AtomValue::Ipv4(_) => AtomKind::Ipv4,
            AtomValue::Ipv4Net(_) => AtomKind::Ipv4Net,
            AtomValue::Ipv6(_) => AtomKind::Ipv6,
            AtomValue::Ipv6Net(_) => AtomKind::Ipv6Net,
            AtomValue::Mac(_) => AtomKind::Mac,
            AtomValue::Text(_) => AtomKind::Text,
            AtomValue::Binary(_) => AtomKind::Binary,
            AtomValue::List(_) => AtomKind::List,
        }
    }
}

/// A single typed, named-or-unnamed value.
///
/// Atoms are plain values: lists own their children and can never
/// back-reference a container, so cycles are impossible.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    name: String,
    value: AtomValue,
}

impl Atom {
    pub fn new(name: impl Into<String>, value: AtomValue) -> Self {
        Atom {
            name: name.into(),
            value,
        }
    }

    /// An atom used positionally, without a name.
    pub fn unnamed(value: AtomValue) -> Self {
        Atom {
            name: String::new(),
            value,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Atom::new(name, AtomValue::Text(value.into()))
    }

    pub fn uint32(name: impl Into<String>, value: u32) -> Self {
        Atom::new(name, AtomValue::Uint32(value))
    }

    pub fn list(name: impl Into<String>, items: Vec<Atom>) -> Self {
        Atom::new(name, AtomValue::List(items))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn value(&self) -> &AtomValue {
        &self.value
    }

    pub fn kind(&self) -> AtomKind {
        self.value.kind()
    }

    // ------------------------------------------------------------------
    // Text form
    // ------------------------------------------------------------------

    /// Render the printable `name:type=value` form.
    pub fn to_text(&self) -> String {
        let mut out = escape(self.name.as_bytes());
        out.push(WireConfig::TYPE_SEP);
        out.push_str(self.kind().type_name());
        if self.kind() != AtomKind::NoValue {
            out.push(WireConfig::VALUE_SEP);
            out.push_str(&escape(&self.value_bytes()));
        }
        out
    }

    /// Raw (pre-escaping) bytes of the value's text rendering.
    fn value_bytes(&self) -> Vec<u8> {
        match &self.value {
            AtomValue::NoValue => Vec::new(),
            AtomValue::Bool(b) => if *b { b"true".to_vec() } else { b"false".to_vec() },
            AtomValue::Int32(v) => v.to_string().into_bytes(),
            AtomValue::Uint32(v) => v.to_string().into_bytes(),
            AtomValue::Int64(v) => v.to_string().into_bytes(),
            AtomValue::Uint64(v) => v.to_string().into_bytes(),
            AtomValue::Fp64(v) => v.to_string().into_bytes(),
            AtomValue::Ipv4(a) => a.to_string().into_bytes(),
            AtomValue::Ipv4Net(n) => n.to_string().into_bytes(),
            AtomValue::Ipv6(a) => a.to_string().into_bytes(),
            AtomValue::Ipv6Net(n) => n.to_string().into_bytes(),
            AtomValue::Mac(m) => m.to_string().into_bytes(),
            AtomValue::Text(t) => t.clone().into_bytes(),
            AtomValue::Binary(b) => b.clone(),
            AtomValue::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|a| escape(a.to_text().as_bytes()))
                    .collect();
                parts.join(&(WireConfig::LIST_SEP.to_string())).into_bytes()
            }
        }
    }

    /// Parse the printable form back into an atom.
    pub fn from_text(s: &str) -> Result<Atom> {
        let (name_part, rest) = s.split_once(WireConfig::TYPE_SEP).ok_or_else(|| {
            RelayError::MalformedArguments {
                reason: format!("atom {s:?} has no type separator"),
            }
        })?;
        let name = unescape_str(name_part)?;

        let (type_name, value_part) = match rest.split_once(WireConfig::VALUE_SEP) {
            Some((t, v)) => (t, Some(v)),
            None => (rest, None),
        };
        let kind = AtomKind::from_type_name(type_name).ok_or_else(|| {
            RelayError::MalformedArguments {
                reason: format!("unknown atom type {type_name:?}"),
            }
        })?;

        let raw = match value_part {
            Some(v) => unescape(v)?,
            None => Vec::new(),
        };
        let value = Self::value_from_bytes(kind, &raw)?;
        Ok(Atom { name, value })
    }

    fn value_from_bytes(kind: AtomKind, raw: &[u8]) -> Result<AtomValue> {
        let malformed = |reason: String| RelayError::MalformedArguments { reason };
        let as_str = |raw: &[u8]| -> Result<String> {
            String::from_utf8(raw.to_vec())
                .map_err(|_| malformed(format!("{} value is not UTF-8", kind.type_name())))
        };

        match kind {
            AtomKind::NoValue => {
                if raw.is_empty() {
                    Ok(AtomValue::NoValue)
                } else {
                    Err(malformed("value supplied for none atom".to_string()))
                }
            }
            AtomKind::Bool => match raw {
                b"true" => Ok(AtomValue::Bool(true)),
                b"false" => Ok(AtomValue::Bool(false)),
                _ => Err(malformed(format!("bad bool value {:?}", String::from_utf8_lossy(raw)))),
            },
            AtomKind::Int32 => parse_num(&as_str(raw)?, kind).map(AtomValue::Int32),
            AtomKind::Uint32 => parse_num(&as_str(raw)?, kind).map(AtomValue::Uint32),
            AtomKind::Int64 => parse_num(&as_str(raw)?, kind).map(AtomValue::Int64),
            AtomKind::Uint64 => parse_num(&as_str(raw)?, kind).map(AtomValue::Uint64),
            AtomKind::Fp64 => parse_num(&as_str(raw)?, kind).map(AtomValue::Fp64),
            AtomKind::Ipv4 => parse_num(&as_str(raw)?, kind).map(AtomValue::Ipv4),
            AtomKind::Ipv6 => parse_num(&as_str(raw)?, kind).map(AtomValue::Ipv6),
            AtomKind::Ipv4Net => as_str(raw)?.parse().map(AtomValue::Ipv4Net),
            AtomKind::Ipv6Net => as_str(raw)?.parse().map(AtomValue::Ipv6Net),
            AtomKind::Mac => as_str(raw)?.parse().map(AtomValue::Mac),
            AtomKind::Text => Ok(AtomValue::Text(as_str(raw)?)),
            AtomKind::Binary => Ok(AtomValue::Binary(raw.to_vec())),
            AtomKind::List => {
                if raw.is_empty() {
                    return Ok(AtomValue::List(Vec::new()));
                }
                let joined = as_str(raw)?;
                let mut items = Vec::new();
                for element in joined.split(WireConfig::LIST_SEP) {
                    let child_text = unescape_str(element)?;
                    items.push(Atom::from_text(&child_text)?);
                }
                Ok(AtomValue::List(items))
            }
        }
    }

    // ------------------------------------------------------------------
    // Binary form
    // ------------------------------------------------------------------

    /// Exact number of bytes [`pack`](Self::pack) will write.
    pub fn packed_bytes(&self) -> usize {
        let mut n = 1;
        if self.is_named() {
            n += 4 + self.name.len();
        }
        n + self.payload_packed_bytes()
    }

    fn payload_packed_bytes(&self) -> usize {
        match &self.value {
            AtomValue::NoValue => 0,
            AtomValue::Bool(_) => 1,
            AtomValue::Int32(_) | AtomValue::Uint32(_) | AtomValue::Ipv4(_) => 4,
            AtomValue::Int64(_) | AtomValue::Uint64(_) | AtomValue::Fp64(_) => 8,
            AtomValue::Ipv4Net(_) => 5,
            AtomValue::Ipv6(_) => 16,
            AtomValue::Ipv6Net(_) => 17,
            AtomValue::Mac(_) => 6,
            AtomValue::Text(t) => 4 + t.len(),
            AtomValue::Binary(b) => 4 + b.len(),
            AtomValue::List(items) => {
                4 + items.iter().map(Atom::packed_bytes).sum::<usize>()
            }
        }
    }

    /// Write the binary encoding into `buf`.
    ///
    /// Returns the number of bytes written, or 0 (writing nothing) when
    /// `buf` is shorter than [`packed_bytes`](Self::packed_bytes). Extra
    /// trailing capacity never influences the encoding.
    pub fn pack(&self, buf: &mut [u8]) -> usize {
        let need = self.packed_bytes();
        if buf.len() < need {
            return 0;
        }

        let mut tag = self.kind().wire_code();
        if self.is_named() {
            tag |= 0x80;
        }
        buf[0] = tag;
        let mut pos = 1;

        if self.is_named() {
            pos += put_u32(&mut buf[pos..], self.name.len() as u32);
            buf[pos..pos + self.name.len()].copy_from_slice(self.name.as_bytes());
            pos += self.name.len();
        }

        match &self.value {
            AtomValue::NoValue => {}
            AtomValue::Bool(b) => {
                buf[pos] = *b as u8;
                pos += 1;
            }
            AtomValue::Int32(v) => pos += put_bytes(&mut buf[pos..], &v.to_be_bytes()),
            AtomValue::Uint32(v) => pos += put_bytes(&mut buf[pos..], &v.to_be_bytes()),
            AtomValue::Int64(v) => pos += put_bytes(&mut buf[pos..], &v.to_be_bytes()),
            AtomValue::Uint64(v) => pos += put_bytes(&mut buf[pos..], &v.to_be_bytes()),
            AtomValue::Fp64(v) => pos += put_bytes(&mut buf[pos..], &v.to_bits().to_be_bytes()),
            AtomValue::Ipv4(a) => pos += put_bytes(&mut buf[pos..], &a.octets()),
            AtomValue::Ipv4Net(n) => {
                pos += put_bytes(&mut buf[pos..], &n.addr().octets());
                buf[pos] = n.prefix_len();
                pos += 1;
            }
            AtomValue::Ipv6(a) => pos += put_bytes(&mut buf[pos..], &a.octets()),
            AtomValue::Ipv6Net(n) => {
                pos += put_bytes(&mut buf[pos..], &n.addr().octets());
                buf[pos] = n.prefix_len();
                pos += 1;
            }
            AtomValue::Mac(m) => pos += put_bytes(&mut buf[pos..], &m.octets()),
            AtomValue::Text(t) => {
                pos += put_u32(&mut buf[pos..], t.len() as u32);
                pos += put_bytes(&mut buf[pos..], t.as_bytes());
            }
            AtomValue::Binary(b) => {
                pos += put_u32(&mut buf[pos..], b.len() as u32);
                pos += put_bytes(&mut buf[pos..], b);
            }
            AtomValue::List(items) => {
                pos += put_u32(&mut buf[pos..], items.len() as u32);
                for item in items {
                    let written = item.pack(&mut buf[pos..]);
                    debug_assert!(written > 0);
                    pos += written;
                }
            }
        }

        debug_assert_eq!(pos, need);
        need
    }

    /// Reconstruct an atom from a tag-prefixed encoding.
    ///
    /// Returns the atom and the bytes consumed, or `None` on a malformed
    /// or truncated encoding.
    pub fn unpack(buf: &[u8]) -> Option<(Atom, usize)> {
        let tag = *buf.first()?;
        let kind = AtomKind::from_wire_code(tag & 0x7f)?;
        let mut pos = 1;

        let name = if tag & 0x80 != 0 {
            let len = read_u32(buf, &mut pos)? as usize;
            let bytes = buf.get(pos..pos + len)?;
            pos += len;
            String::from_utf8(bytes.to_vec()).ok()?
        } else {
            String::new()
        };

        let value = match kind {
            AtomKind::NoValue => AtomValue::NoValue,
            AtomKind::Bool => {
                let b = *buf.get(pos)?;
                pos += 1;
                AtomValue::Bool(b != 0)
            }
            AtomKind::Int32 => AtomValue::Int32(i32::from_be_bytes(read_array(buf, &mut pos)?)),
            AtomKind::Uint32 => AtomValue::Uint32(u32::from_be_bytes(read_array(buf, &mut pos)?)),
            AtomKind::Int64 => AtomValue::Int64(i64::from_be_bytes(read_array(buf, &mut pos)?)),
            AtomKind::Uint64 => AtomValue::Uint64(u64::from_be_bytes(read_array(buf, &mut pos)?)),
            AtomKind::Fp64 => {
                AtomValue::Fp64(f64::from_bits(u64::from_be_bytes(read_array(buf, &mut pos)?)))
            }
            AtomKind::Ipv4 => AtomValue::Ipv4(Ipv4Addr::from(read_array::<4>(buf, &mut pos)?)),
            AtomKind::Ipv4Net => {
                let octets = read_array::<4>(buf, &mut pos)?;
                let len = *buf.get(pos)?;
                pos += 1;
                AtomValue::Ipv4Net(Ipv4Net::new(Ipv4Addr::from(octets), len).ok()?)
            }
            AtomKind::Ipv6 => AtomValue::Ipv6(Ipv6Addr::from(read_array::<16>(buf, &mut pos)?)),
            AtomKind::Ipv6Net => {
                let octets = read_array::<16>(buf, &mut pos)?;
                let len = *buf.get(pos)?;
                pos += 1;
                AtomValue::Ipv6Net(Ipv6Net::new(Ipv6Addr::from(octets), len).ok()?)
            }
            AtomKind::Mac => AtomValue::Mac(Mac::new(read_array::<6>(buf, &mut pos)?)),
            AtomKind::Text => {
                let len = read_u32(buf, &mut pos)? as usize;
                let bytes = buf.get(pos..pos + len)?;
                pos += len;
                AtomValue::Text(String::from_utf8(bytes.to_vec()).ok()?)
            }
            AtomKind::Binary => {
                let len = read_u32(buf, &mut pos)? as usize;
                let bytes = buf.get(pos..pos + len)?;
                pos += len;
                AtomValue::Binary(bytes.to_vec())
            }
            AtomKind::List => {
                let count = read_u32(buf, &mut pos)? as usize;
                // Each child needs at least its tag byte.
                if count > buf.len() - pos {
                    return None;
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let (child, used) = Atom::unpack(&buf[pos..])?;
                    pos += used;
                    items.push(child);
                }
                AtomValue::List(items)
            }
        };

        Some((Atom { name, value }, pos))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, kind: AtomKind) -> Result<T> {
    s.parse().map_err(|_| RelayError::MalformedArguments {
        reason: format!("bad {} value {s:?}", kind.type_name()),
    })
}

fn put_u32(buf: &mut [u8], v: u32) -> usize {
    put_bytes(buf, &v.to_be_bytes())
}

fn put_bytes(buf: &mut [u8], src: &[u8]) -> usize {
    buf[..src.len()].copy_from_slice(src);
    src.len()
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(*pos..*pos + 4)?.try_into().ok()?;
    *pos += 4;
    Some(u32::from_be_bytes(bytes))
}

fn read_array<const N: usize>(buf: &[u8], pos: &mut usize) -> Option<[u8; N]> {
    let bytes: [u8; N] = buf.get(*pos..*pos + N)?.try_into().ok()?;
    *pos += N;
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_atoms() -> Vec<Atom> {
        vec![
            Atom::new("flag", AtomValue::Bool(true)),
            Atom::new("depth", AtomValue::Int32(-42)),
            Atom::uint32("metric", 7),
            Atom::new("big", AtomValue::Int64(-(1 << 40))),
            Atom::new("huge", AtomValue::Uint64(1 << 60)),
            Atom::new("weight", AtomValue::Fp64(2.5)),
            Atom::new("peer", AtomValue::Ipv4(Ipv4Addr::new(10, 0, 0, 1))),
            Atom::new(
                "net",
                AtomValue::Ipv4Net("10.1.0.0/16".parse().unwrap()),
            ),
            Atom::new("peer6", AtomValue::Ipv6("2001:db8::1".parse().unwrap())),
            Atom::new(
                "net6",
                AtomValue::Ipv6Net("2001:db8::/32".parse().unwrap()),
            ),
            Atom::new(
                "hw",
                AtomValue::Mac("00:11:22:33:44:55".parse().unwrap()),
            ),
            Atom::text("ifname", "eth0"),
            Atom::text("note", "spaces & specials: 100%"),
            Atom::text("empty", ""),
            Atom::unnamed(AtomValue::Text("positional".to_string())),
            Atom::new("blob", AtomValue::Binary(vec![0, 1, 2, 254, 255])),
            Atom::new("empty_blob", AtomValue::Binary(Vec::new())),
            Atom::new("nothing", AtomValue::NoValue),
            Atom::unnamed(AtomValue::NoValue),
            Atom::list("empty_list", Vec::new()),
            Atom::list(
                "nested",
                vec![
                    Atom::uint32("a", 1),
                    Atom::list("inner", vec![Atom::text("b", "x,y")]),
                ],
            ),
        ]
    }

    #[test]
    fn test_text_roundtrip_all_kinds() {
        for atom in sample_atoms() {
            let text = atom.to_text();
            let back = Atom::from_text(&text)
                .unwrap_or_else(|e| panic!("parse of {text:?} failed: {e}"));
            assert_eq!(back, atom, "text roundtrip of {text:?}");
        }
    }

    #[test]
    fn test_binary_roundtrip_all_kinds() {
        for atom in sample_atoms() {
            let mut buf = vec![0u8; atom.packed_bytes()];
            let written = atom.pack(&mut buf);
            assert_eq!(written, atom.packed_bytes());

            let (back, used) = Atom::unpack(&buf)
                .unwrap_or_else(|| panic!("unpack of {} failed", atom.to_text()));
            assert_eq!(used, written);
            assert_eq!(back, atom);
        }
    }

    #[test]
    fn test_pack_short_buffer_writes_nothing() {
        let atom = Atom::text("ifname", "eth0");
        let need = atom.packed_bytes();
        let mut buf = vec![0xaa; need - 1];
        assert_eq!(atom.pack(&mut buf), 0);
        assert!(buf.iter().all(|&b| b == 0xaa), "short pack must not write");
    }

    #[test]
    fn test_pack_oversized_buffer_matches_exact() {
        let atom = Atom::uint32("metric", 99);
        let need = atom.packed_bytes();

        let mut exact = vec![0u8; need];
        assert_eq!(atom.pack(&mut exact), need);

        let mut oversized = vec![0u8; need + 1];
        assert_eq!(atom.pack(&mut oversized), need);
        assert_eq!(&oversized[..need], &exact[..]);
    }

    #[test]
    fn test_unpack_truncated_returns_none() {
        let atom = Atom::text("ifname", "eth0");
        let mut buf = vec![0u8; atom.packed_bytes()];
        atom.pack(&mut buf);

        for cut in 0..buf.len() {
            assert!(
                Atom::unpack(&buf[..cut]).is_none(),
                "truncation at {cut} must fail"
            );
        }
    }

    #[test]
    fn test_unpack_unknown_tag_returns_none() {
        assert!(Atom::unpack(&[0x7f, 0, 0]).is_none());
    }

    #[test]
    fn test_list_count_exceeding_buffer_returns_none() {
        // Claims 1000 children but supplies none.
        let mut buf = vec![AtomKind::List.wire_code()];
        buf.extend_from_slice(&1000u32.to_be_bytes());
        assert!(Atom::unpack(&buf).is_none());
    }

    #[test]
    fn test_text_form_escapes_value() {
        let atom = Atom::text("note", "a b/c");
        assert_eq!(atom.to_text(), "note:txt=a+b%2Fc");
    }

    #[test]
    fn test_unnamed_atom_text_form() {
        let atom = Atom::unnamed(AtomValue::Uint32(5));
        assert_eq!(atom.to_text(), ":u32=5");
        assert_eq!(Atom::from_text(":u32=5").unwrap(), atom);
    }

    #[test]
    fn test_kind_is_fixed_by_value() {
        let atom = Atom::text("x", "1");
        assert_eq!(atom.kind(), AtomKind::Text);
        // Parsing the same payload under a different declared type yields
        // that type, not a mutated atom.
        let other = Atom::from_text("x:u32=1").unwrap();
        assert_eq!(other.kind(), AtomKind::Uint32);
        assert_ne!(atom, other);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(Atom::from_text("x:u32=notanumber").is_err());
        assert!(Atom::from_text("x:bool=yes").is_err());
        assert!(Atom::from_text("x:mystery=1").is_err());
        assert!(Atom::from_text("plaintext").is_err());
        assert!(Atom::from_text("x:none=1").is_err());
    }
}
