//! URL-style escaping for values embedded in the line-oriented wire grammar.
//!
//! Space becomes `+`; structurally significant bytes, control bytes, and
//! non-ASCII bytes become `%HH` with uppercase hex; everything else passes
//! through. Decoding reverses the transform exactly and reports a malformed
//! or truncated escape at the byte offset where it occurred.

use crate::error::{RelayError, Result};
use crate::wire::WireConfig;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Whether a byte may appear unescaped in the wire grammar.
fn is_passthrough(b: u8) -> bool {
    if b < 0x20 || b == 0x7f || b >= 0x80 {
        return false;
    }
    if b == b' ' {
        return false;
    }
    !WireConfig::STRUCTURAL.contains(&b)
}

/// Escape raw bytes into a printable ASCII string.
pub fn escape(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input {
        if b == b' ' {
            out.push(WireConfig::SPACE_SUBSTITUTE as char);
        } else if is_passthrough(b) {
            out.push(b as char);
        } else {
            out.push(WireConfig::ESCAPE_MARKER as char);
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
        }
    }
    out
}

/// Reverse [`escape`], returning the original raw bytes.
///
/// A `%` not followed by two valid hex digits (including one truncated at
/// the end of input) is a decode failure at the marker's offset.
pub fn unescape(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == WireConfig::ESCAPE_MARKER {
            let hi = bytes.get(i + 1).copied().and_then(hex_val);
            let lo = bytes.get(i + 2).copied().and_then(hex_val);
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    return Err(RelayError::decode(
                        i,
                        "escape marker not followed by two hex digits",
                    ));
                }
            }
        } else if b == WireConfig::SPACE_SUBSTITUTE {
            out.push(b' ');
            i += 1;
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok(out)
}

/// Unescape into a UTF-8 string.
pub fn unescape_str(input: &str) -> Result<String> {
    let bytes = unescape(input)?;
    String::from_utf8(bytes).map_err(|e| RelayError::decode(e.utf8_error().valid_up_to(), "escaped data is not valid UTF-8"))
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
