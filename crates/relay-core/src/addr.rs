//! Address value types carried by atoms: MAC addresses and IPv4/IPv6
//! network prefixes. `std::net` covers the host addresses; these fill the
//! gaps with the usual `Display`/`FromStr` pair.

use crate::error::{RelayError, Result};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mac([u8; 6]);

impl Mac {
    pub const fn new(octets: [u8; 6]) -> Self {
        Mac(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for Mac {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| RelayError::decode(0, format!("short MAC address: {s:?}")))?;
            if part.len() != 2 {
                return Err(RelayError::decode(0, format!("bad MAC octet in {s:?}")));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| RelayError::decode(0, format!("bad MAC octet in {s:?}")))?;
        }
        if parts.next().is_some() {
            return Err(RelayError::decode(0, format!("long MAC address: {s:?}")));
        }
        Ok(Mac(octets))
    }
}

/// An IPv4 network prefix, `addr/len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Net {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Net {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(RelayError::decode(
                0,
                format!("IPv4 prefix length {prefix_len} out of range"),
            ));
        }
        Ok(Ipv4Net { addr, prefix_len })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }
}

impl fmt::Display for Ipv4Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Ipv4Net {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = split_prefix(s)?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| RelayError::decode(0, format!("bad IPv4 address in {s:?}")))?;
        Ipv4Net::new(addr, len)
    }
}

/// An IPv6 network prefix, `addr/len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Net {
    addr: Ipv6Addr,
    prefix_len: u8,
}

impl Ipv6Net {
    pub fn new(addr: Ipv6Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 128 {
            return Err(RelayError::decode(
                0,
                format!("IPv6 prefix length {prefix_len} out of range"),
            ));
        }
        Ok(Ipv6Net { addr, prefix_len })
    }

    pub fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }
}

impl fmt::Display for Ipv6Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Ipv6Net {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = split_prefix(s)?;
        let addr: Ipv6Addr = addr
            .parse()
            .map_err(|_| RelayError::decode(0, format!("bad IPv6 address in {s:?}")))?;
        Ipv6Net::new(addr, len)
    }
}

fn split_prefix(s: &str) -> Result<(&str, u8)> {
    let (addr, len) = s
        .split_once('/')
        .ok_or_else(|| RelayError::decode(0, format!("missing prefix length in {s:?}")))?;
    let len: u8 = len
        .parse()
        .map_err(|_| RelayError::decode(0, format!("bad prefix length in {s:?}")))?;
    Ok((addr, len))
}
