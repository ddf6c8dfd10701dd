//! Ordered, named atom sequences forming call parameters or results.

use crate::atom::Atom;
use crate::error::Result;
use crate::wire::WireConfig;

/// An ordered sequence of atoms. Insertion order is significant: atoms are
/// addressable positionally and by name, and equality is structural.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgList {
    atoms: Vec<Atom>,
}

impl ArgList {
    pub fn new() -> Self {
        ArgList::default()
    }

    /// Append an atom, keeping insertion order.
    pub fn add(&mut self, atom: Atom) -> &mut Self {
        self.atoms.push(atom);
        self
    }

    /// Builder-style append.
    pub fn with(mut self, atom: Atom) -> Self {
        self.atoms.push(atom);
        self
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Positional access.
    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// First atom with the given name.
    pub fn get_named(&self, name: &str) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    // ------------------------------------------------------------------
    // Text form
    // ------------------------------------------------------------------

    /// Atoms joined by the atom separator; empty list renders as "".
    pub fn to_text(&self) -> String {
        let parts: Vec<String> = self.atoms.iter().map(Atom::to_text).collect();
        parts.join(&WireConfig::ATOM_SEP.to_string())
    }

    /// Parse the textual form. An empty string is the empty list.
    pub fn from_text(s: &str) -> Result<ArgList> {
        let mut list = ArgList::new();
        if s.is_empty() {
            return Ok(list);
        }
        for part in s.split(WireConfig::ATOM_SEP) {
            list.add(Atom::from_text(part)?);
        }
        Ok(list)
    }

    // ------------------------------------------------------------------
    // Binary form: u32-BE count, then each atom's packed encoding.
    // ------------------------------------------------------------------

    pub fn packed_bytes(&self) -> usize {
        4 + self.atoms.iter().map(Atom::packed_bytes).sum::<usize>()
    }

    /// Write the binary encoding; 0 and no write if `buf` is too small.
    pub fn pack(&self, buf: &mut [u8]) -> usize {
        let need = self.packed_bytes();
        if buf.len() < need {
            return 0;
        }
        buf[..4].copy_from_slice(&(self.atoms.len() as u32).to_be_bytes());
        let mut pos = 4;
        for atom in &self.atoms {
            let written = atom.pack(&mut buf[pos..]);
            debug_assert!(written > 0);
            pos += written;
        }
        debug_assert_eq!(pos, need);
        need
    }

    /// Reconstruct from a count-prefixed encoding, returning the list and
    /// bytes consumed. Fails if any child fails to unpack or fewer bytes
    /// remain than the count promises.
    pub fn unpack(buf: &[u8]) -> Option<(ArgList, usize)> {
        let count_bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
        let count = u32::from_be_bytes(count_bytes) as usize;
        let mut pos = 4;
        if count > buf.len() - pos {
            return None;
        }
        let mut list = ArgList::new();
        for _ in 0..count {
            let (atom, used) = Atom::unpack(&buf[pos..])?;
            pos += used;
            list.add(atom);
        }
        Some((list, pos))
    }

    /// Read only the first atom of a count-prefixed encoding.
    ///
    /// Used to pull the embedded call-identifier atom out of a packed
    /// argument stream without materializing the whole list. Returns the
    /// atom and the offset just past it (count field included).
    pub fn peek_first(buf: &[u8]) -> Option<(Atom, usize)> {
        let count_bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
        let count = u32::from_be_bytes(count_bytes);
        if count == 0 {
            return None;
        }
        let (atom, used) = Atom::unpack(&buf[4..])?;
        Some((atom, 4 + used))
    }
}

impl FromIterator<Atom> for ArgList {
    fn from_iter<I: IntoIterator<Item = Atom>>(iter: I) -> Self {
        ArgList {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ArgList {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomValue;

    fn sample() -> ArgList {
        ArgList::new()
            .with(Atom::text("ifname", "eth0"))
            .with(Atom::uint32("mtu", 1500))
            .with(Atom::unnamed(AtomValue::Bool(true)))
    }

    #[test]
    fn test_order_and_lookup() {
        let args = sample();
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0).unwrap().name(), "ifname");
        assert_eq!(args.get_named("mtu").unwrap().name(), "mtu");
        assert!(args.get_named("absent").is_none());
    }

    #[test]
    fn test_text_roundtrip() {
        let args = sample();
        let text = args.to_text();
        assert_eq!(text, "ifname:txt=eth0&mtu:u32=1500&:bool=true");
        assert_eq!(ArgList::from_text(&text).unwrap(), args);
    }

    #[test]
    fn test_empty_list_text_roundtrip() {
        let args = ArgList::new();
        assert_eq!(args.to_text(), "");
        assert_eq!(ArgList::from_text("").unwrap(), args);
    }

    #[test]
    fn test_binary_roundtrip() {
        let args = sample();
        let mut buf = vec![0u8; args.packed_bytes()];
        assert_eq!(args.pack(&mut buf), buf.len());

        let (back, used) = ArgList::unpack(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(back, args);
    }

    #[test]
    fn test_pack_short_buffer_writes_nothing() {
        let args = sample();
        let mut buf = vec![0u8; args.packed_bytes() - 1];
        assert_eq!(args.pack(&mut buf), 0);
    }

    #[test]
    fn test_unpack_truncated_child_fails() {
        let args = sample();
        let mut buf = vec![0u8; args.packed_bytes()];
        args.pack(&mut buf);
        assert!(ArgList::unpack(&buf[..buf.len() - 1]).is_none());
    }

    #[test]
    fn test_unpack_count_overrunning_buffer_fails() {
        let mut buf = 5u32.to_be_bytes().to_vec();
        buf.push(0); // one none atom, four promised
        assert!(ArgList::unpack(&buf).is_none());
    }

    #[test]
    fn test_peek_first_reads_only_first_atom() {
        let args = sample();
        let mut buf = vec![0u8; args.packed_bytes()];
        args.pack(&mut buf);

        let (first, used) = ArgList::peek_first(&buf).unwrap();
        assert_eq!(first, Atom::text("ifname", "eth0"));
        assert!(used < buf.len());
        // Works even when the rest of the stream is truncated.
        let (first_again, _) = ArgList::peek_first(&buf[..used]).unwrap();
        assert_eq!(first_again, first);
    }

    #[test]
    fn test_peek_first_empty_list_is_none() {
        let empty = ArgList::new();
        let mut buf = vec![0u8; empty.packed_bytes()];
        empty.pack(&mut buf);
        assert!(ArgList::peek_first(&buf).is_none());
    }
}
