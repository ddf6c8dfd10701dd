//! Fixed wire-format constants.
//!
//! Every literal a peer must reproduce byte-for-byte lives here: the call
//! identifier's separator tokens, the escape alphabet, and the well-known
//! directory-service protocol name. Interop with a peer that uses different
//! literals means editing this module and nothing else.

/// Token set for the textual call identifier grammar.
pub struct WireConfig;

impl WireConfig {
    /// Separates the protocol from the target: `proto://target/...`.
    pub const PROTOCOL_SEP: &'static str = "://";
    /// First occurrence after the protocol splits target from command.
    pub const COMMAND_SEP: char = '/';
    /// Introduces the argument list.
    pub const ARGS_SEP: char = '?';
    /// Joins atoms inside an argument list.
    pub const ATOM_SEP: char = '&';
    /// Separates an atom's name from its type.
    pub const TYPE_SEP: char = ':';
    /// Separates an atom's type from its value.
    pub const VALUE_SEP: char = '=';
    /// Joins elements inside a list atom's value.
    pub const LIST_SEP: char = ',';

    /// Escape marker, followed by two uppercase hex digits.
    pub const ESCAPE_MARKER: u8 = b'%';
    /// Single-character substitute for a space.
    pub const SPACE_SUBSTITUTE: u8 = b'+';
    /// Structurally significant bytes that must always be escaped.
    pub const STRUCTURAL: &'static [u8] = b":/?&=%+,";

    /// Well-known placeholder protocol of the directory service.
    pub const FINDER_PROTOCOL: &'static str = "finder";
}
