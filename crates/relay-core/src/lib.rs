//! relay-core - Typed argument codec and call identifiers for the relay
//! control-plane suite.
//!
//! This crate is the value layer of the RPC substrate: typed atoms with
//! text and binary serializations, ordered argument lists, the
//! self-describing call identifier grammar, and the fixed registry of call
//! outcomes. Framing, dispatch, and request/response correlation live in
//! the `relay-rpc` crate.
//!
//! # Example
//!
//! ```
//! use relay_core::{ArgList, Atom, CallId};
//!
//! let call = CallId::finder(
//!     "rib",
//!     "add_route",
//!     ArgList::new().with(Atom::uint32("metric", 5)),
//! );
//! assert_eq!(call.to_string(), "finder://rib/add_route?metric:u32=5");
//!
//! let reparsed = CallId::parse(&call.to_string()).unwrap();
//! assert_eq!(reparsed, call);
//! ```

pub mod addr;
pub mod args;
pub mod atom;
pub mod call;
pub mod call_error;
pub mod error;
pub mod escape;
pub mod wire;

// Re-export commonly used types
pub use addr::{Ipv4Net, Ipv6Net, Mac};
pub use args::ArgList;
pub use atom::{Atom, AtomKind, AtomValue};
pub use call::CallId;
pub use call_error::{CallError, CallErrorCode};
pub use error::{RelayError, Result};
pub use wire::WireConfig;
