//! relay-rpc - Message framing, command dispatch, and call correlation
//! for the relay control-plane suite.
//!
//! Builds on `relay-core`'s value layer: this crate frames a [`CallId`]
//! into a line-delimited envelope, correlates replies to outstanding calls
//! by sequence number, and dispatches inbound calls through a name-keyed
//! [`CommandMap`]. The concrete socket transport and the event loop that
//! drives I/O are external; they are reached through the [`Transport`]
//! trait and feed inbound frames to [`RpcSender::deliver`] and
//! [`RpcReceiver::dispatch`].
//!
//! # Example
//!
//! ```
//! use relay_core::{ArgList, CallError, CallId};
//! use relay_rpc::RpcReceiver;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> relay_core::Result<()> {
//! let mut receiver = RpcReceiver::new();
//! receiver.register_sync("get_mtu", |_args| {
//!     (CallError::okay(), ArgList::new())
//! })?;
//!
//! let call = CallId::finder("fea", "get_mtu", ArgList::new());
//! let request = relay_rpc::envelope::encode_call(1001, &call);
//! let response = receiver.dispatch(&request).await?;
//! let (seqno, outcome, _results) = relay_rpc::envelope::decode_result(&response)?;
//! assert_eq!(seqno, 1001);
//! assert!(outcome.is_okay());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod envelope;
pub mod receiver;
pub mod sender;
pub mod seqno;

// Re-export commonly used types
pub use command::{CommandHandler, CommandMap, SyncCommand};
pub use envelope::{EnvelopeKind, ProtocolConfig};
pub use receiver::RpcReceiver;
pub use sender::{RpcSender, Transport};
pub use seqno::SeqnoCounter;

// Doc-example convenience; the types come from relay-core.
pub use relay_core::{CallError, CallId};
