//! Inbound call dispatch for one transport connection.
//!
//! The receiver parses a call envelope, resolves the command in its
//! [`CommandMap`], runs the handler, and produces the result envelope
//! carrying the same sequence number. Per-call failures (a malformed
//! identifier or argument list, an unknown command) are answered on the
//! wire with the matching [`CallError`]; only framing-level failures,
//! after which the byte stream cannot be trusted, surface as errors.

use crate::command::{CommandHandler, CommandMap};
use crate::envelope::{self, EnvelopeKind};
use bytes::Bytes;
use relay_core::{ArgList, CallError, CallId, RelayError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Receiver bound to one transport connection.
#[derive(Default)]
pub struct RpcReceiver {
    commands: CommandMap,
}

impl RpcReceiver {
    pub fn new() -> Self {
        RpcReceiver::default()
    }

    /// Register a handler; duplicate names are rejected.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<()> {
        self.commands.add(name, handler)
    }

    /// Register a synchronous function as a handler.
    pub fn register_sync<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(&ArgList) -> (CallError, ArgList) + Send + Sync + 'static,
    {
        self.commands.add_sync(name, func)
    }

    pub fn commands(&self) -> &CommandMap {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandMap {
        &mut self.commands
    }

    /// Process one inbound call envelope and produce the response frame.
    ///
    /// Errors are returned only when the envelope itself cannot be framed
    /// (bad labels, version mismatch, wrong kind); the connection should
    /// then be reset. Every other failure is answered in-band.
    pub async fn dispatch(&self, frame: &[u8]) -> Result<Bytes> {
        let (seqno, payload_at) = envelope::parse_header(frame, EnvelopeKind::Call)?;

        let call = match parse_call_payload(&frame[payload_at..]) {
            Ok(call) => call,
            Err(e) => {
                debug!(seqno, error = %e, "rejecting unparseable call");
                return Ok(envelope::encode_result(
                    seqno,
                    &e.to_call_error(),
                    &ArgList::new(),
                ));
            }
        };

        match self.commands.get(call.command()) {
            Some(handler) => {
                let (error, args) = handler.execute(call.args()).await;
                debug!(seqno, command = call.command(), outcome = %error, "dispatched call");
                Ok(envelope::encode_result(seqno, &error, &args))
            }
            None => {
                warn!(seqno, command = call.command(), "call for unknown command");
                Ok(envelope::encode_result(
                    seqno,
                    &CallError::no_such_command(call.command()),
                    &ArgList::new(),
                ))
            }
        }
    }
}

impl std::fmt::Debug for RpcReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcReceiver")
            .field("commands", &self.commands)
            .finish()
    }
}

fn parse_call_payload(payload: &[u8]) -> Result<CallId> {
    let text = std::str::from_utf8(payload).map_err(|_| RelayError::MalformedArguments {
        reason: "call payload is not UTF-8".to_string(),
    })?;
    CallId::parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Atom, CallErrorCode};

    fn receiver_with_echo() -> RpcReceiver {
        let mut receiver = RpcReceiver::new();
        receiver
            .register_sync("echo", |args| (CallError::okay(), args.clone()))
            .unwrap();
        receiver
    }

    #[tokio::test]
    async fn test_dispatch_runs_handler_and_echoes_seqno() {
        let receiver = receiver_with_echo();
        let call = CallId::finder(
            "fea",
            "echo",
            ArgList::new().with(Atom::text("ifname", "eth0")),
        );

        let reply = receiver
            .dispatch(&envelope::encode_call(77, &call))
            .await
            .unwrap();
        let (seqno, error, args) = envelope::decode_result(&reply).unwrap();
        assert_eq!(seqno, 77);
        assert!(error.is_okay());
        assert_eq!(args, *call.args());
    }

    #[tokio::test]
    async fn test_unknown_command_answered_in_band() {
        let receiver = receiver_with_echo();
        let call = CallId::finder("fea", "reboot", ArgList::new());

        let reply = receiver
            .dispatch(&envelope::encode_call(78, &call))
            .await
            .unwrap();
        let (seqno, error, args) = envelope::decode_result(&reply).unwrap();
        assert_eq!(seqno, 78);
        assert_eq!(error.code(), CallErrorCode::NoSuchCommand);
        assert!(error.note().contains("reboot"));
        assert!(args.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_identifier_answered_with_bad_args() {
        let receiver = receiver_with_echo();

        // Well-framed envelope, garbage payload.
        let mut frame = envelope::encode_call(79, &CallId::finder("t", "c", ArgList::new()))
            .to_vec();
        frame.truncate(frame.len() - "finder://t/c".len());
        frame.extend_from_slice(b"not an identifier");

        let reply = receiver.dispatch(&frame).await.unwrap();
        let (seqno, error, _) = envelope::decode_result(&reply).unwrap();
        assert_eq!(seqno, 79);
        assert_eq!(error.code(), CallErrorCode::BadArgs);
    }

    #[tokio::test]
    async fn test_framing_failure_is_returned_not_answered() {
        let receiver = receiver_with_echo();
        let err = receiver.dispatch(b"Bogus Protocol 0.1\n").await.unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[tokio::test]
    async fn test_result_envelope_is_wrong_kind_here() {
        let receiver = receiver_with_echo();
        let frame = envelope::encode_result(5, &CallError::okay(), &ArgList::new());
        let err = receiver.dispatch(&frame).await.unwrap_err();
        assert!(matches!(err, RelayError::WrongEnvelopeType { .. }));
    }

    #[tokio::test]
    async fn test_handler_failure_travels_in_result() {
        let mut receiver = RpcReceiver::new();
        receiver
            .register_sync("set_mtu", |_args| {
                (
                    CallError::command_failed("interface is down"),
                    ArgList::new(),
                )
            })
            .unwrap();

        let call = CallId::finder("fea", "set_mtu", ArgList::new());
        let reply = receiver
            .dispatch(&envelope::encode_call(80, &call))
            .await
            .unwrap();
        let (_, error, _) = envelope::decode_result(&reply).unwrap();
        assert_eq!(error.code(), CallErrorCode::CommandFailed);
        assert_eq!(error.note(), "interface is down");
    }
}
