//! Call issuing and reply correlation for one transport connection.
//!
//! Issuing a call is non-blocking: a pending entry keyed by a fresh
//! sequence number is registered, the call envelope is handed to the
//! transport, and the returned future resolves when the matching result
//! envelope arrives via [`RpcSender::deliver`]. Replies may arrive in any
//! order; each completes exactly its own call. Dropping the future before
//! completion cancels the call and withdraws its pending entry; a late
//! reply then finds no entry and is discarded rather than dispatched to a
//! stale waiter.
//!
//! Transport failures and timeouts complete a call with a distinguished
//! [`CallError`] code; they are never surfaced as panics or loop errors.

use crate::envelope;
use crate::seqno::SeqnoCounter;
use async_trait::async_trait;
use bytes::Bytes;
use relay_core::{ArgList, CallError, CallId, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Byte-stream transport supplied by the surrounding runtime.
///
/// The sender only ever asks it to write one framed message; readable-data
/// notification and connection lifecycle stay with the event loop, which
/// feeds inbound frames to [`RpcSender::deliver`] and reports failures via
/// [`RpcSender::fail_all`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_frame(&self, frame: Bytes) -> Result<()>;
}

type Completion = (CallError, ArgList);
type PendingMap = HashMap<u32, oneshot::Sender<Completion>>;

/// Sender bound to one transport connection, multiplexing any number of
/// outstanding calls over it.
///
/// The pending table is guarded by a plain mutex held only for the
/// insert/remove, never across transport I/O, so the table can also be
/// cleaned up synchronously when a call future is dropped.
pub struct RpcSender<T: Transport> {
    transport: Arc<T>,
    seqnos: SeqnoCounter,
    pending: Mutex<PendingMap>,
}

/// Withdraws a call's pending entry when its future is dropped before a
/// reply arrives. Removal after normal completion is a no-op, since
/// [`RpcSender::deliver`] has already taken the entry.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingMap>,
    seqno: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.seqno);
    }
}

fn lock_pending(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> RpcSender<T> {
    pub fn new(transport: Arc<T>) -> Self {
        RpcSender {
            transport,
            seqnos: SeqnoCounter::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Sender with an explicit counter, for tests and for processes that
    /// want a recognizable base per connection.
    pub fn with_counter(transport: Arc<T>, seqnos: SeqnoCounter) -> Self {
        RpcSender {
            transport,
            seqnos,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a call and await its completion.
    ///
    /// Always yields a completion pair: remote failures, send failures,
    /// and connection teardown all arrive as the [`CallError`] half.
    /// Dropping the returned future cancels the call.
    pub async fn call(&self, call: &CallId) -> Completion {
        let seqno = self.seqnos.next();
        let rx = self.register(seqno);
        // Withdraws the pending entry on any exit, early or dropped.
        let _guard = PendingGuard {
            pending: &self.pending,
            seqno,
        };

        debug!(seqno, call = %call, "issuing call");
        let frame = envelope::encode_call(seqno, call);
        if let Err(e) = self.transport.send_frame(frame).await {
            warn!(seqno, error = %e, "transport rejected call");
            return (CallError::send_failed(e.to_string()), ArgList::new());
        }

        match rx.await {
            Ok(completion) => completion,
            // The sender was torn down with the call still pending.
            Err(_) => (
                CallError::send_failed("connection closed before reply"),
                ArgList::new(),
            ),
        }
    }

    /// [`call`](Self::call) with an upper bound on the wait. On expiry the
    /// inner call future is dropped, which withdraws its pending entry,
    /// and the call completes with [`CallError::reply_timeout`]; a reply
    /// arriving afterwards is discarded like any other unknown seqno.
    pub async fn call_with_timeout(&self, call: &CallId, wait: Duration) -> Completion {
        match tokio::time::timeout(wait, self.call(call)).await {
            Ok(completion) => completion,
            Err(_) => {
                debug!(call = %call, ?wait, "call timed out");
                (
                    CallError::reply_timeout(format!("no reply within {wait:?}")),
                    ArgList::new(),
                )
            }
        }
    }

    /// Feed one inbound result envelope to the correlation table.
    ///
    /// Framing and version errors propagate to the caller, which should
    /// treat the connection as desynchronized. An unknown or cancelled
    /// sequence number is not an error; the reply is logged and dropped.
    pub async fn deliver(&self, frame: &[u8]) -> Result<()> {
        let (seqno, error, args) = envelope::decode_result(frame)?;

        match lock_pending(&self.pending).remove(&seqno) {
            Some(tx) => {
                if tx.send((error, args)).is_err() {
                    debug!(seqno, "discarding late reply for cancelled call");
                }
            }
            None => {
                debug!(seqno, "discarding reply with no pending call");
            }
        }
        Ok(())
    }

    /// Complete every outstanding call with a transport-level failure.
    /// Called by the event loop on connection error or close.
    pub fn fail_all(&self, reason: &str) {
        let mut pending = lock_pending(&self.pending);
        if !pending.is_empty() {
            warn!(count = pending.len(), reason, "failing all pending calls");
        }
        for (_, tx) in pending.drain() {
            let _ = tx.send((CallError::send_failed(reason), ArgList::new()));
        }
    }

    /// Number of calls awaiting replies.
    pub fn pending_calls(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    fn register(&self, seqno: u32) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(seqno, tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Atom, RelayError};

    /// Transport that records frames and never replies on its own.
    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<Bytes>>,
        reject: bool,
    }

    impl RecordingTransport {
        fn recorded(&self) -> Vec<Bytes> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send_frame(&self, frame: Bytes) -> Result<()> {
            if self.reject {
                return Err(RelayError::transport("peer unreachable"));
            }
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    fn sample_call() -> CallId {
        CallId::finder("rib", "add_route", ArgList::new())
    }

    #[tokio::test]
    async fn test_reply_completes_matching_call() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::with_counter(transport.clone(), SeqnoCounter::with_base(1001));

        let call = sample_call();
        let call_fut = sender.call(&call);
        let deliver = async {
            // Wait until the request frame is out, then answer it.
            loop {
                if let Some(frame) = transport.recorded().first().cloned() {
                    let (seqno, _) = envelope::decode_call(&frame).unwrap();
                    assert_eq!(seqno, 1001);
                    let reply = envelope::encode_result(
                        seqno,
                        &CallError::okay(),
                        &ArgList::new().with(Atom::uint32("routes", 3)),
                    );
                    sender.deliver(&reply).await.unwrap();
                    break;
                }
                tokio::task::yield_now().await;
            }
        };

        let ((error, args), ()) = tokio::join!(call_fut, deliver);
        assert!(error.is_okay());
        assert_eq!(args.get_named("routes").unwrap().to_text(), "routes:u32=3");
        assert_eq!(sender.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_replies_correlate_by_seqno() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = Arc::new(RpcSender::with_counter(
            transport.clone(),
            SeqnoCounter::with_base(1001),
        ));

        let s1 = sender.clone();
        let first = tokio::spawn(async move { s1.call(&sample_call()).await });
        let s2 = sender.clone();
        let second = tokio::spawn(async move { s2.call(&sample_call()).await });

        // Wait for both request frames.
        loop {
            if transport.recorded().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }

        // Answer the second call first.
        let tag = |n: u32| ArgList::new().with(Atom::uint32("seq", n));
        sender
            .deliver(&envelope::encode_result(1002, &CallError::okay(), &tag(1002)))
            .await
            .unwrap();
        sender
            .deliver(&envelope::encode_result(1001, &CallError::okay(), &tag(1001)))
            .await
            .unwrap();

        let (err_a, args_a) = first.await.unwrap();
        let (err_b, args_b) = second.await.unwrap();
        assert!(err_a.is_okay() && err_b.is_okay());
        // Each call got its own reply, regardless of delivery order.
        let got_a = args_a.get_named("seq").unwrap().to_text();
        let got_b = args_b.get_named("seq").unwrap().to_text();
        assert_ne!(got_a, got_b);
    }

    #[tokio::test]
    async fn test_transport_failure_completes_with_send_failed() {
        let transport = Arc::new(RecordingTransport {
            reject: true,
            ..Default::default()
        });
        let sender = RpcSender::new(transport);

        let (error, args) = sender.call(&sample_call()).await;
        assert_eq!(error.code(), relay_core::CallErrorCode::SendFailed);
        assert!(args.is_empty());
        assert_eq!(sender.pending_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_completes_with_reply_timeout() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::with_counter(transport, SeqnoCounter::with_base(1001));

        let (error, _) = sender
            .call_with_timeout(&sample_call(), Duration::from_secs(5))
            .await;
        assert_eq!(error.code(), relay_core::CallErrorCode::ReplyTimeout);
        // The pending entry was withdrawn on expiry.
        assert_eq!(sender.pending_calls(), 0);

        // The late reply is discarded without error.
        let late = envelope::encode_result(1001, &CallError::okay(), &ArgList::new());
        sender.deliver(&late).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_calls_leave_no_pending_entries() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::new(transport.clone());

        // A peer that never answers must not grow the pending table.
        for _ in 0..10 {
            let call = sample_call();
            let (error, _) = sender
                .call_with_timeout(&call, Duration::from_secs(1))
                .await;
            assert_eq!(error.code(), relay_core::CallErrorCode::ReplyTimeout);
        }
        assert_eq!(transport.recorded().len(), 10);
        assert_eq!(sender.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_call_discards_late_reply() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::with_counter(transport.clone(), SeqnoCounter::with_base(1001));

        {
            let call = sample_call();
            let call_fut = sender.call(&call);
            // Poll once so the request is registered and sent, then drop.
            tokio::select! {
                biased;
                _ = call_fut => panic!("no reply was delivered"),
                _ = tokio::task::yield_now() => {}
            }
        }
        assert_eq!(transport.recorded().len(), 1);
        // Dropping the future withdrew the pending entry.
        assert_eq!(sender.pending_calls(), 0);

        let late = envelope::encode_result(1001, &CallError::okay(), &ArgList::new());
        sender.deliver(&late).await.unwrap();
        assert_eq!(sender.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_fail_all_completes_every_pending_call() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = Arc::new(RpcSender::new(transport.clone()));

        let s1 = sender.clone();
        let a = tokio::spawn(async move { s1.call(&sample_call()).await });
        let s2 = sender.clone();
        let b = tokio::spawn(async move { s2.call(&sample_call()).await });

        loop {
            if transport.recorded().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }

        sender.fail_all("connection reset");

        for task in [a, b] {
            let (error, _) = task.await.unwrap();
            assert_eq!(error.code(), relay_core::CallErrorCode::SendFailed);
            assert!(error.note().contains("connection reset"));
        }
        assert_eq!(sender.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_seqno_reply_is_ignored() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::new(transport);

        let stray = envelope::encode_result(4242, &CallError::okay(), &ArgList::new());
        assert!(sender.deliver(&stray).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_connection_fatal() {
        let transport = Arc::new(RecordingTransport::default());
        let sender = RpcSender::new(transport);

        let err = sender.deliver(b"Bogus Protocol 9.9\n").await.unwrap_err();
        assert!(err.is_connection_fatal());
    }
}
