//! Sequence-number allocation for request/response correlation.
//!
//! Each sender owns its counter; there is no ambient global, so several
//! independent senders in one process stay isolated and tests can pin the
//! base. Numbers are correlation keys only: they are not persisted and
//! carry no ordering guarantee across restarts.

use crate::envelope::ProtocolConfig;
use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonically increasing sequence counter.
#[derive(Debug)]
pub struct SeqnoCounter {
    next: AtomicU32,
}

impl SeqnoCounter {
    /// Counter starting at the protocol's fixed base.
    pub fn new() -> Self {
        SeqnoCounter::with_base(ProtocolConfig::SEQNO_BASE)
    }

    /// Counter starting at an explicit base.
    pub fn with_base(base: u32) -> Self {
        SeqnoCounter {
            next: AtomicU32::new(base),
        }
    }

    /// Allocate the next number. Wraps on overflow.
    pub fn next(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SeqnoCounter {
    fn default() -> Self {
        SeqnoCounter::new()
    }
}
