//! Connection state and dial statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// State of a [`ReconnectingConnection`](super::ReconnectingConnection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No underlying connection is held; the next operation dials.
    #[default]
    Unconnected,
    /// An underlying connection is held.
    Connected,
}

impl ConnectionState {
    /// Check if an underlying connection is held.
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

/// Snapshot of dial statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialStats {
    /// Number of times the dial function was invoked.
    pub dials: u64,
    /// Number of dial invocations that failed.
    pub failures: u64,
    /// Number of forced reconnects, including timeout-triggered ones.
    pub reconnects: u64,
    /// Number of reads or writes that hit their deadline and reconnected.
    pub timeout_reconnects: u64,
}

/// Lock-free counters behind [`DialStats`].
#[derive(Debug, Default)]
pub(crate) struct DialCounters {
    dials: AtomicU64,
    failures: AtomicU64,
    reconnects: AtomicU64,
    timeout_reconnects: AtomicU64,
}

impl DialCounters {
    pub(crate) fn record_dial(&self) {
        self.dials.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout_reconnect(&self) {
        self.timeout_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DialStats {
        DialStats {
            dials: self.dials.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            timeout_reconnects: self.timeout_reconnects.load(Ordering::Relaxed),
        }
    }
}
