//! Lazily dialed connection with timeout-triggered reconnection.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tracing::{debug, warn};

use crate::conn::Connection;
use crate::error::{Error, Result};

use super::options::Options;
use super::state::{ConnectionState, DialCounters, DialStats};

/// A connection that dials on first use and can replace itself.
///
/// Every operation goes through the same "ensure connected" step: the
/// cached connection is returned if there is one, otherwise the dial
/// function runs under an exclusive lock. Concurrent first callers share
/// a single dial. A failed dial leaves the wrapper empty, so the next
/// operation dials again.
///
/// When [`Options::reconnect`] is set, a read or write that hits its
/// deadline closes the current connection, dials a new one and returns
/// `Ok(0)`. The caller is expected to retry. The outcome of that
/// reconnect is not reported; a failed redial surfaces on the next call.
pub struct ReconnectingConnection<C, D> {
    dial: D,
    options: Options,
    conn: RwLock<Option<Arc<C>>>,
    counters: DialCounters,
}

impl<C, D> ReconnectingConnection<C, D>
where
    C: Connection,
    D: Fn() -> Result<C> + Send + Sync,
{
    /// Create a wrapper around a dial function. Nothing is dialed yet.
    pub fn new(dial: D, options: Options) -> Self {
        Self {
            dial,
            options,
            conn: RwLock::new(None),
            counters: DialCounters::default(),
        }
    }

    /// Get the options this wrapper was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Get dial statistics.
    pub fn stats(&self) -> DialStats {
        self.counters.snapshot()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        if self.read_slot().is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    /// Peek at the cached connection without dialing.
    pub fn current(&self) -> Option<Arc<C>> {
        self.read_slot().clone()
    }

    /// Get the cached connection, dialing if there is none.
    pub fn connection(&self) -> Result<Arc<C>> {
        self.connect(false)
    }

    /// Close the cached connection, if any, and dial a new one.
    pub fn reconnect(&self) -> Result<Arc<C>> {
        self.connect(true)
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Option<Arc<C>>> {
        self.conn.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Arc<C>>> {
        self.conn.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self, force: bool) -> Result<Arc<C>> {
        if !force {
            if let Some(conn) = self.read_slot().as_ref() {
                return Ok(conn.clone());
            }
        }

        let mut slot = self.write_slot();
        if !force {
            // Another caller may have dialed while we waited for the lock.
            if let Some(conn) = slot.as_ref() {
                return Ok(conn.clone());
            }
        } else {
            self.counters.record_reconnect();
            if let Some(old) = slot.take() {
                if let Err(e) = old.close() {
                    debug!(error = %e, "Closing replaced connection failed");
                }
            }
        }

        self.counters.record_dial();
        match (self.dial)() {
            Ok(conn) => {
                let conn = Arc::new(conn);
                *slot = Some(conn.clone());
                debug!(peer = ?conn.peer_addr(), forced = force, "Dialed connection");
                Ok(conn)
            }
            Err(e) => {
                self.counters.record_failure();
                warn!(error = %e, forced = force, "Dial failed");
                Err(Error::dial(e))
            }
        }
    }

    /// Turn a deadline error into a forced reconnect when enabled.
    fn recover(&self, result: Result<usize>, op: &'static str) -> Result<usize> {
        match result {
            Err(e) if self.options.reconnect && e.is_deadline_exceeded() => {
                self.counters.record_timeout_reconnect();
                warn!(op, "Deadline exceeded, reconnecting");
                let _ = self.connect(true);
                Ok(0)
            }
            other => other,
        }
    }
}

impl<C, D> Connection for ReconnectingConnection<C, D>
where
    C: Connection,
    D: Fn() -> Result<C> + Send + Sync,
{
    /// Reads from the current connection, dialing first if needed.
    ///
    /// A failure to arm the read deadline is ignored and the read still runs.
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let conn = self.connect(false)?;
        if let Some(deadline) = self.options.read_deadline() {
            if let Err(e) = conn.set_read_deadline(Some(deadline)) {
                debug!(error = %e, "Setting read deadline failed");
            }
        }
        self.recover(conn.read(buf), "read")
    }

    /// Writes to the current connection, dialing first if needed.
    ///
    /// A failure to arm the write deadline is ignored and the write still runs.
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let conn = self.connect(false)?;
        if let Some(deadline) = self.options.write_deadline() {
            if let Err(e) = conn.set_write_deadline(Some(deadline)) {
                debug!(error = %e, "Setting write deadline failed");
            }
        }
        self.recover(conn.write(buf), "write")
    }

    fn close(&self) -> Result<()> {
        self.connect(false)?.close()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.connect(false).ok()?.local_addr()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.connect(false).ok()?.peer_addr()
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.connect(false)?.set_deadline(deadline)
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.connect(false)?.set_read_deadline(deadline)
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.connect(false)?.set_write_deadline(deadline)
    }
}

impl<C, D> std::fmt::Debug for ReconnectingConnection<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = self
            .conn
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("ReconnectingConnection")
            .field("options", &self.options)
            .field("connected", &connected)
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}
