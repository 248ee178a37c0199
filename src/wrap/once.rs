//! Idempotent close for connections and listeners.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Instant;

use crate::conn::{Connection, Listener};
use crate::error::Result;

/// A connection whose underlying close runs exactly once.
///
/// Every caller of `close`, concurrent or later, receives the result of
/// that single close.
#[derive(Debug)]
pub struct OnceCloseConnection<C> {
    inner: C,
    closed: OnceLock<Result<()>>,
}

impl<C: Connection> OnceCloseConnection<C> {
    /// Wrap a connection.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            closed: OnceLock::new(),
        }
    }

    /// Check if `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.get().is_some()
    }

    /// Get a reference to the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> Connection for OnceCloseConnection<C> {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    fn close(&self) -> Result<()> {
        self.closed.get_or_init(|| self.inner.close()).clone()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr()
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.inner.set_deadline(deadline)
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.inner.set_read_deadline(deadline)
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.inner.set_write_deadline(deadline)
    }
}

/// A listener whose underlying close runs exactly once.
#[derive(Debug)]
pub struct OnceCloseListener<L> {
    inner: L,
    closed: OnceLock<Result<()>>,
}

impl<L: Listener> OnceCloseListener<L> {
    /// Wrap a listener.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            closed: OnceLock::new(),
        }
    }

    /// Get a reference to the wrapped listener.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }
}

impl<L: Listener> Listener for OnceCloseListener<L> {
    type Conn = L::Conn;

    fn accept(&self) -> Result<Self::Conn> {
        self.inner.accept()
    }

    fn close(&self) -> Result<()> {
        self.closed.get_or_init(|| self.inner.close()).clone()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr()
    }
}
