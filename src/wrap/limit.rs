//! Listener that bounds the number of open accepted connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

use crate::conn::{Connection, Listener};
use crate::error::Result;

use super::semaphore::Semaphore;

/// A listener admitting at most `capacity` open connections at a time.
///
/// `accept` first takes a permit, blocking until one is free, then
/// accepts from the wrapped listener. The permit is returned when the
/// accepted connection is closed or dropped, or immediately if the
/// underlying accept fails.
#[derive(Debug)]
pub struct LimitListener<L> {
    inner: L,
    permits: Arc<Semaphore>,
}

impl<L: Listener> LimitListener<L> {
    /// Wrap a listener, allowing `capacity` simultaneously open connections.
    pub fn new(inner: L, capacity: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Maximum number of simultaneously open connections.
    pub fn capacity(&self) -> usize {
        self.permits.capacity()
    }

    /// Number of connections that could be accepted without blocking.
    pub fn available(&self) -> usize {
        self.permits.available()
    }

    /// Get a reference to the wrapped listener.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }
}

impl<L: Listener> Listener for LimitListener<L> {
    type Conn = LimitedConnection<L::Conn>;

    fn accept(&self) -> Result<Self::Conn> {
        self.permits.acquire();
        match self.inner.accept() {
            Ok(conn) => {
                debug!(available = self.permits.available(), "Accepted connection");
                Ok(LimitedConnection {
                    inner: conn,
                    permit: Permit {
                        permits: self.permits.clone(),
                        released: AtomicBool::new(false),
                    },
                })
            }
            Err(e) => {
                self.permits.release();
                debug!(error = %e, "Accept failed, permit returned");
                Err(e)
            }
        }
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr()
    }
}

/// One permit, returned to its pool at most once.
#[derive(Debug)]
struct Permit {
    permits: Arc<Semaphore>,
    released: AtomicBool,
}

impl Permit {
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.permits.release();
            debug!(available = self.permits.available(), "Permit returned");
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release();
    }
}

/// A connection accepted through a [`LimitListener`].
///
/// Every `close` is forwarded to the underlying connection, but only
/// the first one returns the permit. Dropping an unclosed connection
/// also returns it.
#[derive(Debug)]
pub struct LimitedConnection<C> {
    // Declared before `permit` so the connection is dropped first.
    inner: C,
    permit: Permit,
}

impl<C> LimitedConnection<C> {
    /// Get a reference to the underlying connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> Connection for LimitedConnection<C> {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    fn close(&self) -> Result<()> {
        let result = self.inner.close();
        self.permit.release();
        result
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
