//! Connection applying fixed per-operation deadlines.

use std::net::SocketAddr;
use std::time::Instant;

use crate::conn::Connection;
use crate::error::Result;

use super::options::Options;

/// A connection that arms a read or write deadline before every operation.
///
/// Only the timeouts in [`Options`] are used; `reconnect` is ignored and
/// a deadline error is returned as is. Errors from arming the deadline
/// are ignored.
#[derive(Debug)]
pub struct TimeoutConnection<C> {
    inner: C,
    options: Options,
}

impl<C: Connection> TimeoutConnection<C> {
    /// Wrap a connection.
    pub fn new(inner: C, options: Options) -> Self {
        Self { inner, options }
    }

    /// Get a reference to the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> Connection for TimeoutConnection<C> {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if let Some(deadline) = self.options.read_deadline() {
            let _ = self.inner.set_read_deadline(Some(deadline));
        }
        self.inner.read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        if let Some(deadline) = self.options.write_deadline() {
            let _ = self.inner.set_write_deadline(Some(deadline));
        }
        self.inner.write(buf)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
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
