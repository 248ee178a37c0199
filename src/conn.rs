//! Connection and listener contracts shared by every wrapper.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;

/// A bidirectional byte-stream connection.
///
/// All methods take `&self` so a single connection can be read, written
/// and closed from different threads at the same time, the same way
/// `&TcpStream` implements `Read` and `Write`.
///
/// Deadlines are absolute points in time. Passing `None` clears the
/// deadline. An operation still pending when its deadline passes fails
/// with an error for which [`Error::is_deadline_exceeded`] is true.
///
/// [`Error::is_deadline_exceeded`]: crate::Error::is_deadline_exceeded
pub trait Connection: Send + Sync {
    /// Read bytes into `buf`, returning how many were read.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes from `buf`, returning how many were written.
    fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Close the connection.
    fn close(&self) -> Result<()>;

    /// Local address, if known.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Remote address, if known.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Set both the read and write deadline.
    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()>;

    /// Set the read deadline.
    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()>;

    /// Set the write deadline.
    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()>;
}

/// A listener producing [`Connection`]s.
pub trait Listener: Send + Sync {
    /// The connection type produced by [`accept`](Listener::accept).
    type Conn: Connection;

    /// Wait for and accept the next inbound connection.
    fn accept(&self) -> Result<Self::Conn>;

    /// Close the listener.
    fn close(&self) -> Result<()>;

    /// Local address the listener is bound to, if any.
    fn local_addr(&self) -> Option<SocketAddr>;
}

macro_rules! forward_connection {
    ($ty:ty) => {
        impl<C: Connection + ?Sized> Connection for $ty {
            fn read(&self, buf: &mut [u8]) -> Result<usize> {
                (**self).read(buf)
            }

            fn write(&self, buf: &[u8]) -> Result<usize> {
                (**self).write(buf)
            }

            fn close(&self) -> Result<()> {
                (**self).close()
            }

            fn local_addr(&self) -> Option<SocketAddr> {
                (**self).local_addr()
            }

            fn peer_addr(&self) -> Option<SocketAddr> {
                (**self).peer_addr()
            }

            fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
                (**self).set_deadline(deadline)
            }

            fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
                (**self).set_read_deadline(deadline)
            }

            fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
                (**self).set_write_deadline(deadline)
            }
        }
    };
}

forward_connection!(Arc<C>);
forward_connection!(Box<C>);

impl<L: Listener + ?Sized> Listener for Arc<L> {
    type Conn = L::Conn;

    fn accept(&self) -> Result<Self::Conn> {
        (**self).accept()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        (**self).local_addr()
    }
}

/// Adapter exposing a [`Connection`] through `std::io::Read` and `Write`.
#[derive(Debug)]
pub struct IoStream<C> {
    inner: C,
}

impl<C: Connection> IoStream<C> {
    /// Wrap a connection.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Unwrap the adapter.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Connection> io::Read for IoStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.inner.read(buf)?)
    }
}

impl<C: Connection> io::Write for IoStream<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.inner.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
