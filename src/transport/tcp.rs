//! TCP transport built on std::net.

use std::io::{self, Read, Write};
use std::net::{
    IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::conn::{Connection, Listener};
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
struct Deadlines {
    read: Option<Instant>,
    write: Option<Instant>,
}

/// Time left until `deadline`, or `DeadlineExceeded` if it has passed.
fn remaining(deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::DeadlineExceeded);
    }
    Ok(left)
}

/// Map a socket timeout to `DeadlineExceeded` when a deadline was armed.
fn map_timeout(err: io::Error, armed: bool) -> Error {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut if armed => Error::DeadlineExceeded,
        _ => Error::Io(err),
    }
}

/// A TCP connection with absolute read and write deadlines.
///
/// std sockets only offer relative timeouts, so the remaining time is
/// recomputed and applied before every read and write.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    deadlines: Mutex<Deadlines>,
}

impl TcpConnection {
    /// Connect to a remote address.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self::from_stream(stream))
    }

    /// Connect to a remote address with a timeout.
    pub fn connect_timeout(addr: &SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(addr, timeout)?;
        Ok(Self::from_stream(stream))
    }

    /// Create a connection from an existing TcpStream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let local_addr = stream.local_addr().ok();
        let peer_addr = stream.peer_addr().ok();
        Self {
            stream,
            local_addr,
            peer_addr,
            deadlines: Mutex::new(Deadlines::default()),
        }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    /// Set TCP nodelay option.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        Ok(self.stream.set_nodelay(nodelay)?)
    }

    fn deadlines(&self) -> Deadlines {
        *self.deadlines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connection for TcpConnection {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let deadline = self.deadlines().read;
        let timeout = deadline.map(remaining).transpose()?;
        self.stream.set_read_timeout(timeout)?;
        (&self.stream)
            .read(buf)
            .map_err(|e| map_timeout(e, deadline.is_some()))
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        let deadline = self.deadlines().write;
        let timeout = deadline.map(remaining).transpose()?;
        self.stream.set_write_timeout(timeout)?;
        (&self.stream)
            .write(buf)
            .map_err(|e| map_timeout(e, deadline.is_some()))
    }

    fn close(&self) -> Result<()> {
        Ok(self.stream.shutdown(Shutdown::Both)?)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        let mut deadlines = self.deadlines.lock().unwrap_or_else(PoisonError::into_inner);
        deadlines.read = deadline;
        deadlines.write = deadline;
        Ok(())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read = deadline;
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write = deadline;
        Ok(())
    }
}

/// A TCP listener that can be closed while another thread is accepting.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
    closed: AtomicBool,
}

impl TcpAcceptor {
    /// Bind to an address and start listening.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self::from_listener(listener)?)
    }

    /// Wrap an already bound listener.
    pub fn from_listener(listener: TcpListener) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            closed: AtomicBool::new(false),
        })
    }

    /// Get a reference to the underlying listener.
    pub fn get_ref(&self) -> &TcpListener {
        &self.listener
    }

    /// Check if the acceptor has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Listener for TcpAcceptor {
    type Conn = TcpConnection;

    fn accept(&self) -> Result<TcpConnection> {
        if self.is_closed() {
            return Err(Error::ListenerClosed);
        }
        let (stream, _) = self.listener.accept()?;
        if self.is_closed() {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(Error::ListenerClosed);
        }
        Ok(TcpConnection::from_stream(stream))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // std offers no way to interrupt accept, so wake it with a loopback connect.
        let mut wake = self.local_addr;
        if wake.ip().is_unspecified() {
            let loopback: IpAddr = if wake.is_ipv4() {
                Ipv4Addr::LOCALHOST.into()
            } else {
                Ipv6Addr::LOCALHOST.into()
            };
            wake.set_ip(loopback);
        }
        let _ = TcpStream::connect_timeout(&wake, Duration::from_millis(100));
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_tcp_echo() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").unwrap();
        let addr = acceptor.local_addr().unwrap();

        let server = thread::spawn(move || {
            let conn = acceptor.accept().unwrap();
            let mut buf = [0u8; 4];
            let mut read = 0;
            while read < 4 {
                read += conn.read(&mut buf[read..]).unwrap();
            }
            conn.write(&buf).unwrap();
        });

        let client = TcpConnection::connect(addr).unwrap();
        assert_eq!(client.peer_addr(), Some(addr));
        assert!(client.local_addr().is_some());

        client.write(b"ping").unwrap();
        let mut buf = [0u8; 4];
        let mut read = 0;
        while read < 4 {
            read += client.read(&mut buf[read..]).unwrap();
        }
        assert_eq!(&buf, b"ping");

        server.join().unwrap();
    }

    #[test]
    fn test_read_deadline_exceeded() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").unwrap();
        let addr = acceptor.local_addr().unwrap();
        let server = thread::spawn(move || acceptor.accept().unwrap());

        let client = TcpConnection::connect(addr).unwrap();
        let _peer = server.join().unwrap();

        client
            .set_read_deadline(Some(Instant::now() + Duration::from_millis(50)))
            .unwrap();
        let mut buf = [0u8; 4];
        let err = client.read(&mut buf).unwrap_err();
        assert!(err.is_deadline_exceeded());

        // A deadline already in the past fails without touching the socket.
        let err = client.read(&mut buf).unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[test]
    fn test_close_wakes_accept() {
        let acceptor = Arc::new(TcpAcceptor::bind("127.0.0.1:0").unwrap());
        let accepting = {
            let acceptor = acceptor.clone();
            thread::spawn(move || acceptor.accept().map(|_| ()))
        };

        thread::sleep(Duration::from_millis(50));
        acceptor.close().unwrap();
        assert!(matches!(
            accepting.join().unwrap(),
            Err(Error::ListenerClosed)
        ));
        assert!(matches!(acceptor.accept(), Err(Error::ListenerClosed)));
    }
}
