//! In-memory transport.
//!
//! [`pipe`] creates two connected endpoints, [`listener`] creates a
//! listener plus a dialer that feeds it. Both honour deadlines exactly
//! like the socket transport, which makes them useful for exercising
//! wrappers without touching the network. In-memory connections have no
//! socket address.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::{Buf, BytesMut};

use crate::conn::{Connection, Listener};
use crate::error::{Error, Result};

/// One direction of a pipe.
#[derive(Default)]
struct Channel {
    state: Mutex<ChannelState>,
    ready: Condvar,
}

#[derive(Default)]
struct ChannelState {
    data: BytesMut,
    closed: bool,
}

impl Channel {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Deadlines {
    read: Option<Instant>,
    write: Option<Instant>,
}

/// One end of an in-memory pipe.
pub struct MemoryConnection {
    incoming: Arc<Channel>,
    outgoing: Arc<Channel>,
    deadlines: Mutex<Deadlines>,
    closed: AtomicBool,
}

/// Create a pair of connected in-memory endpoints.
///
/// Bytes written to one end are read from the other. Writes never block.
pub fn pipe() -> (MemoryConnection, MemoryConnection) {
    let a_to_b = Arc::new(Channel::default());
    let b_to_a = Arc::new(Channel::default());
    let a = MemoryConnection::new(b_to_a.clone(), a_to_b.clone());
    let b = MemoryConnection::new(a_to_b, b_to_a);
    (a, b)
}

impl MemoryConnection {
    fn new(incoming: Arc<Channel>, outgoing: Arc<Channel>) -> Self {
        Self {
            incoming,
            outgoing,
            deadlines: Mutex::new(Deadlines::default()),
            closed: AtomicBool::new(false),
        }
    }

    fn deadlines(&self) -> Deadlines {
        *self.deadlines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if this end has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of bytes waiting to be read on this end.
    pub fn buffered(&self) -> usize {
        self.incoming.lock().data.len()
    }

    fn wake_readers(&self) {
        // Taking the lock orders this wakeup after a reader's deadline check.
        drop(self.incoming.lock());
        self.incoming.ready.notify_all();
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.incoming.close();
        self.outgoing.close();
    }
}

impl Connection for MemoryConnection {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.incoming.lock();
        loop {
            if self.is_closed() {
                return Err(Error::Closed);
            }
            if !state.data.is_empty() {
                let n = buf.len().min(state.data.len());
                buf[..n].copy_from_slice(&state.data[..n]);
                state.data.advance(n);
                return Ok(n);
            }
            if state.closed {
                return Ok(0);
            }

            // Re-read on every wakeup so a deadline moved while blocked is honoured.
            match self.deadlines().read {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::DeadlineExceeded);
                    }
                    state = self
                        .incoming
                        .ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    state = self
                        .incoming
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if let Some(deadline) = self.deadlines().write {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }

        let mut state = self.outgoing.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        state.data.extend_from_slice(buf);
        drop(state);
        self.outgoing.ready.notify_all();
        Ok(buf.len())
    }

    fn close(&self) -> Result<()> {
        self.shutdown();
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        {
            let mut deadlines = self.deadlines.lock().unwrap_or_else(PoisonError::into_inner);
            deadlines.read = deadline;
            deadlines.write = deadline;
        }
        self.wake_readers();
        Ok(())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read = deadline;
        self.wake_readers();
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

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("closed", &self.is_closed())
            .field("buffered", &self.buffered())
            .finish()
    }
}

#[derive(Default)]
struct Backlog {
    queue: VecDeque<MemoryConnection>,
    closed: bool,
}

#[derive(Default)]
struct ListenerShared {
    backlog: Mutex<Backlog>,
    ready: Condvar,
}

impl ListenerShared {
    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Accepting side of an in-memory listener.
pub struct MemoryListener {
    shared: Arc<ListenerShared>,
}

/// Connecting side of an in-memory listener.
#[derive(Clone)]
pub struct MemoryDialer {
    shared: Arc<ListenerShared>,
}

/// Create an in-memory listener and a dialer connected to it.
pub fn listener() -> (MemoryListener, MemoryDialer) {
    let shared = Arc::new(ListenerShared::default());
    (
        MemoryListener {
            shared: shared.clone(),
        },
        MemoryDialer { shared },
    )
}

impl MemoryListener {
    /// Number of dialed connections waiting to be accepted.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }
}

impl Listener for MemoryListener {
    type Conn = MemoryConnection;

    fn accept(&self) -> Result<MemoryConnection> {
        let mut backlog = self.shared.lock();
        loop {
            if let Some(conn) = backlog.queue.pop_front() {
                return Ok(conn);
            }
            if backlog.closed {
                return Err(Error::ListenerClosed);
            }
            backlog = self
                .shared
                .ready
                .wait(backlog)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn close(&self) -> Result<()> {
        let pending = {
            let mut backlog = self.shared.lock();
            backlog.closed = true;
            std::mem::take(&mut backlog.queue)
        };
        self.shared.ready.notify_all();
        // Dropping closes the server halves, so their dialers see EOF.
        drop(pending);
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl MemoryDialer {
    /// Connect to the listener, returning the client end.
    pub fn dial(&self) -> Result<MemoryConnection> {
        let mut backlog = self.shared.lock();
        if backlog.closed {
            return Err(Error::ListenerClosed);
        }
        let (client, server) = pipe();
        backlog.queue.push_back(server);
        drop(backlog);
        self.shared.ready.notify_one();
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pipe_transfer() {
        let (a, b) = pipe();
        assert_eq!(a.write(b"ping").unwrap(), 4);
        assert_eq!(b.buffered(), 4);

        let mut buf = [0u8; 2];
        assert_eq!(b.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"pi");
        assert_eq!(b.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ng");
    }

    #[test]
    fn test_read_blocks_until_write() {
        let (a, b) = pipe();
        let reader = thread::spawn(move || {
            let mut buf = [0u8; 8];
            let n = b.read(&mut buf).unwrap();
            buf[..n].to_vec()
        });

        thread::sleep(Duration::from_millis(20));
        a.write(b"late").unwrap();
        assert_eq!(reader.join().unwrap(), b"late");
    }

    #[test]
    fn test_read_deadline() {
        let (_a, b) = pipe();
        b.set_read_deadline(Some(Instant::now() + Duration::from_millis(20)))
            .unwrap();

        let started = Instant::now();
        let mut buf = [0u8; 4];
        let err = b.read(&mut buf).unwrap_err();
        assert!(err.is_deadline_exceeded());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_past_write_deadline() {
        let (a, _b) = pipe();
        a.set_write_deadline(Some(Instant::now())).unwrap();
        assert!(a.write(b"x").unwrap_err().is_deadline_exceeded());

        a.set_deadline(None).unwrap();
        assert_eq!(a.write(b"x").unwrap(), 1);
    }

    #[test]
    fn test_peer_close_is_eof() {
        let (a, b) = pipe();
        a.write(b"tail").unwrap();
        a.close().unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(b.read(&mut buf).unwrap(), 4);
        assert_eq!(b.read(&mut buf).unwrap(), 0);
        assert!(matches!(b.write(b"x"), Err(Error::Closed)));
    }

    #[test]
    fn test_local_close() {
        let (a, _b) = pipe();
        a.close().unwrap();
        assert!(a.is_closed());
        let mut buf = [0u8; 1];
        assert!(matches!(a.read(&mut buf), Err(Error::Closed)));
    }

    #[test]
    fn test_listener_accepts_dialed() {
        let (listener, dialer) = listener();
        let client = dialer.dial().unwrap();
        assert_eq!(listener.pending(), 1);

        let server = listener.accept().unwrap();
        client.write(b"hi").unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(server.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn test_listener_close_wakes_accept() {
        let (listener, dialer) = listener();
        let listener = Arc::new(listener);

        let accepting = {
            let listener = listener.clone();
            thread::spawn(move || listener.accept().map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        listener.close().unwrap();
        assert!(matches!(
            accepting.join().unwrap(),
            Err(Error::ListenerClosed)
        ));
        assert!(matches!(dialer.dial(), Err(Error::ListenerClosed)));
    }
}
