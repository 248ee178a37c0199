//! Async concurrency-limited TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::{Error, Result};

/// An async TCP listener admitting at most `capacity` open connections.
///
/// `accept` waits for a permit before accepting. The permit travels with
/// the returned [`LimitedTcpStream`] and is returned when the stream is
/// released or dropped.
#[derive(Debug)]
pub struct AsyncLimitListener {
    listener: TcpListener,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AsyncLimitListener {
    /// Bind to an address with the given capacity.
    pub async fn bind<A: ToSocketAddrs>(addr: A, capacity: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, capacity))
    }

    /// Wrap an already bound listener.
    pub fn new(listener: TcpListener, capacity: usize) -> Self {
        Self {
            listener,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Get the local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Maximum number of simultaneously open connections.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connections that could be accepted without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit, then accept the next connection.
    ///
    /// If the underlying accept fails the permit is returned at once.
    pub async fn accept(&self) -> Result<(LimitedTcpStream, SocketAddr)> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::ListenerClosed)?;

        // On error `permit` drops here, returning it to the pool.
        let (stream, addr) = self.listener.accept().await?;
        debug!(peer = %addr, available = self.available(), "Accepted connection");
        Ok((
            LimitedTcpStream {
                stream,
                _permit: permit,
            },
            addr,
        ))
    }
}

/// A TCP stream holding one permit of an [`AsyncLimitListener`].
#[derive(Debug)]
pub struct LimitedTcpStream {
    stream: TcpStream,
    _permit: OwnedSemaphorePermit,
}

impl LimitedTcpStream {
    /// Get a reference to the stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    /// Get a mutable reference to the stream.
    pub fn get_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Shut down the stream and return its permit.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_capacity_gates_accept() {
        let listener = AsyncLimitListener::bind("127.0.0.1:0", 1).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let (first, _) = listener.accept().await.unwrap();
        assert_eq!(listener.available(), 0);

        let blocked = timeout(Duration::from_millis(50), listener.accept()).await;
        assert!(blocked.is_err());

        first.close().await.unwrap();
        assert_eq!(listener.available(), 1);

        let (second, _) = timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listener.available(), 0);
        drop(second);
        assert_eq!(listener.available(), 1);
    }
}
