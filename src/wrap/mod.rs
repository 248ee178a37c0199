//! Connection and listener wrappers.
//!
//! This module provides:
//! - A lazily dialed, self-healing connection ([`ReconnectingConnection`])
//! - A listener bounding open connections ([`LimitListener`])
//! - Idempotent close for connections and listeners
//! - Fixed per-operation deadlines ([`TimeoutConnection`])
//!
//! # Example
//!
//! ```no_run
//! use connguard::wrap::{Options, ReconnectingConnection};
//! use connguard::transport::TcpConnection;
//! use connguard::Connection;
//! use std::time::Duration;
//!
//! let options = Options::default()
//!     .with_reconnect(true)
//!     .with_read_timeout(Duration::from_secs(5));
//!
//! let conn = ReconnectingConnection::new(|| TcpConnection::connect("127.0.0.1:7000"), options);
//!
//! // Dials on first use; a read timeout reconnects and yields Ok(0).
//! let mut buf = [0u8; 1024];
//! let n = conn.read(&mut buf).unwrap();
//! ```
//!
//! # Limiting a listener
//!
//! ```no_run
//! use connguard::wrap::LimitListener;
//! use connguard::transport::TcpAcceptor;
//! use connguard::{Connection, Listener};
//!
//! let listener = LimitListener::new(TcpAcceptor::bind("127.0.0.1:7000").unwrap(), 64);
//!
//! loop {
//!     // Blocks while 64 accepted connections are still open.
//!     let conn = listener.accept().unwrap();
//!     std::thread::spawn(move || {
//!         // ... serve ...
//!         conn.close().ok();
//!     });
//! }
//! ```

mod limit;
mod once;
mod options;
mod reconnect;
mod semaphore;
mod state;
mod timeout;

pub use limit::{LimitListener, LimitedConnection};
pub use once::{OnceCloseConnection, OnceCloseListener};
pub use options::Options;
pub use reconnect::ReconnectingConnection;
pub use semaphore::Semaphore;
pub use state::{ConnectionState, DialStats};
pub use timeout::TimeoutConnection;

// Async variant (requires tokio feature)
#[cfg(feature = "tokio")]
mod limit_async;

#[cfg(feature = "tokio")]
pub use limit_async::{AsyncLimitListener, LimitedTcpStream};
