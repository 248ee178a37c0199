//! Connection decorators built on std::net.
//!
//! This crate wraps a generic byte-stream connection and listener with
//! two behaviours raw sockets lack:
//!
//! - **Self-healing connections**: [`ReconnectingConnection`] dials lazily
//!   through a caller-supplied function, shares one dial between
//!   concurrent first callers, and can replace its connection when a read
//!   or write hits its deadline.
//! - **Admission control**: [`LimitListener`] bounds how many accepted
//!   connections may be open at once; `accept` blocks until a previously
//!   accepted connection is closed.
//!
//! Smaller decorators give idempotent close ([`OnceCloseConnection`],
//! [`OnceCloseListener`]) and fixed per-operation deadlines
//! ([`TimeoutConnection`]). Everything is written against the
//! [`Connection`] and [`Listener`] traits; [`transport`] provides TCP and
//! in-memory implementations.
//!
//! # Example
//!
//! ```no_run
//! use connguard::{Connection, Options, ReconnectingConnection};
//! use connguard::transport::TcpConnection;
//! use std::time::Duration;
//!
//! let conn = ReconnectingConnection::new(
//!     || TcpConnection::connect("127.0.0.1:7000"),
//!     Options::default()
//!         .with_reconnect(true)
//!         .with_write_timeout(Duration::from_secs(1)),
//! );
//!
//! conn.write(b"hello").unwrap();
//! ```
//!
//! # Features
//!
//! - `tokio`: adds [`wrap::AsyncLimitListener`] for tokio TCP listeners.

pub mod conn;
pub mod error;
pub mod transport;
pub mod wrap;

// Re-export commonly used types at the crate root
pub use conn::{Connection, IoStream, Listener};
pub use error::{Error, Result};
pub use wrap::{
    ConnectionState, DialStats, LimitListener, LimitedConnection, OnceCloseConnection,
    OnceCloseListener, Options, ReconnectingConnection, Semaphore, TimeoutConnection,
};
