//! Error types for connection wrappers.

use std::io;
use thiserror::Error;

/// Errors that can occur on wrapped connections and listeners.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The dial function failed to establish a connection.
    #[error("Dial failed: {0}")]
    Dial(#[source] Box<Error>),

    /// A read or write deadline passed before the operation completed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The connection has been closed.
    #[error("Connection closed")]
    Closed,

    /// The listener has been closed.
    #[error("Listener closed")]
    ListenerClosed,
}

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an error returned by a dial function.
    pub fn dial(err: Error) -> Self {
        Self::Dial(Box::new(err))
    }

    /// Check if this error means a read or write deadline passed.
    ///
    /// Only [`Error::DeadlineExceeded`] counts. Transports report an armed
    /// deadline that way; a raw `TimedOut` from the network stack (for
    /// example a keepalive failure) is an ordinary I/O error.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::Dial(e) => Self::Dial(e.clone()),
            Self::DeadlineExceeded => Self::DeadlineExceeded,
            Self::Closed => Self::Closed,
            Self::ListenerClosed => Self::ListenerClosed,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::DeadlineExceeded => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::Closed | Error::ListenerClosed => {
                io::Error::new(io::ErrorKind::NotConnected, err)
            }
            Error::Dial(_) => io::Error::new(io::ErrorKind::ConnectionRefused, err),
        }
    }
}
