//! Concrete transports implementing the connection contracts.
//!
//! [`tcp`] wraps std::net sockets; [`memory`] provides in-process pipes
//! with the same deadline behaviour.

pub mod memory;
pub mod tcp;

pub use memory::{MemoryConnection, MemoryDialer, MemoryListener};
pub use tcp::{TcpAcceptor, TcpConnection};
