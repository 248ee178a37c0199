//! Wrapper configuration.

use std::time::{Duration, Instant};

/// Options recognised by [`ReconnectingConnection`] and [`TimeoutConnection`].
///
/// Copied into each wrapper at construction and immutable afterwards.
/// A zero timeout means no deadline is applied.
///
/// [`ReconnectingConnection`]: super::ReconnectingConnection
/// [`TimeoutConnection`]: super::TimeoutConnection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Replace the connection when a read or write hits its deadline,
    /// reporting an empty result instead of the timeout. Defaults to `false`.
    pub reconnect: bool,
    /// Deadline applied before each read. Defaults to zero (none).
    pub read_timeout: Duration,
    /// Deadline applied before each write. Defaults to zero (none).
    pub write_timeout: Duration,
}

impl Options {
    /// Enable or disable timeout-triggered reconnection.
    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Deadline for a read starting now, if a read timeout is configured.
    pub fn read_deadline(&self) -> Option<Instant> {
        deadline_after(self.read_timeout)
    }

    /// Deadline for a write starting now, if a write timeout is configured.
    pub fn write_deadline(&self) -> Option<Instant> {
        deadline_after(self.write_timeout)
    }
}

/// A timeout too large to represent as an `Instant` means no deadline.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    if timeout.is_zero() {
        return None;
    }
    Instant::now().checked_add(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(!options.reconnect);
        assert_eq!(options.read_timeout, Duration::ZERO);
        assert_eq!(options.write_timeout, Duration::ZERO);
        assert!(options.read_deadline().is_none());
        assert!(options.write_deadline().is_none());
    }

    #[test]
    fn test_builder() {
        let options = Options::default()
            .with_reconnect(true)
            .with_read_timeout(Duration::from_secs(2))
            .with_write_timeout(Duration::from_secs(3));

        assert!(options.reconnect);
        assert_eq!(options.read_timeout, Duration::from_secs(2));

        let before = Instant::now();
        let deadline = options.write_deadline().unwrap();
        assert!(deadline >= before + Duration::from_secs(3));
    }

    #[test]
    fn test_huge_timeout_means_no_deadline() {
        let options = Options::default()
            .with_read_timeout(Duration::MAX)
            .with_write_timeout(Duration::MAX);

        assert!(options.read_deadline().is_none());
        assert!(options.write_deadline().is_none());
    }
}
