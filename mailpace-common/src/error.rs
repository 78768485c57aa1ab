//! Error types for the mailpace-common crate.
//!
//! Transports report failures through [`TransportError`]. The throttling
//! layer never retries on these; it only logs them.

use std::io;

use thiserror::Error;

/// Failure raised by a downstream transport while handing over messages.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side could not be reached or dropped the connection.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The remote side refused one or more messages.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// A preparator callback failed to fill in its message.
    #[error("Message preparation failed: {0}")]
    Preparation(String),

    /// The transport is not accepting messages, e.g. it was shut down.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: reset by peer");
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Rejected("550 mailbox unavailable".to_string());
        assert_eq!(err.to_string(), "Message rejected: 550 mailbox unavailable");
    }
}
