//! Error types shared by every demonstration.

use std::io;
use thiserror::Error;

/// Result type alias for `nio_lab` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for buffer and I/O operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A mutating operation was attempted on a read-only buffer.
    #[error("buffer is read-only")]
    ReadOnly,

    /// Not enough room left between position and limit.
    #[error("buffer overflow: needed {needed} slots, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    /// Nothing left to read between position and limit.
    #[error("buffer underflow")]
    Underflow,

    /// Invalid sizes, ports or paths.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The Prometheus exporter could not be installed.
    #[error("metrics exporter: {0}")]
    Metrics(String),
}

impl Error {
    /// Returns `true` when the error is a non-blocking readiness miss.
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
    }

    /// Returns `true` when the error means the peer is gone.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_io_kinds() {
        let wb = Error::from(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(wb.is_would_block());
        assert!(!wb.is_disconnect());

        let reset = Error::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(reset.is_disconnect());
        assert!(!Error::ReadOnly.is_would_block());
    }

    #[test]
    fn overflow_message() {
        let err = Error::Overflow {
            needed: 4,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "buffer overflow: needed 4 slots, 1 remaining"
        );
    }
}
