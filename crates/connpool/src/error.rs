//! Pool error types and failure classification.

use thiserror::Error;

/// Errors raised by the pool itself.
///
/// Failures hit while a connection is borrowed are never wrapped in this
/// type. They stay the borrower's own error and are only inspected through
/// [`Classify`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),

    /// The pool has been closed.
    #[error("pool is closed")]
    PoolClosed,
}

/// Classification of errors raised while a connection is borrowed.
///
/// An error for which `is_disconnect` returns `true` marks the connection
/// as broken: [`Pool`](crate::Pool) discards it and schedules a
/// replacement, and [`retry`](crate::retry()) reissues the wrapped
/// operation. Any other error propagates untouched and the connection is
/// kept, per [`UnclassifiedPolicy`](crate::UnclassifiedPolicy).
///
/// Implement this on the error type your connections raise. The crate
/// implements it for [`std::io::Error`], covering the error kinds a dead
/// TCP peer produces.
pub trait Classify {
    /// True when the error means the connection itself is unusable.
    fn is_disconnect(&self) -> bool;
}

impl Classify for std::io::Error {
    fn is_disconnect(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::ConnectionRefused
                | ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
                | ErrorKind::UnexpectedEof
                | ErrorKind::TimedOut
                | ErrorKind::WriteZero
        )
    }
}
