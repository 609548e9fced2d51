use std::io;
use thiserror::Error;

/// Failure of an OS-level socket operation, tagged with the call that failed.
#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct SocketError {
    /// Name of the failing call, e.g. `"socket"`, `"sendto"`, `"recvfrom"`.
    pub op: &'static str,
    #[source]
    pub source: io::Error,
}

impl SocketError {
    pub(crate) fn new(op: &'static str, source: io::Error) -> Self {
        SocketError { op, source }
    }

    /// Error reported when an operation hits a closed session.
    pub(crate) fn closed() -> Self {
        SocketError::new(
            "socket",
            io::Error::new(io::ErrorKind::NotConnected, "session is closed"),
        )
    }

    /// The OS error code, when the underlying failure carries one.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }
}

/// A reply arrived but failed validation or correlation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("reply shorter than the 8-byte ICMP header")]
    Truncated,
    #[error("reply checksum does not fold to zero")]
    ChecksumMismatch,
    #[error("unexpected ICMP type {0}")]
    UnexpectedType(u8),
    #[error("reply does not match the request identifier and sequence")]
    Mismatch,
}

#[derive(Debug, Error)]
pub enum PingError {
    /// Rejected before any I/O was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Another echo request is in flight on this session.
    #[error("an echo request is already in flight on this session")]
    AlreadyInProgress,
    /// No reply within the timeout. An expected outcome, kept apart from
    /// [`PingError::SocketFailure`].
    #[error("no reply within the timeout")]
    Timeout,
    #[error("socket failure: {0}")]
    SocketFailure(#[from] SocketError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
