//! Error types for the ID server.
//!
//! This module defines the central `Error` enum, which captures every way a
//! session can end other than a clean disconnect at a request boundary.
//!
//! ## Error Cases
//! - `InvalidRequest`: The client sent a zero-count request or a malformed
//!   auth header.
//! - `InvalidAuth`: The presented token does not match the shared secret.
//! - `IdGeneration`: The allocator refused to mint (clock moved backward).
//! - `Io`: The transport failed, including the peer hanging up mid-message.
//!
//! All variants are terminal for the connection they occur on.

use std::io;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the ID server.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The client request was malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The presented token does not match the configured secret.
    #[error("Invalid auth")]
    InvalidAuth,

    /// Underlying Snowflake ID generation failed.
    #[error("ID error: {0}")]
    IdGeneration(#[from] mintflake::Error),

    /// Reading from or writing to the peer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this is the peer going away rather than a real failure.
    ///
    /// A short read during the auth handshake, or a reset connection, is a
    /// normal disconnect and is not worth an error log.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_is_a_disconnect() {
        let err = Error::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(err.is_disconnect());
        let err = Error::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(err.is_disconnect());
    }

    #[test]
    fn protocol_errors_are_not_disconnects() {
        assert!(!Error::InvalidAuth.is_disconnect());
        assert!(
            !Error::from(mintflake::Error::ClockMovedBackward { wait_until: 1 }).is_disconnect()
        );
        assert!(!Error::from(io::Error::other("boom")).is_disconnect());
    }
}
