//! The crate-wide error taxonomy.
//!
//! Platform watcher code never leaks a raw OS error into an emitted JSON
//! record; every failure is converted into one of these variants at the
//! boundary where it crosses from platform-specific code into the session
//! controller or the protocol dispatcher.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to acquire the OS notification source or the initial
    /// enumeration. No session is created when this is returned.
    #[error("failed to start synchronization: {0}")]
    Start(String),

    /// A recoverable decode/wait failure during a running session. Delivered
    /// through `error_cb`; the watcher that raised it exits its loop.
    #[error("{0}")]
    RuntimeWatch(String),

    /// Transient failure of the port-enumeration primitive.
    #[error("failed to enumerate serial ports: {0}")]
    Enumeration(String),

    /// Invalid command or argument on the protocol dispatcher surface.
    #[error("{0}")]
    Protocol(String),

    /// Failure reading from standard input. The process exits with status 1.
    #[error("i/o error reading commands: {0}")]
    FatalIo(#[from] std::io::Error),
}

impl DiscoveryError {
    /// `true` for errors that should end the process rather than just the
    /// current command or session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiscoveryError::FatalIo(_))
    }
}
