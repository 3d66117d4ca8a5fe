//! Error types for the Prism engine
//!
//! This module defines the error type shared by the buffer layer, the
//! graphics-context abstraction and every backend.

use std::fmt;

/// Result type for Prism engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, software device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (bad stride, foreign transfer buffer, etc.)
    InvalidResource(String),

    /// Initialization failed (context, device, subsystems)
    InitializationFailed(String),

    /// Operation on a resource that has already been disposed
    Disposed(String),

    /// Mapped memory requested outside of a lock/unlock window
    NotMapped(String),

    /// Unlock without a matching lock
    NotLocked(String),

    /// Lock (or re-creation) while a mapping is still outstanding
    AlreadyLocked(String),

    /// The backend refused to map the buffer
    NotLockable(String),

    /// The graphics context could not be made current (context lost)
    ContextActivationFailed(String),

    /// Operation on a null handle
    NullHandle(String),

    /// Offset or size outside of the buffer
    OutOfRange(String),
}

impl Error {
    /// True when the failure comes from external state (context lost)
    /// rather than from API misuse.
    pub fn is_context_lost(&self) -> bool {
        matches!(self, Error::ContextActivationFailed(_))
    }

    /// True for programming-contract violations.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::Disposed(_)
                | Error::NotMapped(_)
                | Error::NotLocked(_)
                | Error::AlreadyLocked(_)
                | Error::NullHandle(_)
                | Error::OutOfRange(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Disposed(msg) => write!(f, "Resource disposed: {}", msg),
            Error::NotMapped(msg) => write!(f, "Buffer not locked: {}", msg),
            Error::NotLocked(msg) => write!(f, "Unlock without lock: {}", msg),
            Error::AlreadyLocked(msg) => write!(f, "Buffer already locked: {}", msg),
            Error::NotLockable(msg) => write!(f, "Buffer not lockable: {}", msg),
            Error::ContextActivationFailed(msg) => write!(f, "Context activation failed: {}", msg),
            Error::NullHandle(msg) => write!(f, "Null handle: {}", msg),
            Error::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
