//! Error types for s25fl-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// The transport failed to exchange a frame
    TransportFailure,

    // Frame errors
    /// Response decode asked for more bytes than were exchanged
    FrameTooShort,
    /// Encoded frame would exceed the maximum exchange length
    FrameTooLong,

    // Operation errors
    /// Ready-wait exceeded its budget
    Timeout,
    /// A program command would exceed a page or cross a page boundary
    PageBoundaryViolation,
    /// Read-back data differs from what was written
    VerifyMismatch {
        /// Address of the first differing byte
        address: u32,
    },

    // Address/size errors
    /// Address does not fit the address width or the device
    AddressOutOfRange,
    /// Operation requires a sector aligned address or length
    InvalidAlignment,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportFailure => write!(f, "transport exchange failed"),
            Self::FrameTooShort => write!(f, "response frame too short"),
            Self::FrameTooLong => write!(f, "command frame exceeds maximum length"),
            Self::Timeout => write!(f, "timed out waiting for flash to become ready"),
            Self::PageBoundaryViolation => write!(f, "program would cross a page boundary"),
            Self::VerifyMismatch { address } => {
                write!(f, "verify failed at address 0x{:08X}", address)
            }
            Self::AddressOutOfRange => write!(f, "address out of range"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A multi-chunk operation that stopped part way through
///
/// `committed` counts the bytes whose chunks completed before `error`
/// occurred, so the caller can resume, re-erase or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialWrite {
    /// Bytes fully programmed (or erased) before the failure
    pub committed: usize,
    /// The error that stopped the operation
    pub error: Error,
}

impl PartialWrite {
    pub(crate) fn new(committed: usize, error: Error) -> Self {
        Self { committed, error }
    }
}

impl From<PartialWrite> for Error {
    fn from(partial: PartialWrite) -> Self {
        partial.error
    }
}

impl fmt::Display for PartialWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} bytes", self.error, self.committed)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PartialWrite {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
