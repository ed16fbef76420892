//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout hacstor.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type. Failures bubbling up
/// from an underlying store are passed through unchanged so the original
/// kind stays visible for diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    /// A cipher argument was rejected: wrong key/IV length, bad sector
    /// size, or an offset/length that violates an alignment requirement.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An offset or length falls outside the addressable range of the
    /// storage.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A write was requested on a read-only view.
    #[error("storage is read-only")]
    UnsupportedWrite,
    /// A resize was requested on a fixed-size encrypted view.
    #[error("storage size is fixed")]
    UnsupportedSetSize,
    /// The counter-generation index references an offset outside the
    /// storage, or the table itself is malformed. Corrupted metadata.
    #[error("counter index entry out of range")]
    InvalidIndirectEntryOffset,
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
