//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout residua.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A CLI/API argument was structurally invalid (message describes which one).
    InvalidArgument(&'static str),
    /// The input buffer is smaller than the smallest structure the requested
    /// scanner could ever match.
    TooSmallInput { needed: usize, got: usize },
    /// A DER feature was encountered that this parser does not support.
    UnsupportedDerFeature(&'static str),
    /// An offset or size field would read outside the valid region.
    InvalidRange,
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(s) => write!(f, "invalid argument: {s}"),
            Error::TooSmallInput { needed, got } => {
                write!(f, "input too small: need at least {needed} bytes, got {got}")
            }
            Error::UnsupportedDerFeature(s) => write!(f, "unsupported DER feature: {s}"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
