//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop a whole run. Anything going wrong with an individual
/// file is recorded and reported, never returned.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source root could not be enumerated at all.
    #[display("could not scan source directory")]
    Scan,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Scan => false,
        }
    }
}
