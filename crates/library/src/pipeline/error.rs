//! Error types for the [`pipeline`](super) module.
//!
//! These are the file operations that can fail while a file is being
//! processed. They never escape [`run`](super::run): each one is recorded
//! against the file it happened to and the run moves on.

use crate::diagnostics::Stage;
use derive_more::{Display, Error};
use shoebox_tools::ErrorClass;
use std::path::PathBuf;

/// A pipeline error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The filename isn't valid UTF-8, so it can't be classified or renamed.
    #[display("filename is not valid UTF-8: {}", _0.display())]
    InvalidName(#[error(not(source))] PathBuf),
    /// The mirrored output directory could not be created.
    #[display("could not create directory {}", _0.display())]
    CreateDir(#[error(not(source))] PathBuf),
    /// Copying the source into the output tree failed.
    #[display("could not copy to {}", _0.display())]
    Copy(#[error(not(source))] PathBuf),
    /// The materialized file could not be read back for hashing.
    #[display("could not hash {}", _0.display())]
    Hash(#[error(not(source))] PathBuf),
    /// Giving the materialized file its standardized name failed.
    #[display("could not rename {} to {}", from.display(), to.display())]
    Rename { from: PathBuf, to: PathBuf },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::FileOperation
    }

    /// The pipeline stage a failure of this kind is reported under.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidName(_) | Self::CreateDir(_) => Stage::MainPipeline,
            Self::Copy(_) => Stage::FileCopy,
            Self::Hash(_) | Self::Rename { .. } => Stage::Naming,
        }
    }
}
