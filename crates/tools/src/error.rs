//! Tool Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::time::Duration;

/// A tool error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The executable could not be located (neither configured nor on `PATH`).
    #[display("{_0} not found on this system")]
    ToolNotFound(#[error(not(source))] &'static str),
    /// The executable exists but could not be started.
    #[display("could not launch {_0}")]
    Spawn(#[error(not(source))] &'static str),
    /// The process was killed after exceeding its time limit.
    #[display("{tool} timed out after {}s", timeout.as_secs())]
    Timeout { tool: &'static str, timeout: Duration },
    /// The process ran to completion but reported failure.
    /// A missing exit code means it was killed by a signal.
    #[display("{tool} exited with code {}\nSTDOUT: {stdout}\nSTDERR: {stderr}", exit_code(code))]
    ToolFailed {
        tool: &'static str,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// Tool output (or file contents) could not be understood as a date.
    #[display("malformed metadata: {_0}")]
    Metadata(#[error(not(source))] String),
    /// The backend deliberately doesn't handle this kind of file.
    #[display("unsupported format: {_0}")]
    Unsupported(#[error(not(source))] String),
    /// Image decoding or re-encoding failed.
    #[display("image conversion failed")]
    Conversion,
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io)
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ToolNotFound(_) | Self::Spawn(_) | Self::Timeout { .. } | Self::ToolFailed { .. } => {
                ErrorClass::ToolExecution
            },
            Self::Metadata(_) | Self::Unsupported(_) => ErrorClass::Metadata,
            Self::Conversion => ErrorClass::Conversion,
            Self::Io => ErrorClass::FileOperation,
        }
    }
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Coarse failure taxonomy shared by every shoebox crate, written to the
/// diagnostics log next to each failure.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    #[display("TOOL_EXECUTION")]
    ToolExecution,
    #[display("METADATA")]
    Metadata,
    #[display("FILE_OPERATION")]
    FileOperation,
    #[display("CONVERSION")]
    Conversion,
}
