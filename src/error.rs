//! Launcher Error Types

use derive_more::{Display, Error};

/// A launcher error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a run could not start or finish.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not initialise logging")]
    Logging,
    #[display("the pipeline could not run")]
    Run,
    /// The worker thread could not be started, or died without reporting.
    #[display("pipeline worker thread failed")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
