//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr so the event stream printed on stdout stays
//! readable. `RUST_LOG` takes precedence over the verbosity flag.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}
