//! Wrappers around the external programs (and the one in-process codec)
//! shoebox leans on: image conversion and capture-date metadata.

mod convert;
pub mod error;
pub mod metadata;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod tool;

pub use crate::convert::{ImageConverter, JpegConverter};
pub use crate::error::ErrorClass;
pub use crate::metadata::{MetadataBackend, MetadataRegistry};
pub use crate::tool::{Output, Tool};
