use crate::diagnostics::Stage;
use crate::event::EventSink;
use crate::naming::first_free;
use crate::pipeline::Context;
use crate::pipeline::error::{ErrorKind, Result};
use crate::scan::FileDescriptor;
use exn::ResultExt;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// What ended up in the output tree for a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Materialized {
    /// Byte-for-byte copy under the original name.
    Copied(PathBuf),
    /// Converted to a JPEG with the same stem.
    Converted(PathBuf),
    /// The converter reported failure. Already recorded; nothing more to do
    /// for this file.
    ConversionFailed,
}
impl Materialized {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Copied(path) | Self::Converted(path) => Some(path),
            Self::ConversionFailed => None,
        }
    }
}

/// The name `file` takes in the output tree before naming gets to it.
pub(crate) fn materialized_name(file: &FileDescriptor) -> String {
    if file.extension.needs_conversion() {
        format!("{}.jpg", file.stem())
    } else {
        file.filename.clone()
    }
}

/// Copies or converts `file` into `output_dir` under [`materialized_name`].
///
/// Whatever an earlier run left under that name is replaced. A file that
/// this run already produced (listed in `claimed`) is never replaced: the new
/// file gets a numeric suffix instead, and the naming stage accounts for the
/// collision afterwards.
pub(crate) fn materialize(
    ctx: &Context,
    file: &FileDescriptor,
    output_dir: &Path,
    claimed: &HashSet<PathBuf>,
    sink: &EventSink,
) -> Result<Materialized> {
    let (destination, _) = first_free(output_dir, &materialized_name(file), |candidate| claimed.contains(candidate));
    if file.extension.needs_conversion() {
        return match ctx.converter.convert_to_jpeg(&file.absolute_path, &destination) {
            Ok(()) => {
                tracing::info!(from = %file.filename, to = %destination.display(), "Converted to JPEG");
                sink.log(format!("  Converted {} to JPEG: {}", file.extension.as_str().to_uppercase(), file_name(&destination)));
                Ok(Materialized::Converted(destination))
            },
            Err(e) => {
                tracing::warn!(path = %file.absolute_path.display(), error = %e, "Conversion failed");
                ctx.diagnostics.record(&file.absolute_path, Stage::Conversion, e.class(), &e);
                // Don't leave a half-written JPEG behind in the output tree.
                if destination.is_file() {
                    _ = fs::remove_file(&destination);
                }
                sink.log(format!("  Conversion failed (see {})", ctx.diagnostics.path().display()));
                Ok(Materialized::ConversionFailed)
            },
        };
    }
    fs::copy(&file.absolute_path, &destination).or_raise(|| ErrorKind::Copy(destination.clone()))?;
    tracing::info!(from = %file.absolute_path.display(), to = %destination.display(), "Copied to output tree");
    sink.log(format!("  Copied to result: {}", file_name(&destination)));
    Ok(Materialized::Copied(destination))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
