//! The batch pipeline: scan, sort, then process every file in turn.
//!
//! Each file goes through the same stages:
//!
//! 1. **Resolve** the governing date from its ancestor directories.
//! 2. **Materialize** it into the output tree (copy, or convert to JPEG).
//! 3. **Correct** the capture date stored in the output file.
//! 4. **Hash** the output file and **standardize** its name.
//!
//! Stages 1 and 3 never fail a file; their problems are recorded and the
//! file moves on. A failed conversion ends the file's processing without
//! counting as a failure. Anything else that goes wrong is caught at the
//! per-file boundary, recorded, and counted as `failed`; the run always
//! carries on with the next file.

pub mod error;
mod materialize;
mod metadata;

pub use self::materialize::Materialized;
pub use self::metadata::MetadataOutcome;
use crate::date::{self, DateResolution};
use crate::diagnostics::Diagnostics;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::event::EventSink;
use crate::hash::ContentHash;
use crate::naming::{self, NameAction};
use crate::pipeline::error::{ErrorKind, Result};
use crate::pipeline::materialize::{file_name, materialized_name};
use crate::scan::{self, FileDescriptor};
use crate::scope::ScopeOffsetTable;
use crate::summary::{Category, Summary};
use exn::ResultExt;
use shoebox_config::Config;
use shoebox_tools::{ImageConverter, JpegConverter, MetadataRegistry};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Everything a run needs besides the files themselves.
pub struct Context {
    pub converter: Arc<dyn ImageConverter>,
    pub metadata: MetadataRegistry,
    pub diagnostics: Diagnostics,
    /// Name of the output directory created directly under the source root.
    pub result_dir: String,
}
impl Context {
    /// The production wiring: real external tools, located per `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            converter: Arc::new(JpegConverter::new(&config.tools)),
            metadata: MetadataRegistry::with_defaults(&config.tools),
            diagnostics: Diagnostics::new(&config.error_log),
            result_dir: config.result_dir.clone(),
        }
    }
}

/// Normalizes every supported file under `source_root` into
/// `source_root/<result_dir>`, reporting along the way through `sink`.
///
/// Returns the run's [`Summary`]. The only error is a source root that can't
/// be scanned at all; even then, [`Event::Done`](crate::Event::Done) is still
/// emitted.
pub fn run(ctx: &Context, source_root: &Path, sink: &EventSink) -> LibraryResult<Summary> {
    let mut files = match scan::scan(source_root, &ctx.result_dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(root = %source_root.display(), error = ?e, "Could not scan source directory");
            sink.log(format!("Could not scan {}: {e}", source_root.display()));
            sink.done("Nothing was processed.");
            return Err(e).or_raise(|| LibraryErrorKind::Scan);
        },
    };
    let total = files.len();
    tracing::info!(root = %source_root.display(), total, "Scan complete");
    sink.log(format!("Found {total} files to process."));
    scan::sort_files(&mut files);
    sink.log("Sorted files into processing order.");

    let mut offsets = ScopeOffsetTable::new();
    let mut claimed = HashSet::new();
    let mut summary = Summary::new();
    for (index, file) in files.iter().enumerate() {
        let position = index + 1;
        sink.log(format!("[{position}/{total}] Processing {}", file.relative_path().display()));
        match process_file(ctx, file, &mut offsets, &mut claimed, &mut summary, sink) {
            Ok(()) => summary.record(Category::Processed),
            Err(e) => {
                tracing::error!(path = %file.absolute_path.display(), error = ?e, "Failed to process file");
                ctx.diagnostics.record(&file.absolute_path, e.stage(), e.class(), &e);
                sink.log(format!("  Failed: {e} (see {})", ctx.diagnostics.path().display()));
                summary.record(Category::Failed);
            },
        }
        sink.progress(position, total);
    }

    tracing::info!(
        processed = summary.get(Category::Processed),
        failed = summary.get(Category::Failed),
        "Run complete"
    );
    sink.log(summary.to_string());
    sink.done("All files processed.");
    Ok(summary)
}

/// Runs a single file through every stage, recording outcomes in `summary`.
///
/// Returns an error only for failures that end the file's processing early.
#[instrument(skip_all, fields(path = %file.relative_path().display()))]
pub(crate) fn process_file(
    ctx: &Context,
    file: &FileDescriptor,
    offsets: &mut ScopeOffsetTable,
    claimed: &mut HashSet<PathBuf>,
    summary: &mut Summary,
    sink: &EventSink,
) -> Result<()> {
    if file.absolute_path.file_name().and_then(|name| name.to_str()).is_none() {
        exn::bail!(ErrorKind::InvalidName(file.absolute_path.clone()));
    }
    let resolution = date::resolve(&file.absolute_path);
    match &resolution {
        DateResolution::Found { ymd, scope } => {
            sink.log(format!("  Date folder found: {ymd} (scope: {})", scope.dir.display()));
        },
        DateResolution::NotFound { .. } => sink.log("  No date folder found; capture date will be left alone."),
    }

    let output_dir = file.source_root.join(&ctx.result_dir).join(&file.relative_dir);
    fs::create_dir_all(&output_dir).or_raise(|| ErrorKind::CreateDir(output_dir.clone()))?;

    let materialized = materialize::materialize(ctx, file, &output_dir, claimed, sink)?;
    summary.record(match &materialized {
        Materialized::Copied(_) => Category::Copied,
        Materialized::Converted(_) => Category::Converted,
        Materialized::ConversionFailed => Category::ConversionFailed,
    });
    let Some(path) = materialized.path() else {
        return Ok(());
    };
    claimed.insert(path.to_path_buf());

    summary.record(match metadata::correct(ctx, path, &resolution, offsets, sink) {
        MetadataOutcome::Skipped(_) => Category::MetadataSkippedNoDate,
        MetadataOutcome::Passed => Category::MetadataPassed,
        MetadataOutcome::Changed(_) => Category::MetadataChanged,
        MetadataOutcome::Failed(_) => Category::MetadataFailed,
    });

    // Hashed after the metadata stage: the name reflects the final bytes.
    let hash = ContentHash::of_file(path)?;
    let standardized = naming::standardize(path, &materialized_name(file), &hash, |candidate| claimed.contains(candidate))?;
    if standardized.renamed(path) {
        claimed.remove(path);
        claimed.insert(standardized.path.clone());
    }
    summary.record(match standardized.action {
        NameAction::Passed => Category::NamePassed,
        NameAction::Uppercased => Category::NameUppercased,
        NameAction::Hashed => Category::NameHashed,
    });
    if standardized.duplicate_suffixed {
        summary.record(Category::NameDuplicateSuffixed);
    }

    let (from, to) = (file_name(path), file_name(&standardized.path));
    let note = if standardized.duplicate_suffixed { " (suffixed to avoid a duplicate)" } else { "" };
    match standardized.action {
        _ if !standardized.renamed(path) => sink.log(format!("  Name kept: {from}")),
        NameAction::Hashed => sink.log(format!("  Name replaced with hash: {from} -> {to}{note}")),
        NameAction::Passed | NameAction::Uppercased => sink.log(format!("  Name standardized: {from} -> {to}{note}")),
    }
    Ok(())
}
