use crate::date::{DateResolution, NotFoundReason};
use crate::diagnostics::Stage;
use crate::event::EventSink;
use crate::pipeline::Context;
use crate::pipeline::materialize::file_name;
use crate::scope::ScopeOffsetTable;
use shoebox_tools::ErrorClass;
use shoebox_tools::error::ErrorKind as ToolErrorKind;
use std::path::Path;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DISPLAY_INSTANT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// The outcome of correcting one file's capture date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Nothing to correct to, or nothing to correct with.
    Skipped(NotFoundReason),
    /// The file already carries its scope's date.
    Passed,
    /// The capture date was rewritten to this instant.
    Changed(PrimitiveDateTime),
    /// Reading or writing failed at the given stage. Already recorded in the
    /// diagnostics log.
    Failed(Stage),
}

/// Brings the capture date of the materialized file at `path` in line with
/// the date its source folder implies.
///
/// Failures are recorded and returned as [`MetadataOutcome::Failed`]; they
/// never stop the rest of the file's processing.
pub(crate) fn correct(
    ctx: &Context,
    path: &Path,
    resolution: &DateResolution,
    offsets: &mut ScopeOffsetTable,
    sink: &EventSink,
) -> MetadataOutcome {
    let name = file_name(path);
    let (ymd, scope) = match resolution {
        DateResolution::Found { ymd, scope } => (ymd, scope),
        DateResolution::NotFound { reason } => {
            let reason = reason.unwrap_or(NotFoundReason::NoDateFolder);
            return skipped(sink, &name, reason);
        },
    };
    let Some(backend) = ctx.metadata.for_path(path) else {
        return skipped(sink, &name, NotFoundReason::UnsupportedFormat);
    };
    let Some(target) = ymd.to_date().and_then(|date| offsets.target_instant(scope, date)) else {
        let message = format!("folder date {ymd} is not a valid calendar date");
        tracing::warn!(path = %path.display(), %ymd, "Folder date is not a calendar date");
        ctx.diagnostics.record(path, Stage::MetadataWrite, ErrorClass::Metadata, message.as_str());
        sink.log(format!("  Capture date update failed: {message} ({name})"));
        return MetadataOutcome::Failed(Stage::MetadataWrite);
    };

    match backend.read_date(path) {
        Ok(Some(current)) if current == target.date() => {
            tracing::info!(path = %path.display(), %current, "Capture date already correct");
            sink.log(format!("  Capture date already matches ({name})"));
            return MetadataOutcome::Passed;
        },
        Ok(current) => {
            tracing::debug!(path = %path.display(), ?current, %target, "Capture date needs correcting");
        },
        Err(e) if matches!(&*e, ToolErrorKind::Unsupported(_)) => {
            return skipped(sink, &name, NotFoundReason::UnsupportedFormat);
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read capture date");
            ctx.diagnostics.record(path, Stage::MetadataRead, e.class(), &e);
            sink.log(format!("  Capture date read failed, see error log ({name})"));
            return MetadataOutcome::Failed(Stage::MetadataRead);
        },
    }

    match backend.write_date(path, target) {
        Ok(()) => {
            offsets.advance(scope);
            tracing::info!(path = %path.display(), %target, "Capture date set from folder");
            let shown = target.format(DISPLAY_INSTANT).unwrap_or_else(|_| target.to_string());
            sink.log(format!("  Capture date set to {shown} ({name})"));
            MetadataOutcome::Changed(target)
        },
        Err(e) if matches!(&*e, ToolErrorKind::Unsupported(_)) => skipped(sink, &name, NotFoundReason::UnsupportedFormat),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not write capture date");
            ctx.diagnostics.record(path, Stage::MetadataWrite, e.class(), &e);
            sink.log(format!("  Capture date update failed, see error log ({name})"));
            MetadataOutcome::Failed(Stage::MetadataWrite)
        },
    }
}

fn skipped(sink: &EventSink, name: &str, reason: NotFoundReason) -> MetadataOutcome {
    tracing::info!(file = name, %reason, "Capture date skipped");
    sink.log(format!("  Capture date skipped: {reason} ({name})"));
    MetadataOutcome::Skipped(reason)
}
