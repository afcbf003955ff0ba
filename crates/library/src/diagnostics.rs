//! The append-only error log written alongside a run.

use shoebox_tools::ErrorClass;
use std::fmt::{self, Debug, Display, Write as _};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SEPARATOR: &str = "--------------------------------------------------";

/// Where in the per-file pipeline a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Conversion,
    MetadataRead,
    MetadataWrite,
    FileCopy,
    MainPipeline,
    Naming,
}
impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversion => "CONVERSION",
            Self::MetadataRead => "METADATA_READ",
            Self::MetadataWrite => "METADATA_WRITE",
            Self::FileCopy => "FILE_COPY",
            Self::MainPipeline => "MAIN_PIPELINE",
            Self::Naming => "NAMING",
        }
    }
}
impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appends one block per failure to a log file.
///
/// Nothing is created on disk until the first failure is recorded, so a clean
/// run leaves no trace.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    path: PathBuf,
}
impl Diagnostics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a failure. The `Debug` form of `error` (the full error tree,
    /// for `exn` errors) goes in as the trace.
    ///
    /// Failing to write the log is reported through `tracing` and otherwise
    /// ignored; it never affects the run.
    pub fn record<E: Display + Debug + ?Sized>(&self, file: &Path, stage: Stage, class: ErrorClass, error: &E) {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let block = format_record(now, file, stage, class, error);
        if let Err(e) = self.append(&block) {
            tracing::error!(log = %self.path.display(), file = %file.display(), error = %e, "Could not write to diagnostics log");
        }
    }

    fn append(&self, block: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(block.as_bytes())
    }
}

fn format_record<E: Display + Debug + ?Sized>(
    now: OffsetDateTime,
    file: &Path,
    stage: Stage,
    class: ErrorClass,
    error: &E,
) -> String {
    let timestamp = now.format(TIMESTAMP).unwrap_or_else(|_| now.to_string());
    let mut block = String::new();
    // Writing into a String can't fail.
    _ = writeln!(block, "[{timestamp}] File: {}", file.display());
    _ = writeln!(block, "  Stage: {stage}");
    _ = writeln!(block, "  Kind: {class}");
    _ = writeln!(block, "  Message: {error}");
    _ = writeln!(block, "  Trace:");
    for line in format!("{error:?}").lines() {
        _ = writeln!(block, "    {line}");
    }
    _ = writeln!(block, "{SEPARATOR}");
    _ = writeln!(block);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shoebox_tools::error::ErrorKind as ToolErrorKind;
    use time::macros::datetime;

    #[rstest]
    #[case(Stage::Conversion, "CONVERSION")]
    #[case(Stage::MetadataRead, "METADATA_READ")]
    #[case(Stage::MetadataWrite, "METADATA_WRITE")]
    #[case(Stage::FileCopy, "FILE_COPY")]
    #[case(Stage::MainPipeline, "MAIN_PIPELINE")]
    #[case(Stage::Naming, "NAMING")]
    fn test_stage_tags(#[case] stage: Stage, #[case] tag: &str) {
        assert_eq!(stage.to_string(), tag);
    }

    #[test]
    fn test_record_format() {
        let error: shoebox_tools::error::Error = exn::Exn::from(ToolErrorKind::ToolNotFound("exiftool"));
        let block = format_record(
            datetime!(2026-01-05 09:00:00).assume_utc(),
            Path::new("/photos/result/IMG_0001.jpg"),
            Stage::MetadataRead,
            ErrorClass::ToolExecution,
            &error,
        );
        let lines: Vec<_> = block.lines().collect();
        assert_eq!(lines[0], "[2026-01-05 09:00:00] File: /photos/result/IMG_0001.jpg");
        assert_eq!(lines[1], "  Stage: METADATA_READ");
        assert_eq!(lines[2], "  Kind: TOOL_EXECUTION");
        assert_eq!(lines[3], "  Message: exiftool not found on this system");
        assert_eq!(lines[4], "  Trace:");
        assert!(lines[5].starts_with("    ") && lines[5].contains("exiftool not found"));
        assert!(block.ends_with(&format!("{SEPARATOR}\n\n")));
    }

    #[test]
    fn test_created_lazily_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("error.log");
        let diagnostics = Diagnostics::new(&path);
        assert!(!path.exists());
        assert!(!dir.path().join("logs").exists());

        diagnostics.record(Path::new("a.jpg"), Stage::FileCopy, ErrorClass::FileOperation, "disk full");
        diagnostics.record(Path::new("b.jpg"), Stage::Naming, ErrorClass::FileOperation, "permission denied");
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches(SEPARATOR).count(), 2);
        assert!(contents.find("File: a.jpg").unwrap() < contents.find("File: b.jpg").unwrap());
        assert!(contents.contains("  Stage: NAMING"));
    }

    #[test]
    fn test_unwritable_log_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, b"a file where a directory should be").unwrap();
        let diagnostics = Diagnostics::new(blocker.join("error.log"));
        diagnostics.record(Path::new("a.jpg"), Stage::MainPipeline, ErrorClass::FileOperation, "oops");
        assert!(blocker.is_file());
    }
}
