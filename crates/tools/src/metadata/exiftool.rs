use super::MetadataBackend;
use crate::error::{ErrorKind, Result};
use crate::tool::Tool;
use exn::ResultExt;
use shoebox_config::ToolsConfig;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};
use tracing::instrument;

const EXIF_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]:[month]:[day]");
const EXIF_DATETIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");
/// What ExifTool prints when a write actually changed the file.
const UPDATED_CONFIRMATION: &str = "1 image files updated";

/// ExifTool-backed capture dates for still images.
///
/// Every variant reads `DateTimeOriginal`; they differ in which tags get
/// rewritten, since RAW files keep the capture time in several places.
pub struct ExiftoolBackend {
    tool: Tool,
    write_tags: &'static [&'static str],
    probe_timeout: Duration,
    rewrite_timeout: Duration,
}
impl ExiftoolBackend {
    pub fn jpeg(config: &ToolsConfig) -> Self {
        Self::with_tags(config, &["DateTimeOriginal"])
    }

    pub fn raw(config: &ToolsConfig) -> Self {
        Self::with_tags(config, &["DateTimeOriginal", "CreateDate", "ModifyDate"])
    }

    fn with_tags(config: &ToolsConfig, write_tags: &'static [&'static str]) -> Self {
        Self {
            tool: Tool::discover("exiftool", config.exiftool.as_deref(), &["exiftool", "exiftool.exe"]),
            write_tags,
            probe_timeout: config.probe_timeout(),
            rewrite_timeout: config.rewrite_timeout(),
        }
    }
}
impl MetadataBackend for ExiftoolBackend {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn read_date(&self, path: &Path) -> Result<Option<Date>> {
        let args = [OsString::from("-DateTimeOriginal"), OsString::from("-s3"), path.as_os_str().to_owned()];
        let output = self.tool.run(args, self.probe_timeout)?;
        parse_date_time_original(&output.stdout)
    }

    #[instrument(skip_all, fields(path = %path.display(), %instant))]
    fn write_date(&self, path: &Path, instant: PrimitiveDateTime) -> Result<()> {
        let value = instant.format(EXIF_DATETIME).or_raise(|| ErrorKind::Metadata(instant.to_string()))?;
        let mut args: Vec<OsString> = self.write_tags.iter().map(|tag| format!("-{tag}={value}").into()).collect();
        args.push("-overwrite_original".into());
        args.push(path.as_os_str().to_owned());
        let output = self.tool.run(args, self.rewrite_timeout)?;
        if !output.stdout.contains(UPDATED_CONFIRMATION) {
            // Exit code zero, but nothing was written (unknown or read-only
            // format, usually). Treat it like the tool failed.
            exn::bail!(ErrorKind::ToolFailed {
                tool: self.tool.name(),
                code: Some(0),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Parses the value printed by `exiftool -DateTimeOriginal -s3`.
///
/// Only the date half matters. Cameras with an unset clock write all zeroes,
/// which is no date at all rather than malformed data.
fn parse_date_time_original(stdout: &str) -> Result<Option<Date>> {
    let value = stdout.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let date = value.split_whitespace().next().unwrap_or(value);
    if date.chars().all(|c| c == '0' || c == ':') {
        return Ok(None);
    }
    Date::parse(date, EXIF_DATE).map(Some).or_raise(|| ErrorKind::Metadata(value.to_string()))
}
