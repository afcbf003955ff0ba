use super::MetadataBackend;
use crate::error::{ErrorKind, Result};
use crate::tool::Tool;
use exn::{OptionExt, ResultExt};
use serde::Deserialize;
use shoebox_config::ToolsConfig;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::instrument;

const PLAIN_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const CREATION_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Containers whose metadata can't be rewritten without re-encoding.
const READ_ONLY: &[&str] = &["avi"];

#[derive(Debug, Default, Deserialize)]
struct Probe {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Capture dates for video containers, read with `ffprobe` and rewritten by
/// remuxing through `ffmpeg` (streams are copied, never re-encoded).
pub struct VideoBackend {
    ffprobe: Tool,
    ffmpeg: Tool,
    probe_timeout: Duration,
    rewrite_timeout: Duration,
}
impl VideoBackend {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            ffprobe: Tool::discover("ffprobe", config.ffprobe.as_deref(), &["ffprobe"]),
            ffmpeg: Tool::discover("ffmpeg", config.ffmpeg.as_deref(), &["ffmpeg"]),
            probe_timeout: config.probe_timeout(),
            rewrite_timeout: config.rewrite_timeout(),
        }
    }

    fn decline_read_only(path: &Path) -> Result<()> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).unwrap_or_default();
        if READ_ONLY.contains(&extension.as_str()) {
            exn::bail!(ErrorKind::Unsupported(extension));
        }
        Ok(())
    }
}
impl MetadataBackend for VideoBackend {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn read_date(&self, path: &Path) -> Result<Option<Date>> {
        Self::decline_read_only(path)?;
        let args = [
            OsString::from("-v"),
            OsString::from("quiet"),
            OsString::from("-print_format"),
            OsString::from("json"),
            OsString::from("-show_format"),
            path.as_os_str().to_owned(),
        ];
        let output = self.ffprobe.run(args, self.probe_timeout)?;
        parse_probe(&output.stdout)
    }

    #[instrument(skip_all, fields(path = %path.display(), %instant))]
    fn write_date(&self, path: &Path, instant: PrimitiveDateTime) -> Result<()> {
        Self::decline_read_only(path)?;
        let creation_time = instant.format(CREATION_TIME).or_raise(|| ErrorKind::Metadata(instant.to_string()))?;
        let parent = path.parent().ok_or_raise(|| ErrorKind::Io)?;
        let extension = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
        let permissions = fs::metadata(path).or_raise(|| ErrorKind::Io)?.permissions();
        // ffmpeg picks the output container from the extension, so the
        // temporary file has to keep it. It replaces `path`, so it takes on
        // its permissions too.
        let temporary = tempfile::Builder::new()
            .prefix(".shoebox-")
            .suffix(&extension)
            .permissions(permissions)
            .tempfile_in(parent)
            .or_raise(|| ErrorKind::Io)?;
        let args = [
            OsString::from("-i"),
            path.as_os_str().to_owned(),
            OsString::from("-c"),
            OsString::from("copy"),
            OsString::from("-map_metadata"),
            OsString::from("0"),
            OsString::from("-metadata"),
            OsString::from(format!("creation_time={creation_time}")),
            OsString::from("-y"),
            temporary.path().as_os_str().to_owned(),
        ];
        // Dropping `temporary` on any error path removes it.
        self.ffmpeg.run(args, self.rewrite_timeout)?;
        temporary.persist(path).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }
}

/// Extracts the date part of `format.tags.creation_time` from ffprobe's JSON.
fn parse_probe(json: &str) -> Result<Option<Date>> {
    let probe: Probe = serde_json::from_str(json).or_raise(|| ErrorKind::Metadata("ffprobe output".to_string()))?;
    let Some(value) = probe.format.tags.get("creation_time").map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(Some(instant.date()));
    }
    // Some muxers write "YYYY-MM-DD HH:MM:SS" with no zone at all.
    let date = value.get(..10).unwrap_or(value);
    Date::parse(date, PLAIN_DATE).map(Some).or_raise(|| ErrorKind::Metadata(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::{date, datetime};

    #[rstest]
    #[case(r#"{"format": {"tags": {"creation_time": "2023-10-26T10:30:00.000000Z"}}}"#, Some(date!(2023 - 10 - 26)))]
    #[case(r#"{"format": {"tags": {"creation_time": "2021-03-04T23:59:59+09:00"}}}"#, Some(date!(2021 - 03 - 04)))]
    #[case(r#"{"format": {"tags": {"creation_time": "2020-02-29 08:00:00"}}}"#, Some(date!(2020 - 02 - 29)))]
    #[case(r#"{"format": {"tags": {"encoder": "Lavf60.3.100"}}}"#, None)]
    #[case(r#"{"format": {"tags": {"creation_time": ""}}}"#, None)]
    #[case(r#"{"format": {}}"#, None)]
    #[case(r#"{}"#, None)]
    fn test_parse_probe(#[case] json: &str, #[case] expected: Option<Date>) {
        assert_eq!(parse_probe(json).unwrap(), expected);
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"format": {"tags": {"creation_time": "last tuesday"}}}"#)]
    fn test_parse_probe_malformed(#[case] json: &str) {
        let err = parse_probe(json).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Metadata(_)));
    }

    #[test]
    fn test_creation_time_format() {
        let formatted = datetime!(2023-10-26 09:00:03).format(CREATION_TIME).unwrap();
        assert_eq!(formatted, "2023-10-26T09:00:03Z");
    }

    #[rstest]
    #[case("clip.avi")]
    #[case("CLIP.AVI")]
    fn test_avi_declined(#[case] name: &str) {
        let backend = VideoBackend::new(&ToolsConfig::default());
        let err = backend.read_date(Path::new(name)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unsupported(ext) if ext == "avi"));
        let err = backend.write_date(Path::new(name), datetime!(2023-10-26 09:00:00)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unsupported(_)));
    }

    #[test]
    fn test_failed_remux_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"not really a video").unwrap();
        let backend = VideoBackend {
            ffprobe: Tool::new("ffprobe", None),
            ffmpeg: Tool::new("ffmpeg", None),
            probe_timeout: Duration::from_secs(1),
            rewrite_timeout: Duration::from_secs(1),
        };
        let err = backend.write_date(&clip, datetime!(2023-10-26 09:00:00)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound("ffmpeg")));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read(&clip).unwrap(), b"not really a video");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Stands in for ffmpeg: copies the input (`-i <path>`) to the last argument.
        let remux = dir.path().join("remux.sh");
        fs::write(&remux, "#!/bin/sh\nfor last; do :; done\ncp \"$2\" \"$last\"\n").unwrap();
        fs::set_permissions(&remux, fs::Permissions::from_mode(0o755)).unwrap();
        let clip = dir.path().join("clip.mp4");
        fs::write(&clip, b"pretend video").unwrap();
        fs::set_permissions(&clip, fs::Permissions::from_mode(0o640)).unwrap();
        let backend = VideoBackend {
            ffprobe: Tool::new("ffprobe", None),
            ffmpeg: Tool::new("ffmpeg", Some(remux)),
            probe_timeout: Duration::from_secs(5),
            rewrite_timeout: Duration::from_secs(5),
        };

        backend.write_date(&clip, datetime!(2023-10-26 09:00:00)).unwrap();

        assert_eq!(fs::read(&clip).unwrap(), b"pretend video");
        assert_eq!(fs::metadata(&clip).unwrap().permissions().mode() & 0o777, 0o640);
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }
}
