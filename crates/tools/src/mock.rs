//! In-process stand-ins for the external tools, for use in other crates'
//! tests. Nothing here spawns a process.

use crate::convert::ImageConverter;
use crate::error::{ErrorKind, Result};
use crate::metadata::MetadataBackend;
use exn::ResultExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

const MARKER: &[u8] = b"\0SHOEBOX-DATE:";
const STORED: &[BorrowedFormatItem<'static>] = format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Read(PathBuf),
    Write(PathBuf, PrimitiveDateTime),
}

/// A metadata backend that keeps the capture date as a trailer appended to
/// the file itself, so it survives copies and renames like the real thing.
#[derive(Debug, Default)]
pub struct InFileMetadata {
    calls: Mutex<Vec<Call>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    unsupported: AtomicBool,
}
impl InFileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embeds `instant` into a file the way a camera would have.
    pub fn stamp(path: &Path, instant: PrimitiveDateTime) -> std::io::Result<()> {
        let mut bytes = fs::read(path)?;
        strip_trailer(&mut bytes);
        append_trailer(&mut bytes, instant);
        fs::write(path, bytes)
    }

    /// The full instant stored in a file, if any.
    pub fn stored(path: &Path) -> Option<PrimitiveDateTime> {
        let bytes = fs::read(path).ok()?;
        let start = find_trailer(&bytes)? + MARKER.len();
        let value = std::str::from_utf8(&bytes[start..]).ok()?;
        PrimitiveDateTime::parse(value, STORED).ok()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Behave like a backend that declines the format entirely.
    pub fn unsupported(&self, unsupported: bool) {
        self.unsupported.store(unsupported, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn reads(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Read(_))).count()
    }

    pub fn writes(&self) -> Vec<(PathBuf, PrimitiveDateTime)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write(path, instant) => Some((path, instant)),
                Call::Read(_) => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_supported(&self, path: &Path) -> Result<()> {
        if self.unsupported.load(Ordering::SeqCst) {
            let extension = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
            exn::bail!(ErrorKind::Unsupported(extension));
        }
        Ok(())
    }
}
impl MetadataBackend for InFileMetadata {
    fn read_date(&self, path: &Path) -> Result<Option<Date>> {
        self.record(Call::Read(path.to_path_buf()));
        self.check_supported(path)?;
        if self.fail_reads.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::ToolFailed {
                tool: "mock",
                code: Some(1),
                stdout: String::new(),
                stderr: "read refused".to_string(),
            });
        }
        fs::metadata(path).or_raise(|| ErrorKind::Io)?;
        Ok(Self::stored(path).map(|instant| instant.date()))
    }

    fn write_date(&self, path: &Path, instant: PrimitiveDateTime) -> Result<()> {
        self.record(Call::Write(path.to_path_buf(), instant));
        self.check_supported(path)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Timeout { tool: "mock", timeout: std::time::Duration::from_secs(60) });
        }
        Self::stamp(path, instant).or_raise(|| ErrorKind::Io)
    }
}

fn find_trailer(bytes: &[u8]) -> Option<usize> {
    bytes.windows(MARKER.len()).rposition(|window| window == MARKER)
}

fn strip_trailer(bytes: &mut Vec<u8>) {
    if let Some(position) = find_trailer(bytes) {
        bytes.truncate(position);
    }
}

fn append_trailer(bytes: &mut Vec<u8>, instant: PrimitiveDateTime) {
    bytes.extend_from_slice(MARKER);
    // Formatting a PrimitiveDateTime with a fixed description can't fail.
    if let Ok(value) = instant.format(STORED) {
        bytes.extend_from_slice(value.as_bytes());
    }
}

/// A converter that "converts" by copying bytes, or fails on demand.
#[derive(Debug, Default)]
pub struct CopyConverter {
    fail: AtomicBool,
    conversions: Mutex<Vec<PathBuf>>,
}
impl CopyConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let converter = Self::default();
        converter.fail.store(true, Ordering::SeqCst);
        converter
    }

    /// Sources passed to [`ImageConverter::convert_to_jpeg`], in call order.
    pub fn conversions(&self) -> Vec<PathBuf> {
        self.conversions.lock().map(|c| c.clone()).unwrap_or_default()
    }
}
impl ImageConverter for CopyConverter {
    fn convert_to_jpeg(&self, source: &Path, destination: &Path) -> Result<()> {
        if let Ok(mut conversions) = self.conversions.lock() {
            conversions.push(source.to_path_buf());
        }
        if self.fail.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Conversion);
        }
        let mut output = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(destination)
            .or_raise(|| ErrorKind::Io)?;
        output.write_all(&fs::read(source).or_raise(|| ErrorKind::Io)?).or_raise(|| ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn test_in_file_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0001.JPG");
        fs::write(&path, b"jpeg bytes").unwrap();
        let backend = InFileMetadata::new();

        assert_eq!(backend.read_date(&path).unwrap(), None);
        backend.write_date(&path, datetime!(2023-10-26 09:00:00)).unwrap();
        backend.write_date(&path, datetime!(2024-01-02 09:00:01)).unwrap();
        assert_eq!(backend.read_date(&path).unwrap(), Some(date!(2024 - 01 - 02)));
        assert_eq!(InFileMetadata::stored(&path), Some(datetime!(2024-01-02 09:00:01)));
        assert!(fs::read(&path).unwrap().starts_with(b"jpeg bytes\0SHOEBOX-DATE:"));
        assert_eq!(backend.reads(), 2);
        assert_eq!(backend.writes().len(), 2);
    }

    #[test]
    fn test_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        fs::write(&path, b"riff").unwrap();
        let backend = InFileMetadata::new();
        backend.unsupported(true);
        assert!(matches!(&*backend.read_date(&path).unwrap_err(), ErrorKind::Unsupported(ext) if ext == "avi"));
        backend.unsupported(false);
        backend.fail_writes(true);
        let err = backend.write_date(&path, datetime!(2023-10-26 09:00:00)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"riff");
    }

    #[test]
    fn test_copy_converter() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, b"png").unwrap();
        CopyConverter::new().convert_to_jpeg(&source, &dir.path().join("a.jpg")).unwrap();
        assert_eq!(fs::read(dir.path().join("a.jpg")).unwrap(), b"png");
        let failing = CopyConverter::failing();
        assert!(failing.convert_to_jpeg(&source, &dir.path().join("b.jpg")).is_err());
        assert_eq!(failing.conversions(), vec![source]);
    }
}
