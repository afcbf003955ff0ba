//! Working out which date governs a file from the names of its ancestors.

use crate::consts::DATE_FOLDER_REGEX;
use std::fmt;
use std::path::{Path, PathBuf};
use time::{Date, Month};

/// The `YYYY-MM-DD` prefix of a date folder's name, exactly as written.
///
/// Only the shape is guaranteed: `9999-99-99` is a perfectly good folder date
/// until something needs it as a calendar date, see [`FolderDate::to_date`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderDate {
    year: u16,
    month: u8,
    day: u8,
}
impl FolderDate {
    /// Parses the leading `YYYY-MM-DD` of a directory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let captures = DATE_FOLDER_REGEX.captures(name)?;
        Some(Self {
            year: captures[1].parse().ok()?,
            month: captures[2].parse().ok()?,
            day: captures[3].parse().ok()?,
        })
    }

    /// The calendar date, if the digits describe one.
    pub fn to_date(&self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(i32::from(self.year), month, self.day).ok()
    }
}
impl fmt::Display for FolderDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Identifies a group of files that share synthetic timestamps: the
/// directory that supplied the date, plus the date itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub dir: PathBuf,
    pub date: FolderDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No ancestor directory starts with a date.
    NoDateFolder,
    /// A date may exist, but nothing can store it in this kind of file.
    UnsupportedFormat,
}
impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDateFolder => f.write_str("no date folder found"),
            Self::UnsupportedFormat => f.write_str("format cannot store a capture date"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateResolution {
    Found { ymd: FolderDate, scope: ScopeKey },
    NotFound { reason: Option<NotFoundReason> },
}

/// Finds the nearest ancestor of `path` whose name starts with a date.
///
/// The search starts at the file's parent and stops before the filesystem
/// root. Only names are inspected; nothing on disk is touched.
pub fn resolve(path: &Path) -> DateResolution {
    let Some(parent) = path.parent() else {
        return DateResolution::NotFound { reason: Some(NotFoundReason::NoDateFolder) };
    };
    for dir in parent.ancestors() {
        // `file_name()` is `None` for the root (and for `..`), which ends
        // the search naturally.
        let Some(name) = dir.file_name() else {
            continue;
        };
        if let Some(ymd) = name.to_str().and_then(FolderDate::from_dir_name) {
            let scope = ScopeKey { dir: dir.to_path_buf(), date: ymd };
            return DateResolution::Found { ymd, scope };
        }
    }
    DateResolution::NotFound { reason: Some(NotFoundReason::NoDateFolder) }
}
