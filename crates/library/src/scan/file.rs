use derive_more::{Display, Error};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The closed set of file types shoebox knows how to handle. Files with any
/// other extension are invisible to every stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    Jpg,
    Jpeg,
    Png,
    Heic,
    Cr3,
    Mp4,
    Mov,
    Avi,
}
impl Extension {
    pub const ALL: [Self; 8] =
        [Self::Jpg, Self::Jpeg, Self::Png, Self::Heic, Self::Cr3, Self::Mp4, Self::Mov, Self::Avi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Heic => "heic",
            Self::Cr3 => "cr3",
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
        }
    }

    /// Formats that get turned into JPEG on the way into the output tree.
    pub fn needs_conversion(&self) -> bool {
        matches!(self, Self::Png | Self::Heic)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}
impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Display, Error)]
#[display("unsupported file extension: {_0}")]
pub struct UnsupportedExtension(#[error(not(source))] String);

impl FromStr for Extension {
    type Err = UnsupportedExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|e| e.as_str() == lower).ok_or(UnsupportedExtension(lower))
    }
}

/// One discovered input file. Never modified once the scanner has built it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    pub absolute_path: PathBuf,
    pub source_root: PathBuf,
    /// Directory containing the file, relative to `source_root` (empty for
    /// files directly in the root).
    pub relative_dir: PathBuf,
    /// Lossily decoded when the name on disk isn't UTF-8; `absolute_path`
    /// always has the real name.
    pub filename: String,
    pub extension: Extension,
}
impl FileDescriptor {
    /// The part of the filename before the final dot.
    pub fn stem(&self) -> &str {
        self.filename.rsplit_once('.').map_or(self.filename.as_str(), |(stem, _)| stem)
    }

    /// The path relative to the source root, for display.
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.filename)
    }
}

/// Puts files into processing order: by directory, then case-insensitively by
/// name, with the exact name breaking ties.
///
/// Timestamp allocation depends on this order, so it has to be total and
/// independent of whatever order the filesystem listed things in.
pub fn sort_files(files: &mut [FileDescriptor]) {
    files.sort_by_cached_key(|f| (f.relative_dir.to_string_lossy().into_owned(), f.filename.to_lowercase(), f.filename.clone()));
}
