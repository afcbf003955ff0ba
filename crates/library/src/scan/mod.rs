//! Discovery of supported media files under a source root.
//!
//! [`scan`] returns files in whatever order the filesystem produced them;
//! call [`sort_files`] before processing.

pub mod error;
mod file;

pub use self::file::{Extension, FileDescriptor, UnsupportedExtension, sort_files};
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};

enum WalkEntry {
    File(FileDescriptor),
    Descend(PathBuf),
    Skip,
}

/// Recursively lists every file under `root` with a supported extension.
///
/// The directory `root/<skip_dir>` (the output tree) is never entered, so a
/// second run over the same root does not pick up its own results. Symbolic
/// links to files are followed; symbolic links to directories are not.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn scan(root: &Path, skip_dir: &str) -> Result<Vec<FileDescriptor>> {
    let root = std::path::absolute(root).or_raise(|| ErrorKind::NotADirectory(root.to_path_buf()))?;
    if !root.is_dir() {
        exn::bail!(ErrorKind::NotADirectory(root));
    }
    let skip = root.join(skip_dir);
    let mut files = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(current) = stack.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if current == root => return Err(e).or_raise(|| ErrorKind::ReadDir(root.clone())),
            Err(e) => {
                tracing::warn!(path = %current.display(), error = %e, "Could not read directory; skipping");
                continue;
            },
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "Could not read directory entry; skipping");
                    continue;
                },
            };
            match process_entry(&root, &skip, entry) {
                WalkEntry::File(file) => files.push(file),
                WalkEntry::Descend(dir) => stack.push(dir),
                WalkEntry::Skip => {},
            }
        }
    }
    tracing::debug!(count = files.len(), "Scan complete");
    Ok(files)
}

fn process_entry(root: &Path, skip: &Path, entry: DirEntry) -> WalkEntry {
    let path = entry.path();
    let Ok(file_type) = entry.file_type() else {
        tracing::warn!(path = %path.display(), "Could not determine file type; skipping");
        return WalkEntry::Skip;
    };
    if file_type.is_dir() {
        return if path == skip { WalkEntry::Skip } else { WalkEntry::Descend(path) };
    }
    // Extensions are cheap to check, so rule out unsupported files before
    // touching the filesystem again to resolve symbolic links.
    let Some(extension) = Extension::from_path(&path) else {
        return WalkEntry::Skip;
    };
    if file_type.is_symlink() {
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {},
            Ok(_) => return WalkEntry::Skip,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Broken symbolic link; skipping");
                return WalkEntry::Skip;
            },
        }
    } else if !file_type.is_file() {
        return WalkEntry::Skip;
    }
    // Kept even when the name isn't UTF-8, so the run reports it as a
    // failure instead of losing it.
    let filename = entry.file_name().to_string_lossy().into_owned();
    let relative_dir = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    WalkEntry::File(FileDescriptor {
        absolute_path: path,
        source_root: root.to_path_buf(),
        relative_dir,
        filename,
        extension,
    })
}
