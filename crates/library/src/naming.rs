//! Filename standardization: every output file ends up as `IMG_<something>`.

use crate::consts::PASS_FILENAME_REGEX;
use crate::hash::ContentHash;
use crate::pipeline::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};

const CANONICAL_PREFIX: &str = "IMG_";

/// How the name of a file was standardized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameAction {
    /// Already `IMG_<digits>[letters].<ext>`; left alone.
    Passed,
    /// The right shape, but with a lowercase (or mixed case) `img_` prefix.
    Uppercased,
    /// Renamed after the content hash.
    Hashed,
}

/// The outcome of [`standardize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standardized {
    pub path: PathBuf,
    pub action: NameAction,
    /// The preferred name was taken by another file, so a numeric suffix was
    /// appended.
    pub duplicate_suffixed: bool,
}
impl Standardized {
    pub fn renamed(&self, from: &Path) -> bool {
        self.path != from
    }
}

/// Whether a filename is already in the canonical camera shape.
pub fn is_pass(filename: &str) -> bool {
    PASS_FILENAME_REGEX.is_match(filename)
}

/// The name a file should have, before collisions are taken into account.
pub fn preferred_name(filename: &str, hash: &ContentHash) -> (String, NameAction) {
    if is_pass(filename) {
        return match filename.get(..CANONICAL_PREFIX.len()) {
            Some(CANONICAL_PREFIX) => (filename.to_string(), NameAction::Passed),
            _ => {
                let rest = filename.get(CANONICAL_PREFIX.len()..).unwrap_or_default();
                (format!("{CANONICAL_PREFIX}{rest}"), NameAction::Uppercased)
            },
        };
    }
    let (_, extension) = split_extension(filename);
    (format!("{CANONICAL_PREFIX}{}{extension}", hash.short()), NameAction::Hashed)
}

/// Renames `path` (within its own directory) to the standardized form of
/// `name`, the name the file was materialized under.
///
/// When the preferred name already belongs to a different file, a number is
/// appended to the stem (`IMG_ABCDE1.jpg`, `IMG_ABCDE2.jpg`, ...) until a free
/// name turns up. A file that already has its final name is not touched.
///
/// An occupant with exactly the same content is a leftover from an earlier
/// run and gets replaced, unless `keep` says it was produced by this one.
#[tracing::instrument(skip_all, fields(path = %path.display(), name = %name))]
pub fn standardize(path: &Path, name: &str, hash: &ContentHash, keep: impl Fn(&Path) -> bool) -> Result<Standardized> {
    let dir = path
        .parent()
        .ok_or_raise(|| ErrorKind::Rename { from: path.to_path_buf(), to: path.to_path_buf() })?;
    let (preferred, action) = preferred_name(name, hash);
    let (target, suffix) = first_free(dir, &preferred, |candidate| {
        occupied_by_other(path, candidate) && (keep(candidate) || !holds_same_content(candidate, hash))
    });
    let duplicate_suffixed = suffix > 0;
    if duplicate_suffixed {
        tracing::debug!(preferred = %preferred, suffix, "Preferred name taken by another file");
    } else if target != path && target.exists() {
        tracing::debug!(target = %target.display(), "Replacing identical output left by an earlier run");
    }

    if target != path {
        fs::rename(path, &target).or_raise(|| ErrorKind::Rename { from: path.to_path_buf(), to: target.clone() })?;
    }
    Ok(Standardized { path: target, action, duplicate_suffixed })
}

fn holds_same_content(candidate: &Path, hash: &ContentHash) -> bool {
    ContentHash::of_file(candidate).is_ok_and(|existing| existing == *hash)
}

/// Finds the first of `name`, `{stem}1{ext}`, `{stem}2{ext}`, ... in `dir`
/// that isn't `occupied`, along with the suffix used (zero for none).
pub(crate) fn first_free(dir: &Path, name: &str, occupied: impl Fn(&Path) -> bool) -> (PathBuf, u32) {
    let (stem, extension) = split_extension(name);
    let mut candidate = dir.join(name);
    let mut suffix = 0u32;
    while occupied(&candidate) {
        suffix += 1;
        candidate = dir.join(format!("{stem}{suffix}{extension}"));
    }
    (candidate, suffix)
}

/// `("IMG_ABCDE", ".jpg")`; a name with no dot has an empty extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(0) | None => (filename, ""),
        Some(i) => filename.split_at(i),
    }
}

/// Whether `target` exists and is a different file than `current`.
///
/// On case-insensitive filesystems `IMG_0001.jpg` "exists" while renaming
/// `img_0001.jpg`, but it's the same file and must not be suffixed.
fn occupied_by_other(current: &Path, target: &Path) -> bool {
    if target == current {
        return false;
    }
    match fs::symlink_metadata(target) {
        Ok(_) => !same_file(current, target),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A hash whose short form is `ABCDE`, whatever the file contents.
    fn abcde() -> ContentHash {
        let mut bytes = [0u8; 32];
        bytes[..3].copy_from_slice(&[0xab, 0xcd, 0xef]);
        ContentHash::from(blake3::Hash::from_bytes(bytes))
    }

    fn in_place(path: &Path) -> Result<Standardized> {
        let name = path.file_name().unwrap().to_str().unwrap();
        standardize(path, name, &abcde(), |_| false)
    }

    #[rstest]
    #[case("IMG_1234.jpg", true)]
    #[case("img_1234.jpg", true)]
    #[case("img_1234ab.JPG", true)]
    #[case("IMG_1.cr3", true)]
    #[case("Img_0001.tar.mov", true)]
    #[case("DSC_0001.jpg", false)]
    #[case("photo.png", false)]
    #[case("IMG-1234.jpg", false)]
    #[case("IMG_.jpg", false)]
    #[case("IMG_1234", false)]
    #[case("IMG_1234.", false)]
    #[case("IMG_12_34.jpg", false)]
    #[case("IMG_ABCDE.jpg", false)]
    fn test_is_pass(#[case] filename: &str, #[case] expected: bool) {
        assert_eq!(is_pass(filename), expected);
    }

    #[rstest]
    #[case("IMG_1234.jpg", "IMG_1234.jpg", NameAction::Passed)]
    #[case("img_1234a.jpg", "IMG_1234a.jpg", NameAction::Uppercased)]
    #[case("iMg_1.MOV", "IMG_1.MOV", NameAction::Uppercased)]
    #[case("DSC0001.jpg", "IMG_ABCDE.jpg", NameAction::Hashed)]
    #[case("holiday.JPEG", "IMG_ABCDE.JPEG", NameAction::Hashed)]
    #[case("no_extension", "IMG_ABCDE", NameAction::Hashed)]
    fn test_preferred_name(#[case] filename: &str, #[case] expected: &str, #[case] action: NameAction) {
        assert_eq!(preferred_name(filename, &abcde()), (expected.to_string(), action));
    }

    #[test]
    fn test_hash_name_from_hex_prefix() {
        assert_eq!(abcde().to_hex().get(..8), Some("abcdef00"));
        assert_eq!(abcde().short(), "ABCDE");
    }

    #[test]
    fn test_standardize_passed_is_not_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_1234.jpg");
        fs::write(&path, b"a").unwrap();
        let result = in_place(&path).unwrap();
        assert_eq!(result, Standardized { path: path.clone(), action: NameAction::Passed, duplicate_suffixed: false });
        assert!(!result.renamed(&path));
        assert!(path.exists());
    }

    #[test]
    fn test_standardize_uppercases_prefix_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_1234a.jpg");
        fs::write(&path, b"a").unwrap();
        let result = in_place(&path).unwrap();
        assert_eq!(result.path, dir.path().join("IMG_1234a.jpg"));
        assert_eq!(result.action, NameAction::Uppercased);
        assert!(!result.duplicate_suffixed);
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec!["IMG_1234a.jpg"]);
    }

    #[test]
    fn test_standardize_collisions_count_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG_ABCDE.jpg"), b"first").unwrap();
        let second = dir.path().join("DSC0002.jpg");
        fs::write(&second, b"second").unwrap();
        let third = dir.path().join("DSC0003.jpg");
        fs::write(&third, b"third").unwrap();

        let result = in_place(&second).unwrap();
        assert_eq!(result.path, dir.path().join("IMG_ABCDE1.jpg"));
        assert_eq!(result.action, NameAction::Hashed);
        assert!(result.duplicate_suffixed);

        let result = in_place(&third).unwrap();
        assert_eq!(result.path, dir.path().join("IMG_ABCDE2.jpg"));
        assert!(result.duplicate_suffixed);

        assert_eq!(fs::read(dir.path().join("IMG_ABCDE.jpg")).unwrap(), b"first");
        assert_eq!(fs::read(dir.path().join("IMG_ABCDE1.jpg")).unwrap(), b"second");
        assert_eq!(fs::read(dir.path().join("IMG_ABCDE2.jpg")).unwrap(), b"third");
    }

    #[test]
    fn test_standardize_already_hash_named_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_ABCDE.jpg");
        fs::write(&path, b"a").unwrap();
        let result = in_place(&path).unwrap();
        assert_eq!(result.path, path);
        assert_eq!(result.action, NameAction::Hashed);
        assert!(!result.duplicate_suffixed);
    }

    #[test]
    fn test_standardize_uppercase_collision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_0001.jpg");
        fs::write(&path, b"lower").unwrap();
        let upper = dir.path().join("IMG_0001.jpg");
        if upper.exists() {
            // Case-insensitive filesystem: both names are the same file.
            let result = in_place(&path).unwrap();
            assert!(!result.duplicate_suffixed);
            return;
        }
        fs::write(&upper, b"upper").unwrap();
        let result = in_place(&path).unwrap();
        assert_eq!(result.path, dir.path().join("IMG_00011.jpg"));
        assert_eq!(result.action, NameAction::Uppercased);
        assert!(result.duplicate_suffixed);
    }

    #[test]
    fn test_stale_identical_output_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let hash = ContentHash::of_bytes(b"same");
        let stale = dir.path().join(format!("IMG_{}.jpg", hash.short()));
        fs::write(&stale, b"same").unwrap();
        let path = dir.path().join("DSC0001.jpg");
        fs::write(&path, b"same").unwrap();

        let result = standardize(&path, "DSC0001.jpg", &hash, |_| false).unwrap();
        assert_eq!(result.path, stale);
        assert!(!result.duplicate_suffixed);
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_kept_identical_output_is_suffixed() {
        let dir = tempfile::tempdir().unwrap();
        let hash = ContentHash::of_bytes(b"same");
        let kept = dir.path().join(format!("IMG_{}.jpg", hash.short()));
        fs::write(&kept, b"same").unwrap();
        let path = dir.path().join("DSC0002.jpg");
        fs::write(&path, b"same").unwrap();

        let result = standardize(&path, "DSC0002.jpg", &hash, |candidate| candidate == kept).unwrap();
        assert_eq!(result.path, dir.path().join(format!("IMG_{}1.jpg", hash.short())));
        assert!(result.duplicate_suffixed);
        assert!(kept.exists());
    }

    #[test]
    fn test_materialized_under_suffixed_name() {
        // `IMG_0001.png` converted next to an `IMG_0001.jpg` from the same run
        // lands on `IMG_00011.jpg`, but is still named after `IMG_0001.jpg`.
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("IMG_0001.jpg");
        fs::write(&kept, b"copied").unwrap();
        let path = dir.path().join("IMG_00011.jpg");
        fs::write(&path, b"converted").unwrap();

        let result = standardize(&path, "IMG_0001.jpg", &abcde(), |candidate| candidate == kept).unwrap();
        assert_eq!(result, Standardized { path: path.clone(), action: NameAction::Passed, duplicate_suffixed: true });
        assert!(!result.renamed(&path));
    }
}
