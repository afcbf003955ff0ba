//! Streaming content hashes, used to name files that have no usable name.

use crate::consts::HASH_NAME_LENGTH;
use crate::pipeline::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt;
use std::fs::File;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);
impl ContentHash {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// Hashes a file's contents without reading it all into memory.
    pub fn of_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path).or_raise(|| ErrorKind::Hash(path.to_path_buf()))?;
        let mut hasher = blake3::Hasher::new();
        std::io::copy(&mut file, &mut hasher).or_raise(|| ErrorKind::Hash(path.to_path_buf()))?;
        Ok(Self(hasher.finalize()))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// The uppercase prefix that goes into generated filenames.
    pub fn short(&self) -> String {
        self.to_hex()[..HASH_NAME_LENGTH].to_ascii_uppercase()
    }
}
impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        // Larger than any internal buffer, so the streaming path is exercised.
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(ContentHash::of_file(&path).unwrap(), ContentHash::of_bytes(&bytes));
    }

    #[test]
    fn test_short_is_uppercase_prefix() {
        let hash = ContentHash::of_bytes(b"");
        // BLAKE3 of the empty input.
        assert_eq!(hash.to_hex(), "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262");
        assert_eq!(hash.short(), "AF134");
        assert_eq!(hash.to_string(), hash.to_hex());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentHash::of_file(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Hash(_)));
    }
}
