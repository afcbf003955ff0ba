//! Reading and writing the capture date embedded in media files.
//!
//! Each format is served by a [`MetadataBackend`]; the [`MetadataRegistry`]
//! picks one by file extension. A file whose format has no backend simply
//! has no metadata as far as shoebox is concerned.

mod exiftool;
mod video;

pub use self::exiftool::ExiftoolBackend;
pub use self::video::VideoBackend;

use crate::error::Result;
use shoebox_config::ToolsConfig;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use time::{Date, PrimitiveDateTime};

pub trait MetadataBackend: Send + Sync {
    /// The calendar date the file claims it was captured on, if any.
    ///
    /// A file that carries no capture date at all is `Ok(None)`; an error is
    /// reserved for tool failures and values that can't be understood.
    fn read_date(&self, path: &Path) -> Result<Option<Date>>;

    /// Overwrites the capture date stored in the file.
    fn write_date(&self, path: &Path, instant: PrimitiveDateTime) -> Result<()>;
}

/// Metadata backends keyed by lowercase file extension (without the dot).
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    backends: HashMap<String, Arc<dyn MetadataBackend>>,
}
impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used for real runs: ExifTool for JPEG and CR3, the
    /// ffmpeg suite for MP4 and MOV. AVI is registered but always declines.
    pub fn with_defaults(config: &ToolsConfig) -> Self {
        let jpeg: Arc<dyn MetadataBackend> = Arc::new(ExiftoolBackend::jpeg(config));
        let raw: Arc<dyn MetadataBackend> = Arc::new(ExiftoolBackend::raw(config));
        let video: Arc<dyn MetadataBackend> = Arc::new(VideoBackend::new(config));
        Self::new()
            .with("jpg", jpeg.clone())
            .with("jpeg", jpeg)
            .with("cr3", raw)
            .with("mp4", video.clone())
            .with("mov", video.clone())
            .with("avi", video)
    }

    pub fn register(&mut self, extension: &str, backend: Arc<dyn MetadataBackend>) {
        self.backends.insert(extension.to_ascii_lowercase(), backend);
    }

    pub fn with(mut self, extension: &str, backend: Arc<dyn MetadataBackend>) -> Self {
        self.register(extension, backend);
        self
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn MetadataBackend>> {
        self.backends.get(&extension.to_ascii_lowercase())
    }

    pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn MetadataBackend>> {
        self.get(path.extension()?.to_str()?)
    }
}
impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<_> = self.backends.keys().collect();
        extensions.sort();
        f.debug_struct("MetadataRegistry").field("extensions", &extensions).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Never;
    impl MetadataBackend for Never {
        fn read_date(&self, _path: &Path) -> Result<Option<Date>> {
            Ok(None)
        }
        fn write_date(&self, _path: &Path, _instant: PrimitiveDateTime) -> Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case("IMG_1.jpg", true)]
    #[case("IMG_1.JPEG", true)]
    #[case("clip.MOV", true)]
    #[case("clip.avi", true)]
    #[case("raw.Cr3", true)]
    #[case("shot.png", false)]
    #[case("no_extension", false)]
    fn test_default_lookup(#[case] name: &str, #[case] registered: bool) {
        let registry = MetadataRegistry::with_defaults(&ToolsConfig::default());
        assert_eq!(registry.for_path(Path::new(name)).is_some(), registered);
    }

    #[test]
    fn test_register_is_case_insensitive() {
        let mut registry = MetadataRegistry::new();
        registry.register("HEIF", Arc::new(Never));
        assert!(registry.get("heif").is_some());
        assert!(registry.for_path(Path::new("a/b.Heif")).is_some());
        assert!(registry.get("jpg").is_none());
    }
}
