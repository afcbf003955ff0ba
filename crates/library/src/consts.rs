use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Directory names that carry a date, e.g. "2026-01-05_trip". Anything may
// follow the date; only the leading shape is checked.
regex!(DATE_FOLDER_REGEX, r"^([0-9]{4})-([0-9]{2})-([0-9]{2})");
// Filenames already in the canonical camera shape: "IMG_1234.jpg", "img_1234ab.JPG".
regex!(PASS_FILENAME_REGEX, r"(?i)^img_[0-9]+[a-z]*\..+$");

/// Time of day every scope's synthetic timestamps start from.
pub(crate) const SCOPE_BASE_HOUR: u8 = 9;
/// Length of the content hash prefix used in generated filenames.
pub(crate) const HASH_NAME_LENGTH: usize = 5;
