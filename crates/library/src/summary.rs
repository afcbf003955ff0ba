use std::collections::BTreeMap;
use std::fmt;

/// Every outcome a run keeps count of, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Processed,
    Failed,
    Copied,
    Converted,
    ConversionFailed,
    MetadataChanged,
    MetadataSkippedNoDate,
    MetadataPassed,
    MetadataFailed,
    NamePassed,
    NameUppercased,
    NameHashed,
    NameDuplicateSuffixed,
}
impl Category {
    pub const ALL: [Self; 13] = [
        Self::Processed,
        Self::Failed,
        Self::Copied,
        Self::Converted,
        Self::ConversionFailed,
        Self::MetadataChanged,
        Self::MetadataSkippedNoDate,
        Self::MetadataPassed,
        Self::MetadataFailed,
        Self::NamePassed,
        Self::NameUppercased,
        Self::NameHashed,
        Self::NameDuplicateSuffixed,
    ];

    /// Stable machine-readable name.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Copied => "copied",
            Self::Converted => "converted",
            Self::ConversionFailed => "conversion-failed",
            Self::MetadataChanged => "metadata-changed",
            Self::MetadataSkippedNoDate => "metadata-skipped-no-date",
            Self::MetadataPassed => "metadata-passed",
            Self::MetadataFailed => "metadata-failed",
            Self::NamePassed => "name-passed",
            Self::NameUppercased => "name-uppercased",
            Self::NameHashed => "name-hashed",
            Self::NameDuplicateSuffixed => "name-duplicate-suffixed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed => "Files processed",
            Self::Failed => "Files failed",
            Self::Copied => "Copied as-is",
            Self::Converted => "Converted to JPEG",
            Self::ConversionFailed => "Conversion failed",
            Self::MetadataChanged => "Capture date set from folder",
            Self::MetadataSkippedNoDate => "Capture date skipped (no date)",
            Self::MetadataPassed => "Capture date already correct",
            Self::MetadataFailed => "Capture date update failed",
            Self::NamePassed => "Name already standard",
            Self::NameUppercased => "Name prefix uppercased",
            Self::NameHashed => "Name replaced with hash",
            Self::NameDuplicateSuffixed => "Name suffixed to avoid duplicate",
        }
    }
}
impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Outcome counts for a whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    counts: BTreeMap<Category, u64>,
}
impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: Category) {
        *self.counts.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: Category) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Every category with its count, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// The human-readable end-of-run report.
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = Category::ALL.iter().map(|c| c.label().len()).max().unwrap_or(0);
        writeln!(f, "--- Summary ---")?;
        for (category, count) in self.iter() {
            writeln!(f, "{:<width$}  {count}", category.label())?;
        }
        write!(f, "---------------")
    }
}
