use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// =============================================================================
// Release records
// =============================================================================

/// One entry of the product release history.
///
/// `date` is always `YYYY/MM/DD`, which makes lexicographic order equal to
/// chronological order. Every field is present, possibly empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub feature: String,
    #[serde(default)]
    pub description: String,
}

impl ReleaseRecord {
    /// Build a record, defaulting an empty `version` to the release date.
    pub fn new(
        date: impl Into<String>,
        version: impl Into<String>,
        category: impl Into<String>,
        feature: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let date = date.into();
        let mut version = version.into();
        if version.trim().is_empty() {
            version = date.clone();
        }
        Self {
            date,
            version,
            category: category.into(),
            feature: feature.into(),
            description: description.into(),
        }
    }

    /// Lowercased `feature description category`, the text free-text
    /// matching runs against.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.feature, self.description, self.category).to_lowercase()
    }

    /// Whether the feature or description mentions `needle` (case-insensitive).
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.feature.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Immutable snapshot of the whole release history, newest first.
///
/// Cloning a `Corpus` clones the outer `Arc`; records are shared, never copied.
pub type Corpus = Arc<Vec<Arc<ReleaseRecord>>>;

/// Build a corpus snapshot from owned records.
pub fn corpus_from(records: Vec<ReleaseRecord>) -> Corpus {
    Arc::new(records.into_iter().map(Arc::new).collect())
}

/// Anything that can hand out the current corpus snapshot.
pub trait RecordSource: Send + Sync {
    /// Return the full corpus. Two calls with no intervening refresh return
    /// value-equal snapshots.
    fn all_records(&self) -> Result<Corpus>;
}

/// Fixed in-memory corpus, handy for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct StaticRecords(pub Corpus);

impl RecordSource for StaticRecords {
    fn all_records(&self) -> Result<Corpus> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Language
// =============================================================================

/// Conversation language guessed from the user's message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    #[default]
    En,
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::Other => "other",
        }
    }

    pub fn is_spanish(&self) -> bool {
        matches!(self, Language::Es)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
