use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use releasebot_core::{
    corpus_from, Corpus, RecordSource, ReleaseRecord, ReleasebotConfig, ReleasebotError, Result,
};
use tracing::{info, warn};

use crate::cache::CacheFile;
use crate::loader::read_csv;

struct Snapshot {
    loaded_at: DateTime<Utc>,
    corpus: Corpus,
}

/// Owns the release corpus and hands out immutable snapshots of it.
///
/// Load order: in-memory snapshot while fresh, then the JSON cache while
/// fresh, then the CSV (which rewrites the cache). Snapshots are sorted by
/// date, newest first, keeping file order for equal dates.
pub struct RecordStore {
    csv_path: PathBuf,
    cache_path: PathBuf,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl RecordStore {
    pub fn new(csv_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            csv_path: csv_path.into(),
            cache_path: cache_path.into(),
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// Resolve file locations against `general.data_dir`.
    pub fn from_config(config: &ReleasebotConfig) -> Self {
        let data_dir = Path::new(&config.general.data_dir);
        let resolve = |name: &str| {
            let p = Path::new(name);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                data_dir.join(p)
            }
        };
        // Capped at 100 years; chrono panics on out-of-range durations.
        let hours = config.corpus.cache_ttl_hours.min(876_000) as i64;
        Self::new(
            resolve(&config.corpus.csv_file),
            resolve(&config.corpus.cache_file),
            Duration::hours(hours),
        )
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Current corpus snapshot, loading it if missing or stale.
    pub fn get_all_records(&self) -> Result<Corpus> {
        {
            let guard = self
                .snapshot
                .read()
                .map_err(|e| ReleasebotError::Storage(format!("snapshot lock poisoned: {}", e)))?;
            if let Some(snapshot) = guard.as_ref() {
                if Utc::now() - snapshot.loaded_at < self.ttl {
                    return Ok(snapshot.corpus.clone());
                }
            }
        }

        let mut guard = self
            .snapshot
            .write()
            .map_err(|e| ReleasebotError::Storage(format!("snapshot lock poisoned: {}", e)))?;
        // Another caller may have reloaded while we waited for the write lock.
        if let Some(snapshot) = guard.as_ref() {
            if Utc::now() - snapshot.loaded_at < self.ttl {
                return Ok(snapshot.corpus.clone());
            }
        }

        let corpus = corpus_from(self.load()?);
        *guard = Some(Snapshot {
            loaded_at: Utc::now(),
            corpus: corpus.clone(),
        });
        Ok(corpus)
    }

    /// Number of records in the loaded snapshot, zero before the first load.
    pub fn len(&self) -> usize {
        self.snapshot
            .read()
            .ok()
            .and_then(|g| g.as_ref().map(|s| s.corpus.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the in-memory snapshot and the cache file so the next read
    /// re-parses the CSV.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = None;
        }
        match std::fs::remove_file(&self.cache_path) {
            Ok(()) => info!(path = %self.cache_path.display(), "Release cache cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.cache_path.display(), error = %e, "Failed to clear release cache"),
        }
    }

    fn load(&self) -> Result<Vec<ReleaseRecord>> {
        if let Some(cache) = CacheFile::read_fresh(&self.cache_path, self.ttl) {
            info!(
                releases = cache.releases.len(),
                age_hours = cache.age(Utc::now()).num_hours(),
                "Using cached release data"
            );
            return Ok(sort_newest_first(cache.releases));
        }

        let records = sort_newest_first(read_csv(&self.csv_path)?);
        info!(
            path = %self.csv_path.display(),
            releases = records.len(),
            "Loaded releases from CSV"
        );

        if let Err(e) = CacheFile::new(records.clone()).write(&self.cache_path) {
            warn!(path = %self.cache_path.display(), error = %e, "Failed to save release cache");
        }
        Ok(records)
    }
}

impl RecordSource for RecordStore {
    fn all_records(&self) -> Result<Corpus> {
        self.get_all_records()
    }
}

fn sort_newest_first(mut records: Vec<ReleaseRecord>) -> Vec<ReleaseRecord> {
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\"date\",\"version\",\"category\",\"feature\",\"description\"\n\
\"2023/11/02\",\"\",\"Change\",\"Search\",\"Keyword highlighting\"\n\
\"2024/02/10\",\"\",\"Enhancement\",\"Processing\",\"Parallel OCR\"\n\
\"2024/02/10\",\"\",\"Resolved Defect\",\"Imaging\",\"Fixed page order\"\n";

    fn store_in(dir: &tempfile::TempDir) -> RecordStore {
        let csv_path = dir.path().join("releases.csv");
        std::fs::write(&csv_path, CSV).unwrap();
        RecordStore::new(csv_path, dir.path().join("cache.json"), Duration::hours(24))
    }

    #[test]
    fn test_get_all_records_sorts_newest_first_stably() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let corpus = store.get_all_records().unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus[0].feature, "Processing");
        assert_eq!(corpus[1].feature, "Imaging");
        assert_eq!(corpus[2].feature, "Search");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_consecutive_reads_are_value_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = store.get_all_records().unwrap();
        let second = store.get_all_records().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_first_load_writes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.get_all_records().unwrap();
        let cache = CacheFile::read(store.cache_path()).unwrap();
        assert_eq!(cache.release_count, 3);
    }

    #[test]
    fn test_fresh_cache_wins_over_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let cached = vec![ReleaseRecord::new("2025/01/01", "", "Change", "Cached", "")];
        CacheFile::new(cached).write(store.cache_path()).unwrap();

        let corpus = store.get_all_records().unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].feature, "Cached");
    }

    #[test]
    fn test_invalidate_reloads_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get_all_records().unwrap().len(), 3);

        let mut csv = CSV.to_string();
        csv.push_str("\"2024/05/05\",\"\",\"Change\",\"ARM\",\"Restore jobs\"\n");
        std::fs::write(store.csv_path(), csv).unwrap();

        // Snapshot still fresh: unchanged.
        assert_eq!(store.get_all_records().unwrap().len(), 3);

        store.invalidate();
        assert!(!store.cache_path().exists());
        let corpus = store.get_all_records().unwrap();
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus[0].feature, "ARM");
    }

    #[test]
    fn test_missing_csv_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(
            dir.path().join("missing.csv"),
            dir.path().join("cache.json"),
            Duration::hours(24),
        );
        assert!(store.get_all_records().is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_config_resolves_relative_paths() {
        let mut config = ReleasebotConfig::default();
        config.general.data_dir = "/srv/data".to_string();
        config.corpus.cache_file = "/tmp/cache.json".to_string();

        let store = RecordStore::from_config(&config);
        assert_eq!(store.csv_path(), Path::new("/srv/data/releases.csv"));
        assert_eq!(store.cache_path(), Path::new("/tmp/cache.json"));
    }

    #[test]
    fn test_record_source_impl() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let source: &dyn RecordSource = &store;
        assert_eq!(source.all_records().unwrap().len(), 3);
    }
}
