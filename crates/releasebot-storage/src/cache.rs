//! JSON snapshot of the parsed corpus, reused while younger than the
//! freshness window so restarts do not re-parse the CSV.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use releasebot_core::{ReleaseRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    pub last_updated: DateTime<Utc>,
    pub release_count: usize,
    pub releases: Vec<ReleaseRecord>,
}

impl CacheFile {
    pub fn new(releases: Vec<ReleaseRecord>) -> Self {
        Self {
            last_updated: Utc::now(),
            release_count: releases.len(),
            releases,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_updated
    }

    /// Fresh means younger than `ttl` and not empty.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl && !self.releases.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the cache only if it exists, parses, and is still fresh.
    pub fn read_fresh(path: &Path, ttl: Duration) -> Option<Self> {
        let cache = match Self::read(path) {
            Ok(cache) => cache,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No usable release cache");
                return None;
            }
        };
        if cache.is_fresh(Utc::now(), ttl) {
            Some(cache)
        } else {
            debug!(
                path = %path.display(),
                age_hours = cache.age(Utc::now()).num_hours(),
                "Release cache expired"
            );
            None
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
