//! Periodic corpus refresh.
//!
//! Compares the newest release in the local CSV against a remote feed and
//! prepends anything newer, then invalidates the store so the next read picks
//! the additions up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use releasebot_core::{ReleaseRecord, ReleasebotError, Result};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::loader::{normalize_date, prepend_records, read_csv};
use crate::store::RecordStore;

/// A remote list of releases.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Releases currently published by the feed, in any order.
    async fn fetch(&self) -> Result<Vec<ReleaseRecord>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    List(Vec<ReleaseRecord>),
    Wrapped { releases: Vec<ReleaseRecord> },
}

/// JSON feed over HTTP: either a bare array of records or
/// `{"releases": [...]}`.
pub struct HttpReleaseFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpReleaseFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReleaseFeed for HttpReleaseFeed {
    async fn fetch(&self) -> Result<Vec<ReleaseRecord>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ReleasebotError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleasebotError::Http(format!(
                "release feed returned {}",
                status
            )));
        }

        let body: FeedBody = response
            .json()
            .await
            .map_err(|e| ReleasebotError::Serialization(e.to_string()))?;
        let records = match body {
            FeedBody::List(records) => records,
            FeedBody::Wrapped { releases } => releases,
        };
        Ok(records
            .into_iter()
            .map(|r| {
                ReleaseRecord::new(
                    normalize_date(&r.date),
                    r.version,
                    r.category,
                    r.feature,
                    r.description,
                )
            })
            .collect())
    }
}

/// Result of one refresh check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    pub updated: bool,
    pub new_count: usize,
}

pub struct CorpusRefresher {
    store: Arc<RecordStore>,
    feed: Arc<dyn ReleaseFeed>,
}

impl CorpusRefresher {
    pub fn new(store: Arc<RecordStore>, feed: Arc<dyn ReleaseFeed>) -> Self {
        Self { store, feed }
    }

    /// Pull newer releases into the CSV. Never fails; problems are logged
    /// and reported as "not updated".
    pub async fn check_for_new_releases(&self) -> RefreshOutcome {
        match self.try_refresh().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Release refresh failed");
                RefreshOutcome::default()
            }
        }
    }

    async fn try_refresh(&self) -> Result<RefreshOutcome> {
        info!("Checking for new releases");

        let local = read_csv(self.store.csv_path())?;
        let Some(local_latest) = local.iter().map(|r| r.date.as_str()).max() else {
            warn!("Local release history is empty; skipping comparison");
            return Ok(RefreshOutcome::default());
        };

        let remote = self.feed.fetch().await?;
        let mut newer: Vec<ReleaseRecord> = remote
            .into_iter()
            .filter(|r| r.date.as_str() > local_latest)
            .collect();

        if newer.is_empty() {
            debug!(local_latest, "No new releases found");
            return Ok(RefreshOutcome::default());
        }

        newer.sort_by(|a, b| b.date.cmp(&a.date));
        prepend_records(self.store.csv_path(), &newer)?;
        self.store.invalidate();

        info!(
            new_count = newer.len(),
            newest = %newer[0].date,
            "Release history updated"
        );
        Ok(RefreshOutcome {
            updated: true,
            new_count: newer.len(),
        })
    }

    /// Run the check after `initial_delay`, then every `period`.
    pub fn spawn(self: Arc<Self>, initial_delay: Duration, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                period_secs = period.as_secs(),
                "Release refresher started"
            );
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.check_for_new_releases().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CSV: &str = "\"date\",\"version\",\"category\",\"feature\",\"description\"\n\
\"2024/02/10\",\"\",\"Enhancement\",\"Processing\",\"Parallel OCR\"\n";

    struct FixedFeed(Vec<ReleaseRecord>);

    #[async_trait]
    impl ReleaseFeed for FixedFeed {
        async fn fetch(&self) -> Result<Vec<ReleaseRecord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingFeed;

    #[async_trait]
    impl ReleaseFeed for FailingFeed {
        async fn fetch(&self) -> Result<Vec<ReleaseRecord>> {
            Err(ReleasebotError::Http("connection refused".to_string()))
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> Arc<RecordStore> {
        let csv_path = dir.path().join("releases.csv");
        std::fs::write(&csv_path, CSV).unwrap();
        Arc::new(RecordStore::new(
            csv_path,
            dir.path().join("cache.json"),
            ChronoDuration::hours(24),
        ))
    }

    #[tokio::test]
    async fn test_newer_releases_are_prepended() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get_all_records().unwrap().len(), 1);

        let feed = FixedFeed(vec![
            ReleaseRecord::new("2024/03/01", "", "Change", "ARM", "Restore"),
            ReleaseRecord::new("2024/02/10", "", "Enhancement", "Processing", "Parallel OCR"),
            ReleaseRecord::new("2024/04/01", "", "Change", "Collect", "Slack"),
        ]);
        let refresher = CorpusRefresher::new(store.clone(), Arc::new(feed));

        let outcome = refresher.check_for_new_releases().await;
        assert_eq!(
            outcome,
            RefreshOutcome {
                updated: true,
                new_count: 2
            }
        );

        let corpus = store.get_all_records().unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus[0].feature, "Collect");
        assert_eq!(corpus[1].feature, "ARM");
    }

    #[tokio::test]
    async fn test_no_newer_releases() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let feed = FixedFeed(vec![ReleaseRecord::new("2023/01/01", "", "", "Old", "")]);
        let refresher = CorpusRefresher::new(store.clone(), Arc::new(feed));

        let outcome = refresher.check_for_new_releases().await;
        assert!(!outcome.updated);
        assert_eq!(read_csv(store.csv_path()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_feed_failure_reports_not_updated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let refresher = CorpusRefresher::new(store, Arc::new(FailingFeed));

        assert_eq!(refresher.check_for_new_releases().await, RefreshOutcome::default());
    }

    #[tokio::test]
    async fn test_empty_local_history_skips_update() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("releases.csv");
        std::fs::write(&csv_path, "\"date\",\"version\",\"category\",\"feature\",\"description\"\n")
            .unwrap();
        let store = Arc::new(RecordStore::new(
            csv_path,
            dir.path().join("cache.json"),
            ChronoDuration::hours(24),
        ));
        let feed = FixedFeed(vec![ReleaseRecord::new("2024/04/01", "", "", "New", "")]);
        let refresher = CorpusRefresher::new(store, Arc::new(feed));

        assert!(!refresher.check_for_new_releases().await.updated);
    }

    #[tokio::test]
    async fn test_http_feed_accepts_array_and_wrapped_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"date": "2024-4-2", "category": "Change", "feature": "Imaging", "description": "Presets"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wrapped.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "releases": [{"date": "2024/04/03", "version": "12.4", "feature": "ARM"}]
            })))
            .mount(&server)
            .await;

        let list = HttpReleaseFeed::new(format!("{}/list.json", server.uri()))
            .fetch()
            .await
            .unwrap();
        assert_eq!(list[0].date, "2024/04/02");
        assert_eq!(list[0].version, "2024/04/02");

        let wrapped = HttpReleaseFeed::new(format!("{}/wrapped.json", server.uri()))
            .fetch()
            .await
            .unwrap();
        assert_eq!(wrapped[0].version, "12.4");
        assert_eq!(wrapped[0].feature, "ARM");
    }

    #[tokio::test]
    async fn test_http_feed_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = HttpReleaseFeed::new(server.uri()).fetch().await;
        assert!(matches!(result, Err(ReleasebotError::Http(_))));
    }
}
