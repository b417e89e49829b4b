//! Release corpus storage: CSV loading, JSON cache with a freshness window,
//! and the background job that pulls newer releases from a feed.

pub mod cache;
pub mod loader;
pub mod refresh;
pub mod store;

pub use cache::CacheFile;
pub use loader::{normalize_date, prepend_records, read_csv};
pub use refresh::{CorpusRefresher, HttpReleaseFeed, RefreshOutcome, ReleaseFeed};
pub use store::RecordStore;
