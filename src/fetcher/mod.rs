pub mod http_client;
pub mod memory;
pub mod types;

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;

/// An entity the selection can hold. Only the id is ever looked at.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync;

    fn id(&self) -> Self::Id;
}

/// One fixed-size, ordered slice of the remote dataset.
#[derive(Debug, Clone)]
pub struct Page<R> {
    /// 1-based.
    pub index: usize,
    pub page_size: usize,
    /// Dataset-wide count as reported when this page was fetched.
    pub total_records: usize,
    pub records: Vec<R>,
    pub fetched_at: DateTime<Utc>,
}

/// Retrieves pages from a remote paginated source.
///
/// Re-fetching the same index is always safe; contents may differ between
/// calls if the dataset changed. Implementations must not retry internally.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Record: Record;

    /// Number of records the source returns per full page.
    fn page_size(&self) -> usize;

    async fn fetch(&self, page_index: usize) -> Result<Page<Self::Record>, FetchError>;
}
