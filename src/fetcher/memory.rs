use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{Page, PageFetcher, Record};
use crate::error::FetchError;

/// Serves a fixed dataset from memory in pages of `page_size`.
///
/// Pages can be marked as failing, and every fetch is logged so callers can
/// check exactly which pages were requested and in what order.
pub struct MemoryFetcher<R> {
    records: Vec<R>,
    page_size: usize,
    failing: Mutex<HashSet<usize>>,
    requests: Mutex<Vec<usize>>,
}

impl<R: Record> MemoryFetcher<R> {
    /// `page_size` of zero is treated as one.
    pub fn new(records: Vec<R>, page_size: usize) -> Self {
        Self {
            records,
            page_size: page_size.max(1),
            failing: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent fetch of `page_index` fail.
    pub fn fail_page(&self, page_index: usize) {
        lock(&self.failing).insert(page_index);
    }

    pub fn heal_page(&self, page_index: usize) {
        lock(&self.failing).remove(&page_index);
    }

    /// Page indices requested so far, in call order (failed requests included).
    pub fn requests(&self) -> Vec<usize> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn reset_requests(&self) {
        lock(&self.requests).clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl<R: Record> PageFetcher for MemoryFetcher<R> {
    type Record = R;

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch(&self, page_index: usize) -> Result<Page<R>, FetchError> {
        lock(&self.requests).push(page_index);

        if page_index == 0 {
            return Err(FetchError::InvalidPage(page_index));
        }
        if lock(&self.failing).contains(&page_index) {
            debug!("Injected failure for page {}", page_index);
            return Err(FetchError::Unavailable {
                page: page_index,
                message: "injected failure".to_string(),
            });
        }

        let start = (page_index - 1).saturating_mul(self.page_size);
        let records: Vec<R> = self
            .records
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        Ok(Page {
            index: page_index,
            page_size: self.page_size,
            total_records: self.records.len(),
            records,
            fetched_at: Utc::now(),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::types::Artwork;

    fn fetcher(count: u64) -> MemoryFetcher<Artwork> {
        MemoryFetcher::new((1..=count).map(Artwork::untitled).collect(), 12)
    }

    #[tokio::test]
    async fn test_pages_slice_dataset_in_order() {
        let fetcher = fetcher(30);

        let first = fetcher.fetch(1).await.unwrap();
        let last = fetcher.fetch(3).await.unwrap();

        assert_eq!(first.records.len(), 12);
        assert_eq!(first.records[0].id, 1);
        assert_eq!(last.records.len(), 6);
        assert_eq!(last.records[0].id, 25);
        assert_eq!(last.total_records, 30);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let page = fetcher(5).fetch(4).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_records, 5);
    }

    #[tokio::test]
    async fn test_injected_failure_and_heal() {
        let fetcher = fetcher(30);
        fetcher.fail_page(2);
        assert!(fetcher.fetch(2).await.is_err());

        fetcher.heal_page(2);
        assert!(fetcher.fetch(2).await.is_ok());
        assert_eq!(fetcher.requests(), vec![2, 2]);
    }
}
