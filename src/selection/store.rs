use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::types::{CurrentPageView, SelectionSet};
use crate::error::FetchError;
use crate::fetcher::{PageFetcher, Record};

/// What happened to a successful navigation fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateOutcome {
    /// The fetched page is now the current view.
    Applied,
    /// A later navigation already landed; this response was discarded.
    Superseded,
    /// The session was closed before the response arrived.
    Closed,
}

/// Diagnostics for one `select_first_n` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSelectReport {
    pub requested: usize,
    pub pages_needed: usize,
    pub pages_fetched: usize,
    /// Fetched records examined by the merge, at most `requested`.
    pub considered: usize,
    /// Records newly added to the selection.
    pub added: usize,
    /// Page whose fetch failed and cut the run short.
    pub failed_page: Option<usize>,
    /// Session closed mid-run; nothing was applied.
    pub aborted: bool,
}

impl BulkSelectReport {
    pub fn is_partial(&self) -> bool {
        self.failed_page.is_some()
    }
}

pub(crate) struct StoreState<R: Record> {
    pub(crate) selection: SelectionSet<R>,
    pub(crate) view: Option<CurrentPageView<R>>,
    pub(crate) total_records: usize,
    applied_ticket: u64,
}

/// Session-scoped owner of the cross-page selection and the visible page.
///
/// All reads and writes of the selection go through one mutex. The lock is
/// never held across a fetch, so a bulk select merges against whatever the
/// selection is once its fetches complete, not a copy taken when it started.
pub struct SelectionStore<F: PageFetcher> {
    fetcher: F,
    state: Mutex<StoreState<F::Record>>,
    next_ticket: AtomicU64,
    closed: AtomicBool,
}

impl<F: PageFetcher> SelectionStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: Mutex::new(StoreState {
                selection: SelectionSet::new(),
                view: None,
                total_records: 0,
                applied_ticket: 0,
            }),
            next_ticket: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn page_size(&self) -> usize {
        self.fetcher.page_size()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, StoreState<F::Record>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch `page_index` and make it the current view.
    ///
    /// On failure the previous view and the selection are left as they were
    /// and the error is returned for the caller to report.
    pub async fn navigate(&self, page_index: usize) -> Result<NavigateOutcome, FetchError> {
        if self.is_closed() {
            return Ok(NavigateOutcome::Closed);
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let page = match self.fetcher.fetch(page_index).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Navigation to page {} failed: {}", page_index, e);
                return Err(e);
            }
        };

        if self.is_closed() {
            return Ok(NavigateOutcome::Closed);
        }

        let mut state = self.state();
        if ticket < state.applied_ticket {
            debug!(
                "Discarding page {} response, a newer navigation already landed",
                page_index
            );
            return Ok(NavigateOutcome::Superseded);
        }
        state.applied_ticket = ticket;
        state.total_records = page.total_records;
        info!(
            "Showing page {} ({} records, {} total, fetched {})",
            page.index,
            page.records.len(),
            page.total_records,
            page.fetched_at.to_rfc3339()
        );
        state.view = Some(CurrentPageView::from(page));
        Ok(NavigateOutcome::Applied)
    }

    /// Apply the grid's checked rows for the visible page.
    ///
    /// `checked` is everything the grid reports as checked right now on the
    /// visible page. Selections from other pages are never touched.
    pub fn apply_page_selection(&self, checked: &[F::Record]) {
        if self.is_closed() {
            return;
        }
        let mut state = self.state();
        let page_ids = state
            .view
            .as_ref()
            .map(CurrentPageView::ids)
            .unwrap_or_default();

        let before = state.selection.len();
        state.selection.merge_page(&page_ids, checked);
        debug!(
            "Page selection applied: {} checked on page, selection {} -> {}",
            checked.len(),
            before,
            state.selection.len()
        );
    }

    /// Select the first `n` records of the dataset that are not already selected.
    ///
    /// Fetches pages `1..=ceil(n / page_size)` one after another. The first
    /// failed fetch stops the run and whatever was fetched before it is still
    /// merged. The merge scans fetched records in order and stops after `n`
    /// have been examined, so already-selected records count toward `n`.
    /// `n == 0` does nothing.
    pub async fn select_first_n(&self, n: usize) -> BulkSelectReport {
        let mut report = BulkSelectReport {
            requested: n,
            ..BulkSelectReport::default()
        };
        if n == 0 || self.is_closed() {
            debug!("select_first_n({}) ignored", n);
            return report;
        }

        let page_size = self.fetcher.page_size().max(1);
        report.pages_needed = n.div_ceil(page_size);

        let mut buffer: Vec<F::Record> = Vec::new();
        for page_index in 1..=report.pages_needed {
            if self.is_closed() {
                info!("Session closed, abandoning bulk select at page {}", page_index);
                report.aborted = true;
                return report;
            }
            match self.fetcher.fetch(page_index).await {
                Ok(page) => {
                    buffer.extend(page.records);
                    report.pages_fetched += 1;
                }
                Err(e) => {
                    warn!(
                        "Bulk select stopped at page {} of {}: {}",
                        page_index, report.pages_needed, e
                    );
                    report.failed_page = Some(page_index);
                    break;
                }
            }
        }

        if self.is_closed() {
            report.aborted = true;
            return report;
        }

        let mut state = self.state();
        let (considered, added) = state.selection.extend_scan(buffer, n);
        report.considered = considered;
        report.added = added;
        info!(
            "Bulk select of {}: fetched {}/{} pages, considered {}, added {}, selection now {}",
            n,
            report.pages_fetched,
            report.pages_needed,
            considered,
            added,
            state.selection.len()
        );
        report
    }

    /// Remove one record from the selection, whichever page it is on.
    pub fn deselect(&self, id: &<F::Record as Record>::Id) -> bool {
        self.state().selection.remove(id).is_some()
    }

    pub fn clear_selection(&self) {
        self.state().selection.clear();
    }

    /// Snapshot of the selection in selection order.
    pub fn selection(&self) -> Vec<F::Record> {
        self.state().selection.to_vec()
    }

    pub fn selected_ids(&self) -> Vec<<F::Record as Record>::Id> {
        self.state().selection.ids()
    }

    pub fn selection_len(&self) -> usize {
        self.state().selection.len()
    }

    pub fn is_selected(&self, id: &<F::Record as Record>::Id) -> bool {
        self.state().selection.contains(id)
    }

    pub fn current_page(&self) -> Option<CurrentPageView<F::Record>> {
        self.state().view.clone()
    }

    pub fn total_records(&self) -> usize {
        self.state().total_records
    }

    /// End the session. A bulk select in flight stops before its next fetch
    /// and applies nothing; later operations do nothing.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Selection session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::fetcher::memory::MemoryFetcher;
    use crate::fetcher::types::Artwork;
    use crate::fetcher::Page;

    fn dataset(count: u64) -> Vec<Artwork> {
        (1..=count).map(Artwork::untitled).collect()
    }

    fn store(count: u64) -> SelectionStore<MemoryFetcher<Artwork>> {
        SelectionStore::new(MemoryFetcher::new(dataset(count), 12))
    }

    fn ids(records: &[Artwork]) -> Vec<u64> {
        records.iter().map(|a| a.id).collect()
    }

    /// Holds fetches of one page until released.
    struct GatedFetcher {
        inner: MemoryFetcher<Artwork>,
        gated_page: usize,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl PageFetcher for GatedFetcher {
        type Record = Artwork;

        fn page_size(&self) -> usize {
            self.inner.page_size()
        }

        async fn fetch(&self, page_index: usize) -> Result<Page<Artwork>, FetchError> {
            if page_index == self.gated_page {
                self.gate.notified().await;
            }
            self.inner.fetch(page_index).await
        }
    }

    #[tokio::test]
    async fn test_navigate_sets_view_and_total() {
        let store = store(30);
        assert_eq!(store.navigate(2).await.unwrap(), NavigateOutcome::Applied);

        let view = store.current_page().unwrap();
        assert_eq!(view.page_index, 2);
        assert_eq!(view.records.first().map(|a| a.id), Some(13));
        assert_eq!(store.total_records(), 30);
    }

    #[tokio::test]
    async fn test_failed_navigation_keeps_stale_view() {
        let store = store(30);
        store.navigate(1).await.unwrap();
        store.apply_page_selection(&dataset(2));
        store.fetcher().fail_page(2);

        assert!(store.navigate(2).await.is_err());
        assert_eq!(store.current_page().unwrap().page_index, 1);
        assert_eq!(store.selected_ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_out_of_order_navigation_is_superseded() {
        let gate = Arc::new(Notify::new());
        let store = SelectionStore::new(GatedFetcher {
            inner: MemoryFetcher::new(dataset(60), 12),
            gated_page: 2,
            gate: gate.clone(),
        });

        let (slow, fast) = tokio::join!(store.navigate(2), async {
            let outcome = store.navigate(3).await;
            gate.notify_one();
            outcome
        });

        assert_eq!(fast.unwrap(), NavigateOutcome::Applied);
        assert_eq!(slow.unwrap(), NavigateOutcome::Superseded);
        assert_eq!(store.current_page().unwrap().page_index, 3);
    }

    #[tokio::test]
    async fn test_page_selection_without_view_appends() {
        let store = store(30);
        store.apply_page_selection(&dataset(3));
        assert_eq!(store.selected_ids(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_select_first_n_zero_is_noop() {
        let store = store(30);
        let report = store.select_first_n(0).await;
        assert_eq!(report.pages_needed, 0);
        assert_eq!(store.fetcher().request_count(), 0);
        assert_eq!(store.selection_len(), 0);
    }

    #[tokio::test]
    async fn test_select_first_n_counts_already_selected_toward_n() {
        let store = store(30);
        store.navigate(1).await.unwrap();
        store.apply_page_selection(&dataset(3)[1..]);

        let report = store.select_first_n(5).await;
        assert_eq!(report.considered, 5);
        assert_eq!(report.added, 3);
        assert_eq!(store.selected_ids(), vec![2, 3, 1, 4, 5]);
    }

    #[tokio::test]
    async fn test_bulk_merge_sees_changes_made_during_fetch() {
        let gate = Arc::new(Notify::new());
        let store = SelectionStore::new(GatedFetcher {
            inner: MemoryFetcher::new(dataset(60), 12),
            gated_page: 2,
            gate: gate.clone(),
        });
        store.navigate(3).await.unwrap();

        let (report, ()) = tokio::join!(store.select_first_n(20), async {
            // Bulk select is parked on page 2; check two rows on page 3.
            let page3 = store.current_page().unwrap().records;
            store.apply_page_selection(&page3[..2]);
            gate.notify_one();
        });

        assert_eq!(report.added, 20);
        let selected = store.selected_ids();
        assert_eq!(&selected[..2], &[25, 26]);
        assert_eq!(selected.len(), 22);
    }

    #[tokio::test]
    async fn test_close_abandons_remaining_fetches() {
        let gate = Arc::new(Notify::new());
        let store = SelectionStore::new(GatedFetcher {
            inner: MemoryFetcher::new(dataset(60), 12),
            gated_page: 2,
            gate: gate.clone(),
        });

        let (report, ()) = tokio::join!(store.select_first_n(36), async {
            store.close();
            gate.notify_one();
        });

        assert!(report.aborted);
        assert_eq!(store.fetcher().inner.requests(), vec![1, 2]);
        assert_eq!(store.selection_len(), 0);
        assert_eq!(store.navigate(1).await.unwrap(), NavigateOutcome::Closed);
    }

    #[tokio::test]
    async fn test_deselect_and_clear() {
        let store = store(30);
        store.select_first_n(4).await;
        assert!(store.deselect(&2));
        assert!(!store.deselect(&2));
        assert!(!store.is_selected(&2));
        assert_eq!(store.selected_ids(), vec![1, 3, 4]);

        store.clear_selection();
        assert_eq!(store.selection_len(), 0);
    }

    /// Serves pages from a fixed list, whatever size each one is.
    struct ScriptedFetcher {
        page_size: usize,
        pages: Vec<Vec<Artwork>>,
        total_records: usize,
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        type Record = Artwork;

        fn page_size(&self) -> usize {
            self.page_size
        }

        async fn fetch(&self, page_index: usize) -> Result<Page<Artwork>, FetchError> {
            let records = page_index
                .checked_sub(1)
                .and_then(|i| self.pages.get(i))
                .cloned()
                .unwrap_or_default();
            Ok(Page {
                index: page_index,
                page_size: self.page_size,
                total_records: self.total_records,
                records,
                fetched_at: chrono::Utc::now(),
            })
        }
    }

    fn art(ids: std::ops::RangeInclusive<u64>) -> Vec<Artwork> {
        ids.map(Artwork::untitled).collect()
    }

    #[tokio::test]
    async fn test_huge_n_with_failing_first_page_leaves_selection() {
        let store = store(30);
        store.navigate(1).await.unwrap();
        store.apply_page_selection(&dataset(2));
        store.fetcher().fail_page(1);

        let report = store.select_first_n(usize::MAX).await;

        assert_eq!(report.failed_page, Some(1));
        assert_eq!(report.pages_fetched, 0);
        assert_eq!(report.added, 0);
        assert_eq!(store.selected_ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_short_page_mid_run_is_made_up_by_next_page() {
        // page 1 came back with 8 of 12 rows even though more exist
        let store = SelectionStore::new(ScriptedFetcher {
            page_size: 12,
            pages: vec![art(1..=8), art(9..=20)],
            total_records: 20,
        });

        let report = store.select_first_n(15).await;

        assert_eq!(report.pages_needed, 2);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!((report.considered, report.added), (15, 15));
        assert_eq!(store.selected_ids(), (1..=15).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_short_pages_can_leave_fewer_than_n() {
        let store = SelectionStore::new(ScriptedFetcher {
            page_size: 12,
            pages: vec![art(1..=8), art(9..=14)],
            total_records: 24,
        });
        store.apply_page_selection(&art(3..=3));

        let report = store.select_first_n(20).await;

        assert_eq!(report.considered, 14);
        assert_eq!(report.added, 13);
        let mut expected = vec![3, 1, 2];
        expected.extend(4..=14);
        assert_eq!(store.selected_ids(), expected);
    }

    #[tokio::test]
    async fn test_zero_page_size_fetches_one_page_per_record() {
        let store = SelectionStore::new(ScriptedFetcher {
            page_size: 0,
            pages: vec![art(1..=1), art(2..=2), art(3..=3)],
            total_records: 3,
        });

        let report = store.select_first_n(3).await;

        assert_eq!(report.pages_needed, 3);
        assert_eq!(store.selected_ids(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_memory_fetcher_zero_page_size_treated_as_one() {
        let store = SelectionStore::new(MemoryFetcher::new(dataset(5), 0));
        assert_eq!(store.page_size(), 1);

        store.select_first_n(2).await;
        assert_eq!(store.fetcher().requests(), vec![1, 2]);
        assert_eq!(store.selected_ids(), vec![1, 2]);
    }
}
